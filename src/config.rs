//! Harness configuration.
//!
//! Loadable from JSON so a benchmark campaign can be described in one file:
//!
//! ```rust
//! use tripbench::Config;
//!
//! let json = r#"{
//!     "relational": { "host": "db.example.org", "dbname": "nyc" },
//!     "export": { "chunk_size": 50000 }
//! }"#;
//! let config: Config = serde_json::from_str(json).unwrap();
//! assert_eq!(config.export.chunk_size, 50_000);
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for one benchmark run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub relational: RelationalConfig,

    #[serde(default)]
    pub document: DocumentConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Connection settings for the relational store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationalConfig {
    #[serde(default = "RelationalConfig::default_host")]
    pub host: String,

    #[serde(default = "RelationalConfig::default_port")]
    pub port: u16,

    #[serde(default = "RelationalConfig::default_dbname")]
    pub dbname: String,

    #[serde(default = "RelationalConfig::default_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,
}

impl RelationalConfig {
    fn default_host() -> String {
        "localhost".to_string()
    }

    const fn default_port() -> u16 {
        5432
    }

    fn default_dbname() -> String {
        "nyc".to_string()
    }

    fn default_user() -> String {
        "postgres".to_string()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }
}

impl Default for RelationalConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            dbname: Self::default_dbname(),
            user: Self::default_user(),
            password: String::new(),
        }
    }
}

/// Connection settings for the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    #[serde(default = "DocumentConfig::default_host")]
    pub host: String,

    #[serde(default = "DocumentConfig::default_port")]
    pub port: u16,

    #[serde(default = "DocumentConfig::default_dbname")]
    pub dbname: String,

    /// Collection holding the trip documents.
    #[serde(default = "DocumentConfig::default_trips")]
    pub trips_collection: String,

    /// Collection holding the zone polygons.
    #[serde(default = "DocumentConfig::default_zones")]
    pub zones_collection: String,
}

impl DocumentConfig {
    fn default_host() -> String {
        "localhost".to_string()
    }

    const fn default_port() -> u16 {
        27017
    }

    fn default_dbname() -> String {
        "nyc".to_string()
    }

    fn default_trips() -> String {
        "trips".to_string()
    }

    fn default_zones() -> String {
        "zones".to_string()
    }

    pub fn connection_string(&self) -> String {
        format!("mongodb://{}:{}", self.host, self.port)
    }

    pub fn with_collections(
        mut self,
        trips: impl Into<String>,
        zones: impl Into<String>,
    ) -> Self {
        self.trips_collection = trips.into();
        self.zones_collection = zones.into();
        self
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            dbname: Self::default_dbname(),
            trips_collection: Self::default_trips(),
            zones_collection: Self::default_zones(),
        }
    }
}

/// Settings for the chunked interchange export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Rows per chunk file.
    #[serde(default = "ExportConfig::default_chunk_size")]
    pub chunk_size: i64,

    /// Directory under which per-day export folders are created.
    #[serde(default = "ExportConfig::default_output_dir")]
    pub output_dir: PathBuf,
}

impl ExportConfig {
    const fn default_chunk_size() -> i64 {
        crate::export::DEFAULT_CHUNK_SIZE
    }

    fn default_output_dir() -> PathBuf {
        PathBuf::from(".")
    }

    pub fn with_chunk_size(mut self, chunk_size: i64) -> Self {
        assert!(chunk_size > 0, "chunk size must be greater than zero");
        self.chunk_size = chunk_size;
        self
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            chunk_size: Self::default_chunk_size(),
            output_dir: Self::default_output_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_a_local_setup() {
        let config = Config::default();
        assert_eq!(config.relational.port, 5432);
        assert_eq!(config.document.port, 27017);
        assert_eq!(config.document.trips_collection, "trips");
        assert_eq!(config.export.chunk_size, 100_000);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "document": { "host": "mongo.internal" } }"#).unwrap();
        assert_eq!(config.document.host, "mongo.internal");
        assert_eq!(config.document.dbname, "nyc");
        assert_eq!(config.relational.host, "localhost");
    }

    #[test]
    fn connection_string_shape() {
        let config = DocumentConfig::default();
        assert_eq!(config.connection_string(), "mongodb://localhost:27017");
    }

    #[test]
    fn from_json_file_round_trip() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            r#"{ "export": { "chunk_size": 25000, "output_dir": "/tmp/out" } }"#,
        )
        .unwrap();
        let config = Config::from_json_file(tmp.path()).unwrap();
        assert_eq!(config.export.chunk_size, 25_000);
        assert_eq!(config.export.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn builders_override_fields() {
        let relational = RelationalConfig::default()
            .with_host("db1")
            .with_credentials("bench", "secret");
        assert_eq!(relational.host, "db1");
        assert_eq!(relational.user, "bench");

        let document = DocumentConfig::default().with_collections("trips_2015", "tlc_zones");
        assert_eq!(document.trips_collection, "trips_2015");
        assert_eq!(document.zones_collection, "tlc_zones");
    }
}
