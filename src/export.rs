//! Interchange-file export for loading the document store from the
//! relational store.
//!
//! The output is one feature record per line in the extended-JSON dialect the
//! document store's import tool accepts: datetimes are wrapped in
//! `ISODate("...")`, which is why this is not strict GeoJSON. Records are
//! written in bounded-size chunks, one file per chunk, to keep memory flat on
//! multi-million-row exports.

use crate::error::Result;
use crate::types::TripId;
use chrono::NaiveDateTime;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default number of rows per export chunk.
pub const DEFAULT_CHUNK_SIZE: i64 = 100_000;

/// One trip record in the interchange shape.
#[derive(Debug, Clone, PartialEq)]
pub struct TripFeature {
    /// Serial id inside a single-day partition; absent for full-table
    /// exports.
    pub nid: Option<TripId>,
    pub id: TripId,
    pub vendor_id: String,
    pub t_pickup: NaiveDateTime,
    pub t_dropoff: NaiveDateTime,
    pub num_passengers: i16,
    pub trip_distance: f32,
    pub pickup_lon: f64,
    pub pickup_lat: f64,
    pub ratecode_id: String,
    pub store_and_fwd_flag: String,
    pub dropoff_lon: f64,
    pub dropoff_lat: f64,
    pub payment_type: String,
    pub fare_amount: f32,
    pub extra: f32,
    pub mta_tax: f32,
    pub surcharge: f32,
    pub tip: f32,
    pub tolls: f32,
    pub total: f32,
}

/// Format a timestamp the way the document store expects temporal fields: ISO
/// 8601 with a trailing `Z`.
pub fn iso_datetime(t: NaiveDateTime) -> String {
    format!("{}Z", t.format("%Y-%m-%dT%H:%M:%S"))
}

/// File name for chunk `chunk_id`; ids start from zero.
pub fn chunk_file_name(chunk_id: i64) -> String {
    format!("nyc2015_json_{}.geojson", chunk_id)
}

/// Number of chunk files a table of `rows` rows produces.
///
/// Always rounds up past the last full chunk, so 420k rows at a 100k chunk
/// size yield 5 files.
pub fn num_chunks(rows: i64, chunk_size: i64) -> i64 {
    rows / chunk_size + 1
}

/// Render one feature as a single interchange record.
pub fn render_feature(feature: &TripFeature) -> String {
    let mut record = String::with_capacity(512);
    record.push_str("{ \"type\" : \"Feature\", ");
    let _ = write!(
        record,
        "\"geometry_pk\" : {{ \"type\" : \"Point\", \"coordinates\" : [{},{}] }}, ",
        feature.pickup_lon, feature.pickup_lat
    );
    record.push_str("\"properties\" : { ");
    if let Some(nid) = feature.nid {
        let _ = write!(record, "\"nid\" : {}, ", nid);
    }
    let _ = write!(
        record,
        "\"ID_Postgres\" : {}, \
         \"VendorID\" : \"{}\", \
         \"passenger_count\" : {}, \
         \"store_and_fwd_flag\" : \"{}\", \
         \"RatecodeID\" : \"{}\", \
         \"trip_distance\" : {}, \
         \"payment_type\" : \"{}\", \
         \"fare_amount\" : {}, \
         \"extra\" : {}, \
         \"mta_tax\" : {}, \
         \"tip_amount\" : {}, \
         \"tolls_amount\" : {}, \
         \"improvement_surcharge\" : {}, \
         \"total_amount\" : {}, \
         \"tpep_pickup_datetime\" : ISODate(\"{}\"), \
         \"tpep_dropoff_datetime\" : ISODate(\"{}\") }}, ",
        feature.id,
        feature.vendor_id,
        feature.num_passengers,
        feature.store_and_fwd_flag,
        feature.ratecode_id,
        feature.trip_distance,
        feature.payment_type,
        feature.fare_amount,
        feature.extra,
        feature.mta_tax,
        feature.tip,
        feature.tolls,
        feature.surcharge,
        feature.total,
        iso_datetime(feature.t_pickup),
        iso_datetime(feature.t_dropoff),
    );
    let _ = write!(
        record,
        "\"geometry_do\" : {{ \"type\" : \"Point\", \"coordinates\" : [{},{}] }} }},",
        feature.dropoff_lon, feature.dropoff_lat
    );
    record
}

/// Writes chunk files into one output directory.
pub struct ChunkWriter {
    dir: PathBuf,
}

impl ChunkWriter {
    /// Create a writer rooted at `dir`, creating the directory if needed.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        std::fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one chunk of features; returns the path of the chunk file.
    pub fn write_chunk(&self, chunk_id: i64, features: &[TripFeature]) -> Result<PathBuf> {
        let path = self.dir.join(chunk_file_name(chunk_id));
        let mut writer = BufWriter::new(File::create(&path)?);
        for feature in features {
            writer.write_all(render_feature(feature).as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        log::debug!("wrote {} features to {}", features.len(), path.display());
        Ok(path)
    }
}
