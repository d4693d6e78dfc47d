//! Benchmarking harness comparing query-execution performance between a
//! PostGIS-backed relational store and a MongoDB document store over a taxi
//! trip dataset with pickup/dropoff geometry.
//!
//! Every benchmark operation follows the same contract: build the query up
//! front, submit it over the adapter's long-lived connection, materialise the
//! result, and return the wall-clock elapsed seconds alongside the payload.
//!
//! ```no_run
//! use tripbench::prelude::*;
//!
//! # fn main() -> tripbench::Result<()> {
//! let config = Config::default();
//! let mut pg = RelationalStore::connect(&config.relational)?;
//! let timed = pg.same_start_end_time()?;
//! println!("{} trips in {:.3}s", timed.value, timed.seconds);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod config;
pub mod error;
pub mod export;
pub mod filters;
pub mod sql;
pub mod timing;
pub mod types;
pub mod workload;

pub use adapters::document::DocumentStore;
pub use adapters::relational::RelationalStore;
pub use config::{Config, DocumentConfig, ExportConfig, RelationalConfig};
pub use error::{BenchError, Result};
pub use timing::{time, Timed};
pub use types::{
    DayClass, ErrorFlag, FetchMode, HourRange, KnnStrategy, MinuteRange, OdPair, TableScope,
    TimeInterval, TripId, ZoneId, ZoneRef,
};
pub use workload::{random_id_list, random_interval, RESERVED_DOCUMENT_IDS};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {
    pub use crate::adapters::document::DocumentStore;
    pub use crate::adapters::relational::RelationalStore;
    pub use crate::config::Config;
    pub use crate::error::{BenchError, Result};
    pub use crate::timing::Timed;
    pub use crate::types::{
        DayClass, ErrorFlag, FetchMode, KnnStrategy, OdPair, TableScope, TimeInterval, TripId,
        ZoneRef,
    };
    pub use crate::workload::{random_id_list, random_interval};
}
