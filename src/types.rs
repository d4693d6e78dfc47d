//! Shared types for trips, zones, and query parameters.
//!
//! The entities themselves (trips, zone polygons) live in the external
//! stores; the types here are the identifiers, parameter bundles, and result
//! shapes the two backend adapters agree on.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a trip in the relational store, mirrored into the document
/// store as `properties.ID_Postgres`.
pub type TripId = i32;

/// Identifier of a taxi-zone polygon (`gid` in the relational store,
/// `properties.LocationID` in the document store).
pub type ZoneId = i32;

/// Result of a point-in-polygon containment test.
///
/// A point that falls outside every zone is a defined result state, not an
/// error: the relational full join reports it as a NULL zone reference and
/// the document adapter injects the same sentinel when the containment query
/// comes back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneRef {
    Zone(ZoneId),
    Outside,
}

impl ZoneRef {
    pub fn from_nullable(gid: Option<ZoneId>) -> Self {
        match gid {
            Some(id) => ZoneRef::Zone(id),
            None => ZoneRef::Outside,
        }
    }

    pub fn is_outside(&self) -> bool {
        matches!(self, ZoneRef::Outside)
    }
}

impl fmt::Display for ZoneRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneRef::Zone(id) => write!(f, "{}", id),
            ZoneRef::Outside => write!(f, "None"),
        }
    }
}

/// Origin-destination pair derived from a trip's pickup and dropoff points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OdPair {
    pub origin: ZoneRef,
    pub destination: ZoneRef,
}

impl OdPair {
    pub fn new(origin: ZoneRef, destination: ZoneRef) -> Self {
        Self {
            origin,
            destination,
        }
    }
}

/// A half-open time interval `[start, end)` used to scope queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeInterval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Which trip table a relational query runs against.
///
/// The whole dataset lives in `trips` keyed by `id`; `extract_day` carves a
/// single calendar day into its own `day_YYYY_MM_DD` table keyed by a fresh
/// serial `nid`, which makes min/max id lookups on that day cheap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableScope {
    Trips,
    Day(NaiveDate),
}

impl TableScope {
    pub fn table_name(&self) -> String {
        match self {
            TableScope::Trips => "trips".to_string(),
            TableScope::Day(day) => {
                format!("day_{:04}_{:02}_{:02}", day.year(), day.month(), day.day())
            }
        }
    }

    pub fn id_column(&self) -> &'static str {
        match self {
            TableScope::Trips => "id",
            TableScope::Day(_) => "nid",
        }
    }
}

/// The two relational k-NN query plans.
///
/// Both answer the same question and must return the same neighbor set; they
/// are kept side by side to compare planner behavior, not as redundant code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnnStrategy {
    /// v1: join the trip table to itself and order by the distance operator.
    SelfJoin,
    /// v2: resolve the reference point through a correlated subquery.
    Subquery,
}

/// Weekday/weekend split for the journey time series.
///
/// Weekend means day-of-week in {Saturday, Sunday}; weekday is the
/// complement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayClass {
    Weekday,
    Weekend,
}

/// How the relational adapter materialises a large interval scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Plain query; the whole result set is buffered client-side.
    Buffered,
    /// Server-side cursor fetched in batches; bounds client memory on
    /// month-scale intervals.
    ServerCursor,
}

/// Inclusive hour-of-day bounds, 0..=23.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourRange {
    pub from: u8,
    pub to: u8,
}

/// Inclusive minute-of-hour bounds, 0..=59.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteRange {
    pub from: u8,
    pub to: u8,
}

/// Data-quality flags written back to the stores by the update operations.
///
/// In the document store each flag is a marker field under `Errors`; in the
/// relational store it is an added column. Flag numbering follows the
/// published study.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFlag {
    SameStartEndTime,
    TotalPriceLte,
    PassengerCountEq,
    LongTrip,
    SameStartEndLocation,
}

impl ErrorFlag {
    /// Dotted field path in the document store.
    pub fn field(&self) -> &'static str {
        match self {
            ErrorFlag::SameStartEndTime => "Errors.Flag_1",
            ErrorFlag::TotalPriceLte => "Errors.Flag_2",
            ErrorFlag::PassengerCountEq => "Errors.Flag_3",
            ErrorFlag::LongTrip => "Errors.Flag_4",
            ErrorFlag::SameStartEndLocation => "Errors.Flag_5",
        }
    }

    /// Column name in the relational store.
    pub fn column(&self) -> &'static str {
        match self {
            ErrorFlag::SameStartEndTime => "flag_same_time",
            ErrorFlag::TotalPriceLte => "flag_low_price",
            ErrorFlag::PassengerCountEq => "flag_passengers",
            ErrorFlag::LongTrip => "flag_long_trip",
            ErrorFlag::SameStartEndLocation => "flag_same_location",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn zone_ref_sentinel_display() {
        assert_eq!(ZoneRef::Zone(132).to_string(), "132");
        assert_eq!(ZoneRef::Outside.to_string(), "None");
        assert!(ZoneRef::Outside.is_outside());
        assert!(!ZoneRef::Zone(1).is_outside());
    }

    #[test]
    fn zone_ref_from_nullable() {
        assert_eq!(ZoneRef::from_nullable(Some(7)), ZoneRef::Zone(7));
        assert_eq!(ZoneRef::from_nullable(None), ZoneRef::Outside);
    }

    #[test]
    fn interval_duration() {
        let start = NaiveDate::from_ymd_opt(2015, 1, 5)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let interval = TimeInterval::new(start, start + chrono::Duration::minutes(1440));
        assert_eq!(interval.duration_minutes(), 1440);
        assert!(interval.start < interval.end);
    }

    #[test]
    fn day_scope_naming() {
        let scope = TableScope::Day(NaiveDate::from_ymd_opt(2015, 8, 22).unwrap());
        assert_eq!(scope.table_name(), "day_2015_08_22");
        assert_eq!(scope.id_column(), "nid");
        assert_eq!(TableScope::Trips.table_name(), "trips");
        assert_eq!(TableScope::Trips.id_column(), "id");
    }

    #[test]
    fn error_flag_paths() {
        assert_eq!(ErrorFlag::SameStartEndTime.field(), "Errors.Flag_1");
        assert_eq!(ErrorFlag::SameStartEndLocation.field(), "Errors.Flag_5");
        assert_eq!(ErrorFlag::LongTrip.column(), "flag_long_trip");
    }
}
