//! Document query and pipeline builders.
//!
//! Pure functions returning `bson` documents, mirroring the relational
//! builders in [`crate::sql`] operation for operation. Boolean semantics
//! (inclusive bounds, half-open intervals, null handling) must match the SQL
//! side exactly; the benchmark comparison is only meaningful if both backends
//! answer the identical logical question.
//!
//! Document contract: trip documents shaped as `{type: "Feature",
//! geometry_pk, geometry_do, properties: {ID_Postgres,
//! tpep_pickup_datetime, tpep_dropoff_datetime, passenger_count,
//! total_amount, ...}}`, and zone documents with polygon `geometry` and
//! `properties.LocationID`.

use crate::types::{ErrorFlag, TimeInterval, TripId};
use chrono::NaiveDateTime;
use mongodb::bson::{doc, DateTime, Document};

/// Convert a naive timestamp (the dataset is wall-clock local time) into a
/// BSON datetime.
pub fn bson_datetime(t: NaiveDateTime) -> DateTime {
    DateTime::from_millis(t.and_utc().timestamp_millis())
}

/// Trips whose pickup and dropoff timestamps are equal.
pub fn same_start_end_time() -> Document {
    doc! {
        "$expr": {
            "$eq": [
                "$properties.tpep_pickup_datetime",
                "$properties.tpep_dropoff_datetime",
            ]
        }
    }
}

/// Trips with total price less than or equal to `x`.
pub fn total_price_lte(x: f64) -> Document {
    doc! { "properties.total_amount": { "$lte": x } }
}

/// Trips carrying exactly `x` passengers.
pub fn passenger_count_eq(x: i32) -> Document {
    doc! { "properties.passenger_count": x }
}

/// Pipeline stages computing the dropoff-minus-pickup difference in
/// milliseconds and keeping trips at or above `threshold_ms`.
///
/// Matches the relational `DATE_PART` arithmetic with an inclusive bound.
pub fn long_trips_stages(threshold_ms: i64) -> Vec<Document> {
    vec![
        doc! {
            "$project": {
                "properties": 1,
                "dateDifference": {
                    "$subtract": [
                        "$properties.tpep_dropoff_datetime",
                        "$properties.tpep_pickup_datetime",
                    ]
                }
            }
        },
        doc! { "$match": { "dateDifference": { "$gte": threshold_ms } } },
    ]
}

/// [`long_trips_stages`] terminated by a count stage.
pub fn long_trips_count_pipeline(threshold_ms: i64) -> Vec<Document> {
    let mut pipeline = long_trips_stages(threshold_ms);
    pipeline.push(doc! { "$count": "long_trips" });
    pipeline
}

/// Trips picked up inside the half-open interval `[start, end)`.
pub fn pickup_in_interval(interval: &TimeInterval) -> Document {
    doc! {
        "properties.tpep_pickup_datetime": {
            "$gte": bson_datetime(interval.start),
            "$lt": bson_datetime(interval.end),
        }
    }
}

/// Zones whose polygon contains the given point.
pub fn zone_containing(lon: f64, lat: f64) -> Document {
    doc! {
        "geometry": {
            "$geoIntersects": {
                "$geometry": { "type": "Point", "coordinates": [lon, lat] }
            }
        }
    }
}

/// Trips ordered by geodesic distance of their pickup point from the given
/// point; pair with a result limit for k-NN.
pub fn near_pickup(lon: f64, lat: f64) -> Document {
    doc! {
        "geometry_pk": {
            "$nearSphere": {
                "$geometry": { "type": "Point", "coordinates": [lon, lat] }
            }
        }
    }
}

/// Lookup of a trip by its relational identifier.
pub fn trip_by_id(id: TripId) -> Document {
    doc! { "properties.ID_Postgres": id }
}

/// Lookup of a trip in a single-day collection by its serial `nid`.
pub fn trip_by_nid(nid: TripId) -> Document {
    doc! { "properties.nid": nid }
}

/// Trips whose relational identifier is in `ids`.
pub fn trips_by_ids(ids: &[TripId]) -> Document {
    doc! { "properties.ID_Postgres": { "$in": ids.to_vec() } }
}

/// Projection keeping both geometries and the properties of a trip.
pub fn trip_projection() -> Document {
    doc! {
        "geometry_pk.coordinates": 1,
        "geometry_do.coordinates": 1,
        "properties": 1,
    }
}

/// Projection keeping only the pickup/dropoff coordinates.
pub fn coordinate_projection() -> Document {
    doc! {
        "geometry_pk.coordinates": 1,
        "geometry_do.coordinates": 1,
    }
}

/// Documents carrying a pickup datetime at all.
pub fn pickup_datetime_exists() -> Document {
    doc! { "properties.tpep_pickup_datetime": { "$exists": true } }
}

/// Idempotent update setting an error flag; re-running it modifies nothing.
pub fn set_flag(flag: ErrorFlag) -> Document {
    let field = flag.field();
    doc! { "$set": { field: true } }
}

/// Inverse of [`set_flag`]: remove the marker field wherever present.
pub fn unset_flag(flag: ErrorFlag) -> Document {
    let field = flag.field();
    doc! { "$unset": { field: 1 } }
}

/// Documents on which `flag` has been set.
pub fn flag_exists(flag: ErrorFlag) -> Document {
    let field = flag.field();
    doc! { field: { "$exists": true } }
}

/// Pipeline selecting trips whose pickup and dropoff coordinate arrays are
/// equal.
pub fn same_location_pipeline() -> Vec<Document> {
    vec![
        doc! {
            "$match": {
                "geometry_pk": { "$exists": true },
                "geometry_do": { "$exists": true },
                "properties.ID_Postgres": { "$exists": true },
            }
        },
        doc! {
            "$project": {
                "geometry_pk": 1,
                "geometry_do": 1,
                "properties.ID_Postgres": 1,
                "sameLocation": {
                    "$eq": ["$geometry_pk.coordinates", "$geometry_do.coordinates"]
                }
            }
        },
        doc! { "$match": { "sameLocation": true } },
    ]
}
