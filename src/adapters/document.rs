//! Document backend adapter.
//!
//! Wraps one synchronous client to the document store with handles to the
//! trip and zone collections. Filters and pipelines come from
//! [`crate::filters`], and every mirrored predicate answers the same logical
//! question as its relational counterpart: identical inclusive bounds,
//! identical half-open intervals, identical outside-all-zones sentinel.

use crate::config::DocumentConfig;
use crate::error::{BenchError, Result};
use crate::filters;
use crate::timing::{time, Timed};
use crate::types::{ErrorFlag, OdPair, TimeInterval, TripId, ZoneRef};
use mongodb::bson::{doc, Bson, DateTime, Document};
use mongodb::options::{AggregateOptions, FindOneOptions, FindOptions};
use mongodb::sync::{Client, Collection};
use std::collections::BTreeSet;

/// Pickup and dropoff coordinates of one trip, in `(lon, lat)` order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripGeometry {
    pub pickup: (f64, f64),
    pub dropoff: (f64, f64),
}

/// Adapter over the document store.
///
/// Construction pings the server so an unreachable store fails fast instead
/// of surfacing on the first query.
pub struct DocumentStore {
    trips: Collection<Document>,
    zones: Collection<Document>,
}

impl DocumentStore {
    pub fn connect(config: &DocumentConfig) -> Result<Self> {
        let client = Client::with_uri_str(config.connection_string())?;
        let db = client.database(&config.dbname);
        db.run_command(doc! { "ping": 1 }, None)?;
        log::info!(
            "connected to document store at {} ({})",
            config.connection_string(),
            config.dbname
        );
        Ok(Self {
            trips: db.collection(&config.trips_collection),
            zones: db.collection(&config.zones_collection),
        })
    }

    /// Total number of trip documents.
    pub fn num_documents(&self) -> Result<u64> {
        Ok(self.trips.count_documents(None, None)?)
    }

    /// How many trips have the same start and end time?
    pub fn same_start_end_time(&self) -> Result<Timed<u64>> {
        let filter = filters::same_start_end_time();
        time(|| Ok(self.trips.count_documents(filter, None)?))
    }

    /// How many trips cost at most `x`?
    pub fn total_price_lte(&self, x: f64) -> Result<Timed<u64>> {
        let filter = filters::total_price_lte(x);
        time(|| Ok(self.trips.count_documents(filter, None)?))
    }

    /// How many trips carried exactly `x` passengers?
    pub fn passenger_count_eq(&self, x: i32) -> Result<Timed<u64>> {
        let filter = filters::passenger_count_eq(x);
        time(|| Ok(self.trips.count_documents(filter, None)?))
    }

    /// How many trips lasted at least `threshold_ms` milliseconds?
    pub fn long_trips(&self, threshold_ms: i64) -> Result<Timed<u64>> {
        let pipeline = filters::long_trips_count_pipeline(threshold_ms);
        let options = AggregateOptions::builder().allow_disk_use(true).build();
        time(|| {
            let mut cursor = self.trips.aggregate(pipeline, options)?;
            match cursor.next().transpose()? {
                Some(counted) => Ok(counted.get_i32("long_trips")? as u64),
                None => Ok(0),
            }
        })
    }

    /// Earliest and latest pickup datetime in the collection.
    pub fn min_max_pickup_date(&self) -> Result<(DateTime, DateTime)> {
        let min = self.pickup_date_extremum(1)?;
        let max = self.pickup_date_extremum(-1)?;
        Ok((min, max))
    }

    fn pickup_date_extremum(&self, direction: i32) -> Result<DateTime> {
        let options = FindOneOptions::builder()
            .projection(doc! { "properties.tpep_pickup_datetime": 1 })
            .sort(doc! { "properties.tpep_pickup_datetime": direction })
            .build();
        let found = self
            .trips
            .find_one(filters::pickup_datetime_exists(), options)?
            .ok_or_else(|| BenchError::NotFound("no trip carries a pickup datetime".into()))?;
        Ok(*found
            .get_document("properties")?
            .get_datetime("tpep_pickup_datetime")?)
    }

    /// Resolve the geometry of the trip with relational id `trip_id`.
    pub fn retrieve_trip(&self, trip_id: TripId) -> Result<TripGeometry> {
        self.retrieve_geometry(filters::trip_by_id(trip_id), trip_id)
    }

    /// Resolve the geometry of a trip in a single-day collection by its
    /// serial `nid`.
    pub fn retrieve_trip_in_day(&self, nid: TripId) -> Result<TripGeometry> {
        self.retrieve_geometry(filters::trip_by_nid(nid), nid)
    }

    fn retrieve_geometry(&self, filter: Document, id: TripId) -> Result<TripGeometry> {
        let options = FindOneOptions::builder()
            .projection(filters::trip_projection())
            .build();
        let found = self
            .trips
            .find_one(filter, options)?
            .ok_or_else(|| BenchError::NotFound(format!("trip {}", id)))?;
        Ok(TripGeometry {
            pickup: point_coordinates(&found, "geometry_pk")?,
            dropoff: point_coordinates(&found, "geometry_do")?,
        })
    }

    /// Zone containing the given point, or the outside sentinel.
    ///
    /// A containment query over the zone collection simply returns nothing
    /// for a point outside every polygon; the sentinel keeps the result shape
    /// identical to the relational full join.
    fn zone_for_point(&self, lon: f64, lat: f64) -> Result<ZoneRef> {
        let mut zone = ZoneRef::Outside;
        let cursor = self.zones.find(filters::zone_containing(lon, lat), None)?;
        for found in cursor {
            zone = ZoneRef::Zone(location_id(&found?)?);
        }
        Ok(zone)
    }

    /// Origin/destination zones of one trip.
    ///
    /// The trip is resolved before the clock starts; the measurement covers
    /// the two containment queries, matching the relational variant where the
    /// id lookup is part of a single joined statement.
    pub fn pip_trip_id(&self, trip_id: TripId) -> Result<Timed<OdPair>> {
        let geometry = self.retrieve_trip(trip_id)?;
        time(|| {
            let origin = self.zone_for_point(geometry.pickup.0, geometry.pickup.1)?;
            let destination = self.zone_for_point(geometry.dropoff.0, geometry.dropoff.1)?;
            Ok(OdPair::new(origin, destination))
        })
    }

    /// Origin/destination zones of every trip picked up inside the interval,
    /// one containment query per endpoint.
    pub fn pip_interval(&self, interval: &TimeInterval) -> Result<Timed<Vec<OdPair>>> {
        let filter = filters::pickup_in_interval(interval);
        let options = FindOptions::builder()
            .projection(filters::coordinate_projection())
            .build();
        time(|| {
            let mut geometries = Vec::new();
            for found in self.trips.find(filter, options)? {
                let found = found?;
                geometries.push((
                    point_coordinates(&found, "geometry_pk")?,
                    point_coordinates(&found, "geometry_do")?,
                ));
            }

            let mut od = Vec::with_capacity(geometries.len());
            for (pickup, dropoff) in geometries {
                od.push(OdPair::new(
                    self.zone_for_point(pickup.0, pickup.1)?,
                    self.zone_for_point(dropoff.0, dropoff.1)?,
                ));
            }
            Ok(od)
        })
    }

    /// Interval point-in-polygon, second strategy: re-resolve every trip by
    /// id and reuse the single-trip path. Slower by construction; kept to
    /// measure the cost of the extra id lookups.
    pub fn pip_interval_by_trip(&self, interval: &TimeInterval) -> Result<Timed<Vec<OdPair>>> {
        let filter = filters::pickup_in_interval(interval);
        let options = FindOptions::builder()
            .projection(doc! { "properties": 1 })
            .build();
        time(|| {
            let mut od = Vec::new();
            for found in self.trips.find(filter, options)? {
                let trip_id = trip_id_of(&found?)?;
                od.push(self.pip_trip_id(trip_id)?.value);
            }
            Ok(od)
        })
    }

    /// k nearest trips to the pickup location of `trip_id`, by geodesic
    /// distance.
    ///
    /// No atomic "k-NN of trip X" primitive exists, so the reference point is
    /// resolved first and the proximity query issued second; only the
    /// proximity query is measured.
    pub fn knn(&self, trip_id: TripId, k: i64) -> Result<Timed<BTreeSet<TripId>>> {
        let geometry = self.retrieve_trip(trip_id)?;
        self.knn_from(geometry.pickup, k)
    }

    /// k-NN over a single-day collection keyed by `nid`.
    pub fn knn_in_day(&self, nid: TripId, k: i64) -> Result<Timed<BTreeSet<TripId>>> {
        let geometry = self.retrieve_trip_in_day(nid)?;
        self.knn_from(geometry.pickup, k)
    }

    fn knn_from(&self, pickup: (f64, f64), k: i64) -> Result<Timed<BTreeSet<TripId>>> {
        let filter = filters::near_pickup(pickup.0, pickup.1);
        let options = FindOptions::builder().limit(k).build();
        time(|| {
            let mut neighbors = BTreeSet::new();
            for found in self.trips.find(filter, options)? {
                neighbors.insert(trip_id_of(&found?)?);
            }
            Ok(neighbors)
        })
    }

    /// Flag trips with equal pickup and dropoff timestamps.
    pub fn flag_same_start_end_time(&self) -> Result<Timed<u64>> {
        self.flag_matching(filters::same_start_end_time(), ErrorFlag::SameStartEndTime)
    }

    /// Flag trips costing at most `x`.
    pub fn flag_total_price_lte(&self, x: f64) -> Result<Timed<u64>> {
        self.flag_matching(filters::total_price_lte(x), ErrorFlag::TotalPriceLte)
    }

    /// Flag trips carrying exactly `x` passengers.
    pub fn flag_passenger_count_eq(&self, x: i32) -> Result<Timed<u64>> {
        self.flag_matching(filters::passenger_count_eq(x), ErrorFlag::PassengerCountEq)
    }

    fn flag_matching(&self, filter: Document, flag: ErrorFlag) -> Result<Timed<u64>> {
        let update = filters::set_flag(flag);
        time(|| {
            let result = self.trips.update_many(filter, update, None)?;
            Ok(result.modified_count)
        })
    }

    /// Flag trips lasting at least `threshold_ms` milliseconds.
    ///
    /// The matching ids come from the computed-difference pipeline and are
    /// flagged in one bulk update.
    pub fn flag_long_trips(&self, threshold_ms: i64) -> Result<Timed<u64>> {
        let pipeline = filters::long_trips_stages(threshold_ms);
        self.flag_pipeline_matches(pipeline, ErrorFlag::LongTrip)
    }

    /// Flag trips whose pickup and dropoff coordinates coincide.
    pub fn flag_same_start_end_location(&self) -> Result<Timed<u64>> {
        self.flag_pipeline_matches(filters::same_location_pipeline(), ErrorFlag::SameStartEndLocation)
    }

    fn flag_pipeline_matches(
        &self,
        pipeline: Vec<Document>,
        flag: ErrorFlag,
    ) -> Result<Timed<u64>> {
        let options = AggregateOptions::builder().allow_disk_use(true).build();
        let update = filters::set_flag(flag);
        time(|| {
            let mut ids = Vec::new();
            for found in self.trips.aggregate(pipeline, options)? {
                ids.push(trip_id_of(&found?)?);
            }
            if ids.is_empty() {
                return Ok(0);
            }
            let result = self
                .trips
                .update_many(filters::trips_by_ids(&ids), update, None)?;
            Ok(result.modified_count)
        })
    }

    /// Remove `flag` from every document carrying it; the inverse of the
    /// flagging passes.
    pub fn clear_flag(&self, flag: ErrorFlag) -> Result<Timed<u64>> {
        let filter = filters::flag_exists(flag);
        let update = filters::unset_flag(flag);
        time(|| {
            let result = self.trips.update_many(filter, update, None)?;
            Ok(result.modified_count)
        })
    }
}

/// Extract `(lon, lat)` from a point geometry sub-document.
fn point_coordinates(document: &Document, geometry: &str) -> Result<(f64, f64)> {
    let coords = document.get_document(geometry)?.get_array("coordinates")?;
    match (coordinate(coords.first()), coordinate(coords.get(1))) {
        (Some(lon), Some(lat)) => Ok((lon, lat)),
        _ => Err(BenchError::InvalidInput(format!(
            "{} carries no numeric lon/lat pair",
            geometry
        ))),
    }
}

fn coordinate(value: Option<&Bson>) -> Option<f64> {
    match value? {
        Bson::Double(v) => Some(*v),
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        _ => None,
    }
}

/// Relational id mirrored into a trip document.
fn trip_id_of(document: &Document) -> Result<TripId> {
    let properties = document.get_document("properties")?;
    match properties.get("ID_Postgres") {
        Some(Bson::Int32(id)) => Ok(*id),
        Some(Bson::Int64(id)) => Ok(*id as TripId),
        Some(Bson::Double(id)) => Ok(*id as TripId),
        _ => Err(BenchError::InvalidInput(
            "trip document carries no ID_Postgres".into(),
        )),
    }
}

/// Zone identifier of a zone document.
fn location_id(document: &Document) -> Result<i32> {
    let properties = document.get_document("properties")?;
    match properties.get("LocationID") {
        Some(Bson::Int32(id)) => Ok(*id),
        Some(Bson::Int64(id)) => Ok(*id as i32),
        Some(Bson::Double(id)) => Ok(*id as i32),
        _ => Err(BenchError::InvalidInput(
            "zone document carries no LocationID".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_coordinates_reads_lon_lat() {
        let document = doc! {
            "geometry_pk": { "coordinates": [-73.98, 40.75] }
        };
        let (lon, lat) = point_coordinates(&document, "geometry_pk").unwrap();
        assert_eq!(lon, -73.98);
        assert_eq!(lat, 40.75);
    }

    #[test]
    fn point_coordinates_rejects_short_arrays() {
        let document = doc! { "geometry_pk": { "coordinates": [-73.98] } };
        assert!(point_coordinates(&document, "geometry_pk").is_err());
    }

    #[test]
    fn trip_id_accepts_numeric_widths() {
        let narrow = doc! { "properties": { "ID_Postgres": 42_i32 } };
        let wide = doc! { "properties": { "ID_Postgres": 42_i64 } };
        assert_eq!(trip_id_of(&narrow).unwrap(), 42);
        assert_eq!(trip_id_of(&wide).unwrap(), 42);
        let missing = doc! { "properties": {} };
        assert!(trip_id_of(&missing).is_err());
    }

    #[test]
    fn location_id_reads_zone_documents() {
        let zone = doc! { "properties": { "LocationID": 132_i32 } };
        assert_eq!(location_id(&zone).unwrap(), 132);
    }
}
