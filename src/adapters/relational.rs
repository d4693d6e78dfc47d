//! Relational backend adapter.
//!
//! Wraps one blocking connection to the PostGIS-backed store. Each operation
//! builds its SQL through [`crate::sql`], binds the parameters, and times
//! submission plus full row materialisation. Statement-level resources are
//! scoped to the call, so they are released on every exit path.

use crate::config::{ExportConfig, RelationalConfig};
use crate::error::Result;
use crate::export::{num_chunks, ChunkWriter, TripFeature};
use crate::sql;
use crate::timing::{time, Timed};
use crate::types::{
    DayClass, ErrorFlag, FetchMode, HourRange, KnnStrategy, MinuteRange, OdPair, TableScope,
    TimeInterval, TripId, ZoneId, ZoneRef,
};
use chrono::{Duration, NaiveDate, NaiveTime};
use fallible_iterator::FallibleIterator;
use postgres::error::SqlState;
use postgres::types::ToSql;
use postgres::{Client, NoTls, Row};
use std::collections::BTreeSet;

/// Adapter over the relational store.
///
/// Holds a single long-lived connection opened at construction; construction
/// fails immediately if the server is unreachable, so no operation can fail
/// late with a dead handle.
pub struct RelationalStore {
    client: Client,
}

impl RelationalStore {
    pub fn connect(config: &RelationalConfig) -> Result<Self> {
        let client = postgres::Config::new()
            .host(&config.host)
            .port(config.port)
            .dbname(&config.dbname)
            .user(&config.user)
            .password(&config.password)
            .connect(NoTls)?;
        log::info!(
            "connected to relational store at {}:{}/{}",
            config.host,
            config.port,
            config.dbname
        );
        Ok(Self { client })
    }

    fn timed_count(&mut self, query: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Timed<i64>> {
        time(|| {
            let row = self.client.query_one(query, params)?;
            Ok(row.try_get(0)?)
        })
    }

    /// How many trips have the same start and end time?
    pub fn same_start_end_time(&mut self) -> Result<Timed<i64>> {
        self.timed_count(sql::SAME_START_END_TIME, &[])
    }

    /// How many trips start and end at the same location?
    pub fn same_start_end_location(&mut self) -> Result<Timed<i64>> {
        self.timed_count(sql::SAME_START_END_LOCATION, &[])
    }

    /// How many trips cost at most `x`?
    pub fn total_price_lte(&mut self, x: f64) -> Result<Timed<i64>> {
        self.timed_count(sql::TOTAL_PRICE_LTE, &[&x])
    }

    /// How many trips carried exactly `x` passengers?
    pub fn passenger_count_eq(&mut self, x: i32) -> Result<Timed<i64>> {
        self.timed_count(sql::PASSENGER_COUNT_EQ, &[&x])
    }

    /// How many trips lasted at least `threshold_secs` seconds?
    pub fn long_trips(&mut self, threshold_secs: f64) -> Result<Timed<i64>> {
        self.timed_count(sql::LONG_TRIPS, &[&threshold_secs])
    }

    /// Min and max of the scope's id column; `None` on an empty table.
    pub fn min_max(&mut self, scope: &TableScope) -> Result<Timed<Option<(TripId, TripId)>>> {
        let query = sql::min_max(scope);
        time(|| {
            let row = self.client.query_one(query.as_str(), &[])?;
            let min: Option<TripId> = row.try_get(0)?;
            let max: Option<TripId> = row.try_get(1)?;
            Ok(min.zip(max))
        })
    }

    /// k nearest neighbors of the pickup location of `trip_id`.
    ///
    /// Both strategies must produce the same neighbor set; they exist to
    /// compare the planner's treatment of the two query shapes.
    pub fn knn(
        &mut self,
        trip_id: TripId,
        k: i64,
        scope: &TableScope,
        strategy: KnnStrategy,
    ) -> Result<Timed<BTreeSet<TripId>>> {
        let query = sql::knn(scope, strategy);
        time(|| {
            let rows = self.client.query(query.as_str(), &[&trip_id, &k])?;
            let mut neighbors = BTreeSet::new();
            for row in &rows {
                neighbors.insert(row.try_get(0)?);
            }
            Ok(neighbors)
        })
    }

    /// Origin/destination zones of one trip.
    ///
    /// A pickup or dropoff outside every zone comes back as
    /// [`ZoneRef::Outside`], not as a missing row.
    pub fn pip_trip_id(&mut self, trip_id: TripId) -> Result<Timed<Vec<OdPair>>> {
        time(|| {
            let rows = self.client.query(sql::PIP_TRIP_ID, &[&trip_id])?;
            rows.iter().map(od_from_row).collect()
        })
    }

    /// Origin/destination zones of every trip picked up inside the interval.
    ///
    /// `ServerCursor` streams rows instead of buffering the whole result
    /// set; month-scale intervals produce millions of rows.
    pub fn pip_interval(
        &mut self,
        interval: &TimeInterval,
        fetch: FetchMode,
    ) -> Result<Timed<Vec<OdPair>>> {
        match fetch {
            FetchMode::Buffered => time(|| {
                let rows = self
                    .client
                    .query(sql::PIP_INTERVAL, &[&interval.start, &interval.end])?;
                rows.iter().map(od_from_row).collect()
            }),
            FetchMode::ServerCursor => time(|| {
                let params: [&(dyn ToSql + Sync); 2] = [&interval.start, &interval.end];
                let mut rows = self.client.query_raw(sql::PIP_INTERVAL, params)?;
                let mut od = Vec::new();
                while let Some(row) = rows.next()? {
                    od.push(od_from_row(&row)?);
                }
                Ok(od)
            }),
        }
    }

    /// Latitude/longitude of the pickup point of `trip_id`, if present.
    pub fn pickup_position(
        &mut self,
        scope: &TableScope,
        trip_id: TripId,
    ) -> Result<Timed<Option<(f64, f64)>>> {
        let query = sql::pickup_position(scope);
        time(|| {
            let row = self.client.query_opt(query.as_str(), &[&trip_id])?;
            match row {
                Some(row) => Ok(Some((row.try_get(0)?, row.try_get(1)?))),
                None => Ok(None),
            }
        })
    }

    /// Journey durations for one origin-destination pair, filtered by date
    /// range, hour and minute of day, and weekday/weekend.
    #[allow(clippy::too_many_arguments)]
    pub fn journey_time_series(
        &mut self,
        od: (ZoneId, ZoneId),
        analysis_interval: &TimeInterval,
        hours: HourRange,
        minutes: MinuteRange,
        day_class: DayClass,
    ) -> Result<Timed<Vec<(TripId, f64)>>> {
        let query = sql::journey_time_series(day_class);
        let hour_from = i32::from(hours.from);
        let hour_to = i32::from(hours.to);
        let minute_from = i32::from(minutes.from);
        let minute_to = i32::from(minutes.to);
        time(|| {
            let rows = self.client.query(
                query.as_str(),
                &[
                    &analysis_interval.start,
                    &analysis_interval.end,
                    &hour_from,
                    &hour_to,
                    &minute_from,
                    &minute_to,
                    &od.0,
                    &od.1,
                ],
            )?;
            let mut series = Vec::with_capacity(rows.len());
            for row in &rows {
                series.push((row.try_get(0)?, row.try_get(1)?));
            }
            Ok(series)
        })
    }

    /// Add a column to `trips`; a column that already exists is tolerated.
    ///
    /// Only the duplicate-column condition is absorbed; any other failure
    /// propagates.
    pub fn add_attribute(&mut self, name: &str, sql_type: &str) -> Result<Timed<()>> {
        let query = sql::add_column(name, sql_type);
        time(|| match self.client.execute(query.as_str(), &[]) {
            Ok(_) => Ok(()),
            Err(e) if e.code() == Some(&SqlState::DUPLICATE_COLUMN) => {
                log::warn!("column {} already exists on trips", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        })
    }

    /// Drop a column from `trips`; an absent column is tolerated.
    pub fn remove_attribute(&mut self, name: &str) -> Result<Timed<()>> {
        let query = sql::drop_column(name);
        time(|| match self.client.execute(query.as_str(), &[]) {
            Ok(_) => Ok(()),
            Err(e) if e.code() == Some(&SqlState::UNDEFINED_COLUMN) => {
                log::warn!("column {} does not exist on trips", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        })
    }

    /// Reset the flag column for `flag` and mark all same-location trips.
    ///
    /// Rebuilding the column makes the pass idempotent: a second invocation
    /// marks the same rows again and the flagged-row count is unchanged.
    pub fn add_error_flags(&mut self, flag: ErrorFlag) -> Result<Timed<u64>> {
        self.remove_attribute(flag.column())?;
        self.add_attribute(flag.column(), "character")?;
        let update = sql::flag_same_location(flag.column());
        time(|| Ok(self.client.execute(update.as_str(), &[])?))
    }

    /// Add `origin_zone`/`dropoff_zone` columns and fill them from the zone
    /// polygons in one bulk update.
    pub fn add_od_columns(&mut self) -> Result<Timed<u64>> {
        self.add_attribute("origin_zone", "smallint")?;
        self.add_attribute("dropoff_zone", "smallint")?;
        time(|| Ok(self.client.execute(sql::FILL_OD_COLUMNS, &[])?))
    }

    /// Carve one calendar day out of `trips` into its own partition table and
    /// export it as interchange chunks.
    ///
    /// The partition is rebuilt from scratch (drop-if-exists), so re-running
    /// the extraction is safe. Returns the number of rows in the partition.
    pub fn extract_day(&mut self, day: NaiveDate, export: &ExportConfig) -> Result<Timed<i64>> {
        let scope = TableScope::Day(day);
        let table = scope.table_name();
        let drop = sql::drop_table(&table);
        let create = sql::create_day_table(&table);
        let fill = sql::fill_day_table(&table);
        let count = sql::count_rows(&table);
        let window_start = day.and_time(NaiveTime::MIN);
        let window_end = window_start + Duration::days(1);
        let writer = ChunkWriter::create(export.output_dir.join(&table))?;
        let chunk_size = export.chunk_size;

        time(|| {
            self.client.execute(drop.as_str(), &[])?;
            self.client.execute(create.as_str(), &[])?;
            let copied = self
                .client
                .execute(fill.as_str(), &[&window_start, &window_end])?;
            log::info!("copied {} trips into {}", copied, table);

            let rows: i64 = self.client.query_one(count.as_str(), &[])?.try_get(0)?;
            for chunk_id in 0..num_chunks(rows, chunk_size) {
                self.export_chunk(&scope, chunk_size, chunk_id, &writer)?;
            }
            Ok(rows)
        })
    }

    /// Export one chunk of a table as interchange features; returns the
    /// number of rows written.
    pub fn export_chunk(
        &mut self,
        scope: &TableScope,
        chunk_size: i64,
        chunk_id: i64,
        writer: &ChunkWriter,
    ) -> Result<usize> {
        let query = sql::export_chunk(scope);
        let lower = chunk_id * chunk_size;
        let upper = (chunk_id + 1) * chunk_size;
        let rows = self.client.query(query.as_str(), &[&lower, &upper])?;

        let has_nid = matches!(scope, TableScope::Day(_));
        let mut features = Vec::with_capacity(rows.len());
        for row in &rows {
            features.push(feature_from_row(row, has_nid)?);
        }
        writer.write_chunk(chunk_id, &features)?;
        Ok(features.len())
    }
}

fn od_from_row(row: &Row) -> Result<OdPair> {
    let origin: Option<ZoneId> = row.try_get(0)?;
    let destination: Option<ZoneId> = row.try_get(1)?;
    Ok(OdPair::new(
        ZoneRef::from_nullable(origin),
        ZoneRef::from_nullable(destination),
    ))
}

fn feature_from_row(row: &Row, has_nid: bool) -> Result<TripFeature> {
    let base = usize::from(has_nid);
    Ok(TripFeature {
        nid: if has_nid { Some(row.try_get(0)?) } else { None },
        id: row.try_get(base)?,
        vendor_id: row.try_get(base + 1)?,
        t_pickup: row.try_get(base + 2)?,
        t_dropoff: row.try_get(base + 3)?,
        num_passengers: row.try_get(base + 4)?,
        trip_distance: row.try_get(base + 5)?,
        pickup_lon: row.try_get(base + 6)?,
        pickup_lat: row.try_get(base + 7)?,
        ratecode_id: row.try_get(base + 8)?,
        store_and_fwd_flag: row.try_get(base + 9)?,
        dropoff_lon: row.try_get(base + 10)?,
        dropoff_lat: row.try_get(base + 11)?,
        payment_type: row.try_get(base + 12)?,
        fare_amount: row.try_get(base + 13)?,
        extra: row.try_get(base + 14)?,
        mta_tax: row.try_get(base + 15)?,
        surcharge: row.try_get(base + 16)?,
        tip: row.try_get(base + 17)?,
        tolls: row.try_get(base + 18)?,
        total: row.try_get(base + 19)?,
    })
}
