//! Relational query builders.
//!
//! Every builder is a pure function returning SQL text with `$n`
//! placeholders. Values are always bound at execution time; only identifiers
//! (table and column names, which the wire protocol cannot parameterise) are
//! formatted into the text, quoted through [`quote_ident`].
//!
//! Table contract: `trips` (timestamps `t_pickup`/`t_dropoff`, geometry
//! `l_pickup`/`l_dropoff`, fare column `total`, `num_passengers`) and `zones`
//! (polygon `geom`, identifier `gid`).

use crate::types::{DayClass, KnnStrategy, TableScope};

/// Quote an identifier for direct inclusion in SQL text.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Count of trips whose pickup and dropoff timestamps are equal.
pub const SAME_START_END_TIME: &str =
    "SELECT count(*) FROM trips WHERE t_pickup = t_dropoff";

/// Count of trips whose pickup and dropoff points are equal.
pub const SAME_START_END_LOCATION: &str =
    "SELECT count(*) FROM trips WHERE l_pickup = l_dropoff";

/// Count of trips with total price less than or equal to `$1`.
pub const TOTAL_PRICE_LTE: &str = "SELECT count(*) FROM trips WHERE total <= $1::float8";

/// Count of trips carrying exactly `$1` passengers.
pub const PASSENGER_COUNT_EQ: &str =
    "SELECT count(*) FROM trips WHERE num_passengers = $1::int";

/// Count of trips lasting at least `$1` seconds.
///
/// Duration is assembled from `DATE_PART` components so the comparison stays
/// inclusive at exactly the threshold.
pub const LONG_TRIPS: &str = "SELECT count(*) FROM trips \
     WHERE DATE_PART('day', t_dropoff - t_pickup) * 60 * 60 * 24 + \
           DATE_PART('hour', t_dropoff - t_pickup) * 60 * 60 + \
           DATE_PART('minute', t_dropoff - t_pickup) * 60 + \
           DATE_PART('second', t_dropoff - t_pickup) >= $1::float8";

/// Min/max of the scope's id column.
pub fn min_max(scope: &TableScope) -> String {
    let col = scope.id_column();
    format!(
        "SELECT min({col}), max({col}) FROM {table}",
        col = col,
        table = scope.table_name()
    )
}

/// k-NN of the pickup location of trip `$1`, limited to `$2` neighbors.
///
/// The two strategies are distinct query plans over the same question; both
/// order by the PostGIS `<->` distance operator against the reference trip's
/// pickup point.
pub fn knn(scope: &TableScope, strategy: KnnStrategy) -> String {
    let table = scope.table_name();
    let id = scope.id_column();
    match strategy {
        KnnStrategy::SelfJoin => format!(
            "SELECT y2.{id} FROM {table} y1, {table} y2 \
             WHERE y1.{id} = $1 \
             ORDER BY y1.l_pickup <-> y2.l_pickup \
             LIMIT $2",
            id = id,
            table = table
        ),
        KnnStrategy::Subquery => format!(
            "SELECT {id} FROM {table} \
             ORDER BY l_pickup <-> (SELECT l_pickup FROM {table} WHERE {id} = $1) \
             LIMIT $2",
            id = id,
            table = table
        ),
    }
}

/// Origin/destination zones of trip `$1`.
///
/// Full joins keep a trip whose point falls outside every zone in the result
/// with a NULL zone reference instead of dropping it; NULL is the sentinel
/// that distinguishes "outside all zones" from "no matching trip".
pub const PIP_TRIP_ID: &str = "SELECT z1.gid AS origin_zone, z2.gid AS destination_zone \
     FROM trips t \
     FULL JOIN zones z1 ON ST_Contains(z1.geom, t.l_pickup) \
     FULL JOIN zones z2 ON ST_Contains(z2.geom, t.l_dropoff) \
     WHERE t.id = $1";

/// Origin/destination zones of every trip picked up in `[$1, $2)`.
pub const PIP_INTERVAL: &str = "SELECT z1.gid AS origin_zone, z2.gid AS destination_zone \
     FROM trips t \
     FULL JOIN zones z1 ON ST_Contains(z1.geom, t.l_pickup) \
     FULL JOIN zones z2 ON ST_Contains(z2.geom, t.l_dropoff) \
     WHERE t.t_pickup >= $1 AND t.t_pickup < $2";

/// Latitude/longitude of the pickup point of trip `$1`.
pub fn pickup_position(scope: &TableScope) -> String {
    format!(
        "SELECT l_pickup_lat, l_pickup_lon FROM {table} WHERE {id} = $1",
        table = scope.table_name(),
        id = scope.id_column()
    )
}

/// Journey durations (seconds) for one origin-destination zone pair.
///
/// Filters: pickup in `[$1, $2)`, hour of day between `$3` and `$4`, minute
/// between `$5` and `$6`, origin zone `$7`, destination zone `$8`, and the
/// weekday/weekend split baked into the text (`DOW` 0 and 6 are Sunday and
/// Saturday).
pub fn journey_time_series(day_class: DayClass) -> String {
    let dow = match day_class {
        DayClass::Weekend => "(0, 6)",
        DayClass::Weekday => "(1, 2, 3, 4, 5)",
    };
    format!(
        "SELECT t.id, EXTRACT(EPOCH FROM (t.t_dropoff - t.t_pickup))::float8 \
         FROM trips t \
         FULL JOIN zones z1 ON ST_Contains(z1.geom, t.l_pickup) \
         FULL JOIN zones z2 ON ST_Contains(z2.geom, t.l_dropoff) \
         WHERE t.t_pickup >= $1 AND t.t_pickup < $2 \
         AND EXTRACT(HOUR FROM t.t_pickup) BETWEEN $3::int AND $4::int \
         AND EXTRACT(MINUTE FROM t.t_pickup) BETWEEN $5::int AND $6::int \
         AND z1.gid = $7 AND z2.gid = $8 \
         AND EXTRACT(DOW FROM t.t_pickup) IN {dow}",
        dow = dow
    )
}

/// Add a column to `trips`.
pub fn add_column(name: &str, sql_type: &str) -> String {
    format!("ALTER TABLE trips ADD COLUMN {} {}", quote_ident(name), sql_type)
}

/// Drop a column from `trips`.
pub fn drop_column(name: &str) -> String {
    format!("ALTER TABLE trips DROP COLUMN {}", quote_ident(name))
}

/// Mark same-location trips in a previously added flag column.
pub fn flag_same_location(column: &str) -> String {
    format!(
        "UPDATE trips SET {} = '1' WHERE l_pickup = l_dropoff",
        quote_ident(column)
    )
}

/// Fill the `origin_zone`/`dropoff_zone` columns from the zone polygons.
pub const FILL_OD_COLUMNS: &str = "UPDATE trips t \
     SET origin_zone = z1.gid, dropoff_zone = z2.gid \
     FROM zones z1, zones z2 \
     WHERE ST_Contains(z1.geom, t.l_pickup) AND ST_Contains(z2.geom, t.l_dropoff)";

pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

pub fn count_rows(table: &str) -> String {
    format!("SELECT count(*) FROM {}", quote_ident(table))
}

/// Create a one-day partition table.
///
/// `nid` is a fresh serial key; finding the min/max id of a single day in
/// `trips` is expensive, so the partition carries its own dense numbering.
pub fn create_day_table(table: &str) -> String {
    format!(
        "CREATE TABLE {table} (\
         nid serial, \
         id integer NOT NULL, \
         vendorid character varying(1), \
         t_pickup timestamp without time zone, \
         t_dropoff timestamp without time zone, \
         num_passengers smallint, \
         trip_distance real, \
         l_pickup_lon double precision, \
         l_pickup_lat double precision, \
         ratecodeid character(2), \
         flag_store character(1), \
         l_dropoff_lon double precision, \
         l_dropoff_lat double precision, \
         payment_type character(1), \
         fare_amount real, \
         extra real, \
         mta_tax real, \
         surcharge real, \
         tip real, \
         tolls real, \
         total real, \
         l_pickup geometry(Point,4326), \
         l_dropoff geometry(Point,4326), \
         CONSTRAINT {pk} PRIMARY KEY (id))",
        table = quote_ident(table),
        pk = quote_ident(&format!("pk_{}", table))
    )
}

/// Copy one calendar day of trips (`$1 <= t_pickup < $2`) into a partition
/// table.
pub fn fill_day_table(table: &str) -> String {
    format!(
        "INSERT INTO {table} (id, vendorid, t_pickup, t_dropoff, num_passengers, \
         trip_distance, l_pickup_lon, l_pickup_lat, ratecodeid, flag_store, \
         l_dropoff_lon, l_dropoff_lat, payment_type, fare_amount, extra, mta_tax, \
         surcharge, tip, tolls, total, l_pickup, l_dropoff) \
         SELECT * FROM trips WHERE t_pickup >= $1 AND t_pickup < $2",
        table = quote_ident(table)
    )
}

/// Select one export chunk: rows with id column in `($1, $2]`, ordered.
pub fn export_chunk(scope: &TableScope) -> String {
    let id = scope.id_column();
    let nid_column = match scope {
        TableScope::Trips => "",
        TableScope::Day(_) => "nid, ",
    };
    format!(
        "SELECT {nid}id, vendorid, t_pickup, t_dropoff, num_passengers, trip_distance, \
         l_pickup_lon, l_pickup_lat, ratecodeid, flag_store, l_dropoff_lon, \
         l_dropoff_lat, payment_type, fare_amount, extra, mta_tax, surcharge, tip, \
         tolls, total \
         FROM {table} WHERE {id} > $1::bigint AND {id} <= $2::bigint ORDER BY {id}",
        nid = nid_column,
        table = scope.table_name(),
        id = id
    )
}
