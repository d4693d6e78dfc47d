//! Cross-module tests for the pure parts of the harness: workload
//! generation, the query builders both adapters delegate to, and the chunked
//! interchange export.

use chrono::{Datelike, NaiveDate};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use tripbench::export::{chunk_file_name, num_chunks, render_feature, ChunkWriter, TripFeature};
use tripbench::{
    filters, random_id_list, random_interval, sql, DayClass, ErrorFlag, KnnStrategy, TableScope,
    TimeInterval, RESERVED_DOCUMENT_IDS,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn seeded_interval_workload_is_valid_and_diverse() {
    // Fixed date range, 24-hour windows: two seeds must give two different
    // but individually valid intervals.
    let mut first = ChaCha8Rng::seed_from_u64(7);
    let mut second = ChaCha8Rng::seed_from_u64(8);

    let a = random_interval(&mut first, date(2015, 1, 1), date(2015, 1, 31), 1440).unwrap();
    let b = random_interval(&mut second, date(2015, 1, 1), date(2015, 1, 31), 1440).unwrap();

    for interval in [&a, &b] {
        assert!(interval.start < interval.end);
        assert_eq!(interval.duration_minutes(), 1440);
        assert_eq!(interval.start.year(), 2015);
        assert_eq!(interval.start.month(), 1);
    }
    assert_ne!(a, b);
}

#[test]
fn id_workload_respects_the_reserved_range() {
    let mut rng = ChaCha8Rng::seed_from_u64(1234);
    let ids = random_id_list(&mut rng, 5_000, 12_000_000).unwrap();
    assert_eq!(ids.len(), 5_000);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 5_000);
    assert!(ids.iter().all(|id| !RESERVED_DOCUMENT_IDS.contains(id)));
    assert!(ids.iter().all(|id| (1..=12_000_000).contains(id)));
}

#[test]
fn both_backends_ask_the_same_interval_question() {
    // Half-open on both sides: >= / < in SQL, $gte / $lt in the filter.
    let interval = TimeInterval::new(
        date(2015, 1, 10).and_hms_opt(0, 0, 0).unwrap(),
        date(2015, 1, 11).and_hms_opt(0, 0, 0).unwrap(),
    );

    assert!(sql::PIP_INTERVAL.contains("t.t_pickup >= $1 AND t.t_pickup < $2"));

    let filter = filters::pickup_in_interval(&interval);
    let bounds = filter
        .get_document("properties.tpep_pickup_datetime")
        .unwrap();
    assert!(bounds.contains_key("$gte"));
    assert!(bounds.contains_key("$lt"));
}

#[test]
fn both_backends_use_inclusive_thresholds() {
    assert!(sql::TOTAL_PRICE_LTE.contains("<="));
    assert!(sql::LONG_TRIPS.contains(">="));

    let price = filters::total_price_lte(10.0);
    assert!(price
        .get_document("properties.total_amount")
        .unwrap()
        .contains_key("$lte"));

    let pipeline = filters::long_trips_count_pipeline(1_000);
    let matched = pipeline[1].get_document("$match").unwrap();
    assert!(matched
        .get_document("dateDifference")
        .unwrap()
        .contains_key("$gte"));
}

#[test]
fn knn_plans_differ_but_target_the_same_neighbors() {
    let v1 = sql::knn(&TableScope::Trips, KnnStrategy::SelfJoin);
    let v2 = sql::knn(&TableScope::Trips, KnnStrategy::Subquery);
    assert_ne!(v1, v2);
    for plan in [&v1, &v2] {
        assert!(plan.contains("<->"));
        assert!(plan.contains("LIMIT $2"));
        assert!(plan.contains("l_pickup"));
    }
}

#[test]
fn flag_numbering_matches_between_backends() {
    // The five data-quality predicates map to Flag_1..Flag_5 document fields
    // and to one relational column each.
    let flags = [
        ErrorFlag::SameStartEndTime,
        ErrorFlag::TotalPriceLte,
        ErrorFlag::PassengerCountEq,
        ErrorFlag::LongTrip,
        ErrorFlag::SameStartEndLocation,
    ];
    for (i, flag) in flags.iter().enumerate() {
        assert_eq!(flag.field(), format!("Errors.Flag_{}", i + 1));
        assert!(!flag.column().is_empty());
    }

    let columns: HashSet<_> = flags.iter().map(|f| f.column()).collect();
    assert_eq!(columns.len(), flags.len());
}

#[test]
fn journey_series_weekend_and_weekday_are_complements() {
    let weekend = sql::journey_time_series(DayClass::Weekend);
    let weekday = sql::journey_time_series(DayClass::Weekday);
    assert!(weekend.contains("(0, 6)"));
    assert!(weekday.contains("(1, 2, 3, 4, 5)"));
}

#[test]
fn day_partition_export_round_trip() {
    let day = date(2015, 5, 23);
    let scope = TableScope::Day(day);
    assert_eq!(scope.table_name(), "day_2015_05_23");

    let pickup = day.and_hms_opt(10, 0, 0).unwrap();
    let features: Vec<TripFeature> = (1..=3)
        .map(|nid| TripFeature {
            nid: Some(nid),
            id: 1_000 + nid,
            vendor_id: "1".into(),
            t_pickup: pickup,
            t_dropoff: pickup + chrono::Duration::minutes(10),
            num_passengers: 1,
            trip_distance: 1.2,
            pickup_lon: -73.99,
            pickup_lat: 40.73,
            ratecode_id: "1".into(),
            store_and_fwd_flag: "N".into(),
            dropoff_lon: -73.97,
            dropoff_lat: 40.76,
            payment_type: "2".into(),
            fare_amount: 7.5,
            extra: 0.0,
            mta_tax: 0.5,
            surcharge: 0.3,
            tip: 0.0,
            tolls: 0.0,
            total: 8.3,
        })
        .collect();

    let tmp = tempfile::tempdir().unwrap();
    let writer = ChunkWriter::create(tmp.path().join(scope.table_name())).unwrap();
    let path = writer.write_chunk(0, &features).unwrap();

    let contents = std::fs::read_to_string(path).unwrap();
    assert_eq!(contents.lines().count(), 3);
    assert!(contents.contains("\"nid\" : 1"));
    assert!(contents.contains("ISODate(\"2015-05-23T10:00:00Z\")"));

    // 3 rows at the default chunk size still produce exactly one file.
    assert_eq!(num_chunks(3, 100_000), 1);
    assert_eq!(chunk_file_name(0), "nyc2015_json_0.geojson");
}

#[test]
fn rendered_features_are_one_record_per_line() {
    let pickup = date(2015, 1, 1).and_hms_opt(0, 0, 0).unwrap();
    let feature = TripFeature {
        nid: None,
        id: 1,
        vendor_id: "2".into(),
        t_pickup: pickup,
        t_dropoff: pickup,
        num_passengers: 0,
        trip_distance: 0.0,
        pickup_lon: 0.0,
        pickup_lat: 0.0,
        ratecode_id: "1".into(),
        store_and_fwd_flag: "N".into(),
        dropoff_lon: 0.0,
        dropoff_lat: 0.0,
        payment_type: "1".into(),
        fare_amount: 0.0,
        extra: 0.0,
        mta_tax: 0.0,
        surcharge: 0.0,
        tip: 0.0,
        tolls: 0.0,
        total: 0.0,
    };
    let record = render_feature(&feature);
    assert!(!record.contains('\n'));
    assert!(record.starts_with("{ \"type\" : \"Feature\""));
    assert!(record.ends_with("},"));
}
