//! Benchmark runner: drives the comparable query menu against both backends
//! with a seeded random workload and prints one line per measurement.

use chrono::NaiveDate;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tripbench::{
    random_id_list, random_interval, Config, DocumentStore, FetchMode, KnnStrategy,
    RelationalStore, Result, TableScope,
};

const DAY_IN_SECONDS: f64 = 86_400.0;
const DAY_IN_MILLIS: i64 = 86_400_000;

fn report(backend: &str, operation: &str, seconds: f64, cardinality: u64) {
    println!(
        "{:<10} {:<28} {:>10.4}s {:>12} rows",
        backend, operation, seconds, cardinality
    );
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    let seed: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(42);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    log::info!("tripbench {} starting with seed {}", tripbench::VERSION, seed);

    let mut pg = RelationalStore::connect(&config.relational)?;
    let mongo = DocumentStore::connect(&config.document)?;

    // Data-quality counts, identical logical question on both backends.
    let timed = pg.same_start_end_time()?;
    report("postgres", "same_start_end_time", timed.seconds, timed.value as u64);
    let timed = mongo.same_start_end_time()?;
    report("mongodb", "same_start_end_time", timed.seconds, timed.value);

    for x in [5.0, 10.0, 20.0] {
        let timed = pg.total_price_lte(x)?;
        report("postgres", "total_price_lte", timed.seconds, timed.value as u64);
        let timed = mongo.total_price_lte(x)?;
        report("mongodb", "total_price_lte", timed.seconds, timed.value);
    }

    let timed = pg.passenger_count_eq(2)?;
    report("postgres", "passenger_count_eq", timed.seconds, timed.value as u64);
    let timed = mongo.passenger_count_eq(2)?;
    report("mongodb", "passenger_count_eq", timed.seconds, timed.value);

    let timed = pg.long_trips(DAY_IN_SECONDS)?;
    report("postgres", "long_trips", timed.seconds, timed.value as u64);
    let timed = mongo.long_trips(DAY_IN_MILLIS)?;
    report("mongodb", "long_trips", timed.seconds, timed.value);

    // Spatial queries over a random workload.
    let range_start = NaiveDate::from_ymd_opt(2015, 1, 1).expect("static date");
    let range_end = NaiveDate::from_ymd_opt(2015, 1, 31).expect("static date");
    let interval = random_interval(&mut rng, range_start, range_end, 60)?;
    log::info!("random interval: {}", interval);

    let timed = pg.pip_interval(&interval, FetchMode::ServerCursor)?;
    report("postgres", "pip_interval", timed.seconds, timed.value.len() as u64);
    let timed = mongo.pip_interval(&interval)?;
    report("mongodb", "pip_interval", timed.seconds, timed.value.len() as u64);

    let max_id = match pg.min_max(&TableScope::Trips)?.value {
        Some((_, max)) => max,
        None => {
            log::warn!("trips table is empty, skipping id-driven queries");
            return Ok(());
        }
    };

    for trip_id in random_id_list(&mut rng, 5, max_id)? {
        let timed = pg.pip_trip_id(trip_id)?;
        report("postgres", "pip_trip_id", timed.seconds, timed.value.len() as u64);
        let timed = mongo.pip_trip_id(trip_id)?;
        report("mongodb", "pip_trip_id", timed.seconds, 1);

        for strategy in [KnnStrategy::SelfJoin, KnnStrategy::Subquery] {
            let timed = pg.knn(trip_id, 10, &TableScope::Trips, strategy)?;
            let name = match strategy {
                KnnStrategy::SelfJoin => "knn_v1",
                KnnStrategy::Subquery => "knn_v2",
            };
            report("postgres", name, timed.seconds, timed.value.len() as u64);
        }
        let timed = mongo.knn(trip_id, 10)?;
        report("mongodb", "knn", timed.seconds, timed.value.len() as u64);
    }

    Ok(())
}
