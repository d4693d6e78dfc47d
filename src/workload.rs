//! Reproducible random workload generation.
//!
//! Benchmark runs need repeatable inputs, so every generator takes an
//! explicit `Rng`; seeding a `ChaCha8Rng` makes a whole run deterministic.

use crate::error::{BenchError, Result};
use crate::types::{TimeInterval, TripId};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use rand::Rng;
use std::collections::HashSet;
use std::ops::RangeInclusive;

/// Identifiers reserved for document-store-only synthetic trips; never
/// produced by [`random_id_list`].
pub const RESERVED_DOCUMENT_IDS: RangeInclusive<TripId> = 8_000_001..=10_000_000;

/// Generate a random time interval of `minutes` length starting within the
/// inclusive year/month range of `[start, end]`.
///
/// The calendar date is drawn as a uniform (year, month, day-of-month)
/// triple, resampling whenever the triple names no real date (Feb 30, Apr 31
/// and so on), then paired with a uniform time of day.
pub fn random_interval<R: Rng>(
    rng: &mut R,
    start: NaiveDate,
    end: NaiveDate,
    minutes: i64,
) -> Result<TimeInterval> {
    if minutes <= 0 {
        return Err(BenchError::InvalidInput(format!(
            "interval length must be positive, got {} minutes",
            minutes
        )));
    }
    if start > end {
        return Err(BenchError::InvalidInput(format!(
            "interval range start {} is after end {}",
            start, end
        )));
    }
    if start.month() > end.month() {
        return Err(BenchError::InvalidInput(format!(
            "month range is inverted: {} > {}",
            start.month(),
            end.month()
        )));
    }

    let date = loop {
        let year = rng.gen_range(start.year()..=end.year());
        let month = rng.gen_range(start.month()..=end.month());
        let day = rng.gen_range(1..=31);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            break date;
        }
    };

    let time = NaiveTime::from_hms_opt(
        rng.gen_range(0..=23),
        rng.gen_range(0..=59),
        rng.gen_range(0..=59),
    )
    .expect("sampled time components are in range");

    let interval_start = date.and_time(time);
    Ok(TimeInterval::new(
        interval_start,
        interval_start + Duration::minutes(minutes),
    ))
}

/// Draw `n` distinct trip identifiers uniformly from `[1, max_id]`.
///
/// Draws colliding with [`RESERVED_DOCUMENT_IDS`] or with an id already in
/// the sample are rejected and redrawn until `n` valid identifiers are
/// collected. Draw order is preserved.
pub fn random_id_list<R: Rng>(rng: &mut R, n: usize, max_id: TripId) -> Result<Vec<TripId>> {
    if max_id < 1 {
        return Err(BenchError::InvalidInput(format!(
            "max_id must be at least 1, got {}",
            max_id
        )));
    }

    let reserved_overlap = {
        let lo = (*RESERVED_DOCUMENT_IDS.start()).max(1);
        let hi = (*RESERVED_DOCUMENT_IDS.end()).min(max_id);
        if hi >= lo {
            (hi - lo + 1) as usize
        } else {
            0
        }
    };
    let population = max_id as usize - reserved_overlap;
    if n > population {
        return Err(BenchError::InvalidInput(format!(
            "cannot draw {} distinct ids from a population of {}",
            n, population
        )));
    }

    let mut seen = HashSet::with_capacity(n);
    let mut ids = Vec::with_capacity(n);
    while ids.len() < n {
        let id = rng.gen_range(1..=max_id);
        if RESERVED_DOCUMENT_IDS.contains(&id) {
            continue;
        }
        if seen.insert(id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn interval_is_valid_and_exact_length() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..500 {
            let interval =
                random_interval(&mut rng, date(2015, 1, 1), date(2015, 1, 31), 1440).unwrap();
            assert!(interval.start < interval.end);
            assert_eq!(interval.duration_minutes(), 1440);
            assert_eq!(interval.start.year(), 2015);
            assert_eq!(interval.start.month(), 1);
            assert!(interval.start.hour() <= 23);
        }
    }

    #[test]
    fn different_seeds_give_different_intervals() {
        let mut a = ChaCha8Rng::seed_from_u64(1);
        let mut b = ChaCha8Rng::seed_from_u64(2);
        let ia = random_interval(&mut a, date(2015, 1, 1), date(2015, 1, 31), 1440).unwrap();
        let ib = random_interval(&mut b, date(2015, 1, 1), date(2015, 1, 31), 1440).unwrap();
        assert_ne!(ia, ib);
    }

    #[test]
    fn same_seed_is_reproducible() {
        let mut a = ChaCha8Rng::seed_from_u64(99);
        let mut b = ChaCha8Rng::seed_from_u64(99);
        let ia = random_interval(&mut a, date(2015, 1, 1), date(2015, 12, 31), 30).unwrap();
        let ib = random_interval(&mut b, date(2015, 1, 1), date(2015, 12, 31), 30).unwrap();
        assert_eq!(ia, ib);
    }

    #[test]
    fn invalid_dates_are_resampled_away() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        // February only: day draws of 29-31 must be rejected for 2015.
        for _ in 0..200 {
            let interval =
                random_interval(&mut rng, date(2015, 2, 1), date(2015, 2, 28), 60).unwrap();
            assert_eq!(interval.start.month(), 2);
            assert!(interval.start.day() <= 28);
        }
    }

    #[test]
    fn rejects_bad_parameters() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(random_interval(&mut rng, date(2015, 1, 1), date(2015, 1, 31), 0).is_err());
        assert!(random_interval(&mut rng, date(2015, 3, 1), date(2015, 1, 31), 60).is_err());
    }

    #[test]
    fn id_list_is_distinct_and_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let ids = random_id_list(&mut rng, 1000, 12_000_000).unwrap();
        assert_eq!(ids.len(), 1000);
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 1000);
        for id in &ids {
            assert!((1..=12_000_000).contains(id));
            assert!(!RESERVED_DOCUMENT_IDS.contains(id));
        }
    }

    #[test]
    fn id_list_skips_reserved_range_under_pressure() {
        // max_id sits inside the reserved range, so valid ids are 1..=8_000_000.
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let ids = random_id_list(&mut rng, 200, 9_000_000).unwrap();
        for id in &ids {
            assert!(*id <= 8_000_000);
        }
    }

    #[test]
    fn id_list_rejects_impossible_draws() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(random_id_list(&mut rng, 10, 5).is_err());
        assert!(random_id_list(&mut rng, 1, 0).is_err());
    }

    #[test]
    fn id_list_exact_population_is_satisfiable() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut ids = random_id_list(&mut rng, 5, 5).unwrap();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }
}
