//! Wall-clock timing wrapper shared by every benchmark operation.

use crate::error::Result;
use std::time::Instant;

/// A query result paired with its wall-clock execution time.
///
/// `seconds` covers submission through full result materialisation. Query
/// construction happens before the clock starts, so marshalling the SQL text
/// or filter document is excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct Timed<T> {
    pub seconds: f64,
    pub value: T,
}

impl<T> Timed<T> {
    pub fn new(seconds: f64, value: T) -> Self {
        Self { seconds, value }
    }

    /// Map the payload while keeping the measured time.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Timed<U> {
        Timed {
            seconds: self.seconds,
            value: f(self.value),
        }
    }
}

/// Run `f` and report how long it took.
///
/// The timestamp is captured immediately before invoking the closure and
/// immediately after it returns; the closure is expected to submit the query
/// and materialise the result, so counting/iterating all matches is included
/// in the measurement. Errors propagate untimed.
pub fn time<T>(f: impl FnOnce() -> Result<T>) -> Result<Timed<T>> {
    let start = Instant::now();
    let value = f()?;
    Ok(Timed::new(start.elapsed().as_secs_f64(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;

    #[test]
    fn time_reports_payload_and_elapsed() {
        let timed = time(|| Ok(41 + 1)).unwrap();
        assert_eq!(timed.value, 42);
        assert!(timed.seconds >= 0.0);
    }

    #[test]
    fn time_includes_work_in_closure() {
        let timed = time(|| {
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(())
        })
        .unwrap();
        assert!(timed.seconds >= 0.02);
    }

    #[test]
    fn time_propagates_errors() {
        let result: Result<Timed<()>> = time(|| Err(BenchError::InvalidInput("bad".into())));
        assert!(result.is_err());
    }

    #[test]
    fn map_keeps_seconds() {
        let timed = Timed::new(1.5, 10).map(|v| v * 2);
        assert_eq!(timed.value, 20);
        assert_eq!(timed.seconds, 1.5);
    }
}
