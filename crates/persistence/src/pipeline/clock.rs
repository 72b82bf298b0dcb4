//! Server-side ingestion timestamps.

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;

/// Issues strictly increasing UTC timestamps with microsecond precision.
///
/// Two records ingested within the same microsecond, or across a wall-clock
/// step backwards, still get distinct and ordered timestamps, which is what
/// makes `sys_ingested_at` usable as a join key.
#[derive(Debug, Default)]
pub struct IngestClock {
    last_micros: Mutex<i64>,
}

impl IngestClock {
    /// Creates a clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next timestamp.
    pub fn next(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_micros();
        let mut last = self.last_micros.lock();
        let micros = if now > *last { now } else { *last + 1 };
        *last = micros;
        DateTime::from_timestamp_micros(micros).unwrap_or_else(Utc::now)
    }

    /// Formats a timestamp the way it is stored: RFC 3339, microseconds, `Z`.
    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_strictly_increasing() {
        let clock = IngestClock::new();
        let mut previous = clock.next();
        for _ in 0..10_000 {
            let next = clock.next();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_format() {
        let ts = DateTime::from_timestamp_micros(1_704_067_200_000_001).unwrap();
        assert_eq!(IngestClock::format(&ts), "2024-01-01T00:00:00.000001Z");
    }

    #[test]
    fn test_unique_across_threads() {
        let clock = Arc::new(IngestClock::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = Arc::clone(&clock);
                std::thread::spawn(move || {
                    (0..1000)
                        .map(|_| IngestClock::format(&clock.next()))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut all = HashSet::new();
        for handle in handles {
            for ts in handle.join().unwrap() {
                assert!(all.insert(ts));
            }
        }
        assert_eq!(all.len(), 4000);
    }
}
