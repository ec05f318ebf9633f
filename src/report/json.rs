use serde::Serialize;

use crate::{TrainerError, TrainerResult};

/// Pretty JSON for anything the harness reports.
pub fn to_json<T: Serialize>(value: &T) -> TrainerResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| TrainerError::Io(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BenchmarkStats;
    use std::time::Duration;

    #[test]
    fn test_stats_json() {
        let stats = BenchmarkStats::from_durations(&[Duration::from_secs(2), Duration::from_secs(4)]);
        let s = to_json(&stats).unwrap();
        let v: serde_json::Value = serde_json::from_str(&s).unwrap();
        assert_eq!(v["sample_count"], 2);
        assert_eq!(v["mean"], 3.0);
        assert_eq!(v["stddev"], 1.0);
    }
}
