//! Wall-clock timing statistics for benchmark sessions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Summary of the successful run durations in one benchmark session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkStats {
    pub sample_count: usize,
    #[serde(with = "secs")]
    pub mean: Duration,
    #[serde(default, with = "opt_secs", skip_serializing_if = "Option::is_none")]
    pub stddev: Option<Duration>,
    #[serde(default, with = "opt_secs", skip_serializing_if = "Option::is_none")]
    pub min: Option<Duration>,
    #[serde(default, with = "opt_secs", skip_serializing_if = "Option::is_none")]
    pub max: Option<Duration>,
}

impl BenchmarkStats {
    /// Reduce samples to summary statistics.
    ///
    /// Empty input gives a zero mean and no other fields. A single sample
    /// sets min and max to the sample and leaves stddev out. The standard
    /// deviation is the population one (divides by n).
    pub fn from_durations(samples: &[Duration]) -> Self {
        let n = samples.len();
        if n == 0 {
            return BenchmarkStats {
                sample_count: 0,
                mean: Duration::ZERO,
                stddev: None,
                min: None,
                max: None,
            };
        }

        let secs: Vec<f64> = samples.iter().map(Duration::as_secs_f64).collect();
        let mean = secs.iter().sum::<f64>() / n as f64;
        let min = samples.iter().min().copied();
        let max = samples.iter().max().copied();

        let stddev = if n > 1 {
            let variance = secs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
            Some(Duration::from_secs_f64(variance.sqrt()))
        } else {
            None
        };

        BenchmarkStats {
            sample_count: n,
            mean: if n == 1 { samples[0] } else { Duration::from_secs_f64(mean) },
            stddev,
            min,
            max,
        }
    }
}

/// `Duration` as fractional seconds.
pub(crate) mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let v = f64::deserialize(d)?;
        Duration::try_from_secs_f64(v).map_err(serde::de::Error::custom)
    }
}

pub(crate) mod opt_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        match Option::<f64>::deserialize(d)? {
            Some(v) => Duration::try_from_secs_f64(v)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
