//! Metric classification of trainer output lines.
//!
//! Classification is driven by [`MARKERS`], an ordered table of substrings.
//! The first marker a line contains decides its kind, so more specific
//! markers must come before more general ones.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Accuracy,
    Loss,
    AverageAccuracy,
    ParameterCount,
    Unrecognized,
}

impl MetricKind {
    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::Accuracy => "accuracy",
            MetricKind::Loss => "loss",
            MetricKind::AverageAccuracy => "average_accuracy",
            MetricKind::ParameterCount => "parameter_count",
            MetricKind::Unrecognized => "unrecognized",
        }
    }
}

/// One entry of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct Marker {
    pub pattern: &'static str,
    pub kind: MetricKind,
    pub case_insensitive: bool,
}

impl Marker {
    const fn exact(pattern: &'static str, kind: MetricKind) -> Self {
        Marker { pattern, kind, case_insensitive: false }
    }

    const fn any_case(pattern: &'static str, kind: MetricKind) -> Self {
        Marker { pattern, kind, case_insensitive: true }
    }

    /// Byte offset just past the marker in `line`, if present.
    fn find_end(&self, line: &str) -> Option<usize> {
        let start = if self.case_insensitive {
            line.to_ascii_lowercase().find(&self.pattern.to_ascii_lowercase())
        } else {
            line.find(self.pattern)
        }?;
        Some(start + self.pattern.len())
    }
}

/// Markers in priority order.
pub const MARKERS: &[Marker] = &[
    Marker::exact("Test Accuracy:", MetricKind::Accuracy),
    Marker::exact("Test Loss:", MetricKind::Loss),
    Marker::exact("Average Accuracy:", MetricKind::AverageAccuracy),
    Marker::any_case("parameters:", MetricKind::ParameterCount),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub kind: MetricKind,
    /// The line exactly as captured
    pub raw_line: String,
    /// Number following the marker, when one parses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

fn matching_marker(line: &str) -> Option<(&'static Marker, usize)> {
    MARKERS.iter().find_map(|m| m.find_end(line).map(|end| (m, end)))
}

pub fn classify(line: &str) -> MetricKind {
    matching_marker(line).map_or(MetricKind::Unrecognized, |(m, _)| m.kind)
}

/// Classify a single line, keeping unrecognized lines.
pub fn classify_line(line: &str) -> Metric {
    match matching_marker(line) {
        Some((marker, end)) => Metric {
            kind: marker.kind,
            raw_line: line.to_string(),
            value: parse_value(&line[end..]),
        },
        None => Metric {
            kind: MetricKind::Unrecognized,
            raw_line: line.to_string(),
            value: None,
        },
    }
}

/// All recognized metrics in `lines`, in input order.
pub fn extract<S: AsRef<str>>(lines: &[S]) -> Vec<Metric> {
    lines
        .iter()
        .map(|l| classify_line(l.as_ref()))
        .filter(|m| m.kind != MetricKind::Unrecognized)
        .collect()
}

/// Parse the first token after a marker: "91.3%" -> 91.3, "1,200,000" -> 1200000.
fn parse_value(rest: &str) -> Option<f64> {
    let token = rest.split_whitespace().next()?;
    let cleaned: String = token
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
