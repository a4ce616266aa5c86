//! Scalar forcing time series with linear interpolation.

use serde::{Deserialize, Serialize};

use super::ForcingError;

/// A single `(time, value)` sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRecord {
    /// Time (s)
    pub time: f64,
    pub value: f64,
}

impl TimeSeriesRecord {
    pub fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum Samples {
    Constant(f64),
    Records(Vec<TimeSeriesRecord>),
}

/// Scalar time series.
///
/// Values between samples are interpolated linearly. Lookups outside the
/// sampled range fail rather than extrapolate; a constant series covers all
/// time.
///
/// Deserialized series go through the same checks as [`TimeSeries::from_records`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeSeries")]
pub struct TimeSeries {
    samples: Samples,
}

/// Unchecked wire form of [`TimeSeries`].
#[derive(Deserialize)]
struct RawTimeSeries {
    samples: Samples,
}

impl TryFrom<RawTimeSeries> for TimeSeries {
    type Error = ForcingError;

    fn try_from(raw: RawTimeSeries) -> Result<Self, Self::Error> {
        match raw.samples {
            Samples::Constant(value) => Ok(Self::constant(value)),
            Samples::Records(records) => Self::from_records(records),
        }
    }
}

impl TimeSeries {
    /// A series holding `value` at every time.
    pub fn constant(value: f64) -> Self {
        Self {
            samples: Samples::Constant(value),
        }
    }

    /// Build from records sorted by strictly increasing time.
    ///
    /// # Errors
    /// - `EmptySeries` if no records are given
    /// - `NonMonotonic` if times do not strictly increase
    pub fn from_records(records: Vec<TimeSeriesRecord>) -> Result<Self, ForcingError> {
        if records.is_empty() {
            return Err(ForcingError::EmptySeries);
        }
        for i in 1..records.len() {
            if records[i].time <= records[i - 1].time {
                return Err(ForcingError::NonMonotonic { index: i });
            }
        }
        Ok(Self {
            samples: Samples::Records(records),
        })
    }

    /// Build from `(time, value)` pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, ForcingError> {
        Self::from_records(
            pairs
                .iter()
                .map(|&(time, value)| TimeSeriesRecord::new(time, value))
                .collect(),
        )
    }

    /// Time range covered, `None` for constant series.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        match &self.samples {
            Samples::Constant(_) => None,
            Samples::Records(r) => Some((r[0].time, r[r.len() - 1].time)),
        }
    }

    /// Check if `t` is covered.
    pub fn contains_time(&self, t: f64) -> bool {
        self.time_range()
            .is_none_or(|(t0, t1)| t >= t0 && t <= t1)
    }

    /// Value at time `t`.
    pub fn value_at(&self, t: f64) -> Result<f64, ForcingError> {
        let records = match &self.samples {
            Samples::Constant(v) => return Ok(*v),
            Samples::Records(r) => r,
        };

        let first = records[0];
        let last = records[records.len() - 1];
        if !(t >= first.time && t <= last.time) {
            return Err(ForcingError::OutOfRange {
                time: t,
                start: first.time,
                end: last.time,
            });
        }

        // First record with time > t; t lies in [idx-1, idx]
        let idx = records.partition_point(|r| r.time <= t);
        if idx >= records.len() {
            return Ok(last.value);
        }
        let r0 = records[idx - 1];
        let r1 = records[idx];
        let alpha = (t - r0.time) / (r1.time - r0.time);
        Ok(r0.value + alpha * (r1.value - r0.value))
    }
}
