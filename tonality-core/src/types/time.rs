//! Rational timing types for exact musical timing
//!
//! Event starts, durations and analysis-window boundaries are measured in
//! beats as exact rationals, so windowing never accumulates float drift.

use num_rational::Ratio;
use num_traits::Zero;

/// Exact time point using rationals (beats from origin)
pub type Time = Ratio<i64>;

/// A time span [start, end)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: Time,
    pub end: Time,
}

impl Span {
    pub fn new(start: Time, end: Time) -> Self {
        Self { start, end }
    }

    /// Check if a time point falls within this span [start, end)
    pub fn contains(&self, t: Time) -> bool {
        t >= self.start && t < self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Length of the overlap with `other` (zero when disjoint)
    pub fn overlap(&self, other: &Span) -> Time {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end > start {
            end - start
        } else {
            Time::zero()
        }
    }
}

/// Helper to create Time from a ratio n/d
#[inline]
pub fn time(n: i64, d: i64) -> Time {
    Ratio::new(n, d)
}

/// Create Time from an integer (whole beats)
#[inline]
pub fn beats(n: i64) -> Time {
    Ratio::from_integer(n)
}

/// Convert rational to f64 for weighting
#[inline]
pub fn to_f64(t: Time) -> f64 {
    *t.numer() as f64 / *t.denom() as f64
}
