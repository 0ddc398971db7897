//! Simulation clock value object
//!
//! Time in this crate is seconds since session start on the embedder's
//! monotonic simulation clock. Nothing here blocks or sleeps; callers pass
//! `now` into every operation that needs it.

use std::ops::Add;

use serde::{Deserialize, Serialize};

/// A point on the simulation clock, in seconds since session start.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct SimTime(f64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0.0);

    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }
}

impl Add<f64> for SimTime {
    type Output = SimTime;

    fn add(self, secs: f64) -> SimTime {
        SimTime(self.0 + secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_and_offset() {
        let base = SimTime::from_secs(10.0);
        assert!(base + 5.0 > base);
        assert_eq!((base + 2.5).as_secs(), 12.5);
        assert!(SimTime::ZERO < base);
    }
}
