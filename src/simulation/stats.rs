#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Counters of the trips made in a simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TripStats {
    /// Vehicles created at sites.
    pub generated: usize,
    /// Vehicles that reached their destination and made it back home.
    pub completed: usize,
    /// Vehicles removed because there was no route to where they were heading.
    pub abandoned: usize,
    /// Sum of the round-trip times of completed vehicles, in s.
    pub total_trip_time: f64,
}

impl TripStats {
    /// The mean round-trip time of completed vehicles, in s.
    pub fn mean_trip_time(&self) -> Option<f64> {
        (self.completed > 0).then(|| self.total_trip_time / self.completed as f64)
    }

    pub(crate) fn record_completed(&mut self, trip_time: f64) {
        self.completed += 1;
        self.total_trip_time += trip_time;
    }
}
