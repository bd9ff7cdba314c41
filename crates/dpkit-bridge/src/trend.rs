use std::sync::{Mutex, PoisonError};

use dpkit::characteristic::PositionState;

/// The trend of consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    /// The value has not changed.
    Stationary,
    /// The value has grown.
    Increasing,
    /// The value has shrunk.
    Decreasing,
}

impl From<Trend> for PositionState {
    fn from(trend: Trend) -> Self {
        match trend {
            Trend::Stationary => Self::Stopped,
            Trend::Increasing => Self::Increasing,
            Trend::Decreasing => Self::Decreasing,
        }
    }
}

/// Infers a [`Trend`] from consecutive samples.
///
/// Before the first sample the tracker is in an unknown state, so the first
/// observed sample is always [`Trend::Stationary`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrendTracker {
    previous: Option<f64>,
}

impl TrendTracker {
    /// Creates a [`TrendTracker`] in the unknown state.
    #[must_use]
    pub const fn new() -> Self {
        Self { previous: None }
    }

    /// Observes a sample and returns the trend with respect to the previous
    /// one.
    ///
    /// The sample always replaces the previous one.
    pub fn observe(&mut self, value: f64) -> Trend {
        let trend = match self.previous {
            Some(previous) if value > previous => Trend::Increasing,
            Some(previous) if value < previous => Trend::Decreasing,
            _ => Trend::Stationary,
        };
        self.previous = Some(value);
        trend
    }

    /// Returns the tracker to the unknown state.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

/// A [`TrendTracker`] shared among pull reads and live updates.
///
/// Every observation is performed under a lock, so concurrent samples never
/// skip the store step.
#[derive(Debug, Default)]
pub struct TrendCell(Mutex<TrendTracker>);

impl TrendCell {
    /// Creates a [`TrendCell`] in the unknown state.
    #[must_use]
    pub const fn new() -> Self {
        Self(Mutex::new(TrendTracker::new()))
    }

    /// Observes a sample.
    pub fn observe(&self, value: f64) -> Trend {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .observe(value)
    }

    /// Returns the cell to the unknown state.
    pub fn reset(&self) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }
}
