//! Moving-average smoothing over a bounded window of recent samples.
//!
//! The pose estimator jitters by a few degrees from frame to frame. Angles
//! are averaged over the last few samples before any threshold comparison.

use std::collections::VecDeque;

/// Default number of samples in a smoothing window.
pub const DEFAULT_WINDOW_SIZE: usize = 5;

/// FIFO window of the most recent raw samples for one signal.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl SmoothingWindow {
    /// Create a window holding at most `capacity` samples (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest when full, and return the mean.
    pub fn smooth(&mut self, value: f64) -> f64 {
        self.values.push_back(value);
        if self.values.len() > self.capacity {
            self.values.pop_front();
        }
        self.mean().unwrap_or(value)
    }

    /// Mean of the current window contents.
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl Default for SmoothingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}
