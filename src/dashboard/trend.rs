use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::Serialize;

pub const TREND_CAPACITY: usize = 24;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSample {
    /// Local wall-clock time the sample was taken, `HH:MM:SS`.
    pub label: String,
    pub value: f64,
}

/// Fixed-capacity ring of samples; the oldest is evicted first.
#[derive(Debug, Clone)]
pub struct TrendBuffer {
    samples: VecDeque<TrendSample>,
    capacity: usize,
}

impl Default for TrendBuffer {
    fn default() -> Self {
        Self::with_capacity(TREND_CAPACITY)
    }
}

impl TrendBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, label: String, value: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(TrendSample { label, value });
    }

    pub fn push_at(&mut self, at: DateTime<Local>, value: f64) {
        self.push(label(at), value);
    }

    pub fn samples(&self) -> impl Iterator<Item = &TrendSample> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&TrendSample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

pub fn label(at: DateTime<Local>) -> String {
    at.format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn oldest_sample_is_evicted_at_capacity() {
        let mut buf = TrendBuffer::new();
        for i in 0..30 {
            buf.push(format!("t{i}"), i as f64);
        }
        assert_eq!(buf.len(), TREND_CAPACITY);
        assert_eq!(buf.samples().next().map(|s| s.value), Some(6.0));
        assert_eq!(buf.latest().map(|s| s.value), Some(29.0));
    }

    #[test]
    fn labels_are_wall_clock_seconds() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 3).unwrap();
        assert_eq!(label(at), "07:05:03");
    }

    #[test]
    fn zero_capacity_holds_nothing() {
        let mut buf = TrendBuffer::with_capacity(0);
        buf.push("x".into(), 1.0);
        assert!(buf.is_empty());
    }
}
