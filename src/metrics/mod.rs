//! Per-client request metrics.
//!
//! The client counts requests and errors and tracks call durations per
//! operation. There is no external metrics backend; consumers read a
//! snapshot and export it however they like.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Aggregated duration statistics for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationStats {
    /// Number of recorded calls.
    pub count: u64,
    /// Sum of durations.
    pub total: Duration,
    /// Fastest call.
    pub min: Duration,
    /// Slowest call.
    pub max: Duration,
}

impl DurationStats {
    fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total += duration;
        self.min = self.min.min(duration);
        self.max = self.max.max(duration);
    }

    fn new(duration: Duration) -> Self {
        Self {
            count: 1,
            total: duration,
            min: duration,
            max: duration,
        }
    }
}

/// Point-in-time metrics view.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Calls started, per operation.
    pub requests: HashMap<String, u64>,
    /// Calls failed, per operation.
    pub errors: HashMap<String, u64>,
    /// Call durations, per operation.
    pub durations: HashMap<String, DurationStats>,
}

/// Counter and duration registry owned by one client.
#[derive(Debug, Default)]
pub struct ClientMetrics {
    requests: Mutex<HashMap<String, u64>>,
    errors: Mutex<HashMap<String, u64>>,
    durations: Mutex<HashMap<String, DurationStats>>,
}

impl ClientMetrics {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one started request.
    pub fn record_request(&self, operation: &str) {
        *self.requests.lock().entry(operation.to_string()).or_insert(0) += 1;
    }

    /// Count one failed call.
    pub fn record_error(&self, operation: &str) {
        *self.errors.lock().entry(operation.to_string()).or_insert(0) += 1;
    }

    /// Record one call duration.
    pub fn record_duration(&self, operation: &str, duration: Duration) {
        let mut durations = self.durations.lock();
        match durations.get_mut(operation) {
            Some(stats) => stats.record(duration),
            None => {
                durations.insert(operation.to_string(), DurationStats::new(duration));
            }
        }
    }

    /// Take a point-in-time snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.lock().clone(),
            errors: self.errors.lock().clone(),
            durations: self.durations.lock().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = ClientMetrics::new();
        metrics.record_request("PutItem");
        metrics.record_request("PutItem");
        metrics.record_request("Query");
        metrics.record_error("PutItem");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests.get("PutItem"), Some(&2));
        assert_eq!(snapshot.requests.get("Query"), Some(&1));
        assert_eq!(snapshot.errors.get("PutItem"), Some(&1));
        assert_eq!(snapshot.errors.get("Query"), None);
    }

    #[test]
    fn test_durations() {
        let metrics = ClientMetrics::new();
        metrics.record_duration("Get", Duration::from_millis(10));
        metrics.record_duration("Get", Duration::from_millis(30));

        let snapshot = metrics.snapshot();
        let stats = snapshot.durations.get("Get").unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total, Duration::from_millis(40));
        assert_eq!(stats.min, Duration::from_millis(10));
        assert_eq!(stats.max, Duration::from_millis(30));
    }
}
