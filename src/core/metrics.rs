use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

/// Counters for one engine operation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OperationMetrics {
    /// Calls that completed successfully
    pub calls: u64,
    /// Calls that returned an error
    pub failures: u64,
    /// Average processing time (ms) over all calls
    pub avg_processing_time: f64,
    /// When the operation last ran
    pub last_call: Option<DateTime<Utc>>,
}

/// Summary metrics for the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    /// Timestamp of the summary
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: i64,
    pub total_calls: u64,
    pub total_failures: u64,
    /// Average processing time (ms) across operations that have run
    pub avg_processing_time: f64,
    pub operations: HashMap<String, OperationMetrics>,
}

/// Collects per-operation counters from the request handlers
#[derive(Debug)]
pub struct MetricsManager {
    operations: RwLock<HashMap<String, OperationMetrics>>,
    started_at: DateTime<Utc>,
}

impl MetricsManager {
    pub fn new() -> Self {
        Self {
            operations: RwLock::new(HashMap::new()),
            started_at: Utc::now(),
        }
    }

    /// Record one finished call
    pub async fn record(&self, operation: &str, elapsed: Duration, success: bool) {
        let mut operations = self.operations.write().await;
        let entry = operations.entry(operation.to_string()).or_default();

        let previous = (entry.calls + entry.failures) as f64;
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        entry.avg_processing_time = (entry.avg_processing_time * previous + elapsed_ms) / (previous + 1.0);
        if success {
            entry.calls += 1;
        } else {
            entry.failures += 1;
        }
        entry.last_call = Some(Utc::now());
    }

    pub async fn summary(&self) -> MetricsSummary {
        let operations = self.operations.read().await.clone();
        let now = Utc::now();

        let total_calls = operations.values().map(|m| m.calls).sum();
        let total_failures = operations.values().map(|m| m.failures).sum();
        let avg_processing_time = if operations.is_empty() {
            0.0
        } else {
            operations.values().map(|m| m.avg_processing_time).sum::<f64>() / operations.len() as f64
        };

        MetricsSummary {
            timestamp: now,
            uptime_seconds: (now - self.started_at).num_seconds(),
            total_calls,
            total_failures,
            avg_processing_time,
            operations,
        }
    }
}

impl Default for MetricsManager {
    fn default() -> Self {
        Self::new()
    }
}
