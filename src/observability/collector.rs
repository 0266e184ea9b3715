use std::collections::BTreeMap;
use std::sync::Arc;
use super::NodeMetrics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub node_id: String,
    pub tasks_spawned: u64,
    pub invocations_skipped: u64,
    pub tasks_succeeded: u64,
    pub tasks_failed: u64,
    pub avg_latency_us: u64,
}

#[derive(Clone, Default)]
pub struct MetricsCollector {
    metrics: BTreeMap<String, Arc<NodeMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, node_id: impl Into<String>, metrics: Arc<NodeMetrics>) {
        self.metrics.insert(node_id.into(), metrics);
    }

    pub fn snapshot(&self) -> BTreeMap<String, MetricsSnapshot> {
        self.metrics
            .iter()
            .map(|(id, metrics)| {
                (
                    id.clone(),
                    MetricsSnapshot {
                        node_id: metrics.node_id().to_string(),
                        tasks_spawned: metrics.tasks_spawned(),
                        invocations_skipped: metrics.invocations_skipped(),
                        tasks_succeeded: metrics.tasks_succeeded(),
                        tasks_failed: metrics.tasks_failed(),
                        avg_latency_us: metrics.avg_latency_us(),
                    },
                )
            })
            .collect()
    }

    pub fn get_node_metrics(&self, node_id: &str) -> Option<Arc<NodeMetrics>> {
        self.metrics.get(node_id).cloned()
    }
}
