use super::MetricsCollector;

pub struct NodeMonitor {
    collector: MetricsCollector,
}

impl NodeMonitor {
    pub fn new(collector: MetricsCollector) -> Self {
        Self { collector }
    }

    pub fn generate_report(&self) -> String {
        let snapshot = self.collector.snapshot();

        if snapshot.is_empty() {
            return "No nodes registered".to_string();
        }

        let mut report = String::from("=== Node Task Metrics ===\n");

        for (node_id, metrics) in snapshot.iter() {
            report.push_str(&format!(
                "\n[{}]\n  Tasks: {} spawned, {} skipped\n  Results: {} ok, {}\n  Avg Latency: {}μs\n",
                node_id,
                metrics.tasks_spawned,
                metrics.invocations_skipped,
                metrics.tasks_succeeded,
                if metrics.tasks_failed > 0 {
                    format!("{} failed", metrics.tasks_failed)
                } else {
                    "0 failed".to_string()
                },
                metrics.avg_latency_us
            ));
        }

        report
    }

    pub fn collector(&self) -> &MetricsCollector {
        &self.collector
    }
}
