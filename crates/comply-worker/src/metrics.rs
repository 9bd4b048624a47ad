//! Metrics collection for job execution

use comply_domain::{ExtractionStrategy, TokenUsage};
use std::collections::HashMap;

/// Metrics collected while running jobs
#[derive(Debug, Clone, Default)]
pub struct WorkerMetrics {
    /// Jobs that stored a new record
    pub jobs_completed: usize,

    /// Jobs that failed
    pub jobs_failed: usize,

    /// Jobs short-circuited because the document was already parsed
    pub jobs_skipped: usize,

    /// Model calls made, including those of failed parses
    pub model_calls: usize,

    /// Tokens used, including those of failed parses
    pub token_usage: TokenUsage,

    /// Completed jobs per strategy
    pub by_strategy: HashMap<ExtractionStrategy, usize>,

    /// Vendor assessment rows written
    pub assessments_written: usize,

    /// Total runtime in milliseconds
    pub total_runtime_ms: u64,
}

impl WorkerMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record model usage of one parse
    pub fn record_usage(&mut self, calls: usize, usage: TokenUsage) {
        self.model_calls += calls;
        self.token_usage += usage;
    }

    /// Record a completed job
    pub fn record_completion(&mut self, strategy: ExtractionStrategy, elapsed_ms: u64) {
        self.jobs_completed += 1;
        *self.by_strategy.entry(strategy).or_insert(0) += 1;
        self.total_runtime_ms += elapsed_ms;
    }

    /// Record a failed job
    pub fn record_failure(&mut self, elapsed_ms: u64) {
        self.jobs_failed += 1;
        self.total_runtime_ms += elapsed_ms;
    }

    /// Record a skipped job
    pub fn record_skip(&mut self) {
        self.jobs_skipped += 1;
    }

    /// Record vendor assessment rows written
    pub fn record_assessments(&mut self, count: usize) {
        self.assessments_written += count;
    }

    /// Jobs seen in any outcome
    pub fn total_jobs(&self) -> usize {
        self.jobs_completed + self.jobs_failed + self.jobs_skipped
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Worker Metrics Summary".to_string(),
            "======================".to_string(),
            format!(
                "Jobs: {} completed, {} failed, {} skipped",
                self.jobs_completed, self.jobs_failed, self.jobs_skipped
            ),
            format!("Model calls: {}", self.model_calls),
            format!(
                "Tokens: {} input, {} output, {} cached",
                self.token_usage.input_tokens,
                self.token_usage.output_tokens,
                self.token_usage.cached_tokens
            ),
            format!("Assessments written: {}", self.assessments_written),
            format!("Total runtime: {}ms", self.total_runtime_ms),
        ];

        if !self.by_strategy.is_empty() {
            lines.push(String::new());
            lines.push("Completed by strategy:".to_string());

            let mut strategies: Vec<_> = self.by_strategy.iter().collect();
            strategies.sort_by_key(|(strategy, _)| strategy.expected_calls());
            for (strategy, count) in strategies {
                lines.push(format!("  {}: {}", strategy, count));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = WorkerMetrics::new();
        assert_eq!(metrics.total_jobs(), 0);
        assert_eq!(metrics.model_calls, 0);
        assert!(metrics.by_strategy.is_empty());
    }

    #[test]
    fn test_record_outcomes() {
        let mut metrics = WorkerMetrics::new();
        metrics.record_completion(ExtractionStrategy::SinglePass, 100);
        metrics.record_completion(ExtractionStrategy::Parallel, 300);
        metrics.record_completion(ExtractionStrategy::SinglePass, 50);
        metrics.record_failure(20);
        metrics.record_skip();

        assert_eq!(metrics.jobs_completed, 3);
        assert_eq!(metrics.total_jobs(), 5);
        assert_eq!(metrics.by_strategy[&ExtractionStrategy::SinglePass], 2);
        assert_eq!(metrics.by_strategy[&ExtractionStrategy::Parallel], 1);
        assert_eq!(metrics.total_runtime_ms, 470);
    }

    #[test]
    fn test_record_usage_sums_tokens() {
        let mut metrics = WorkerMetrics::new();
        metrics.record_usage(1, TokenUsage::new(1000, 100, 0));
        metrics.record_usage(3, TokenUsage::new(3000, 300, 50));

        assert_eq!(metrics.model_calls, 4);
        assert_eq!(metrics.token_usage, TokenUsage::new(4000, 400, 50));
    }

    #[test]
    fn test_reset() {
        let mut metrics = WorkerMetrics::new();
        metrics.record_completion(ExtractionStrategy::TwoPass, 10);
        metrics.record_assessments(4);
        metrics.reset();

        assert_eq!(metrics.total_jobs(), 0);
        assert_eq!(metrics.assessments_written, 0);
        assert!(metrics.by_strategy.is_empty());
    }

    #[test]
    fn test_summary() {
        let mut metrics = WorkerMetrics::new();
        metrics.record_completion(ExtractionStrategy::TwoPass, 120);
        metrics.record_usage(2, TokenUsage::new(2000, 200, 0));
        metrics.record_skip();

        let summary = metrics.summary();
        assert!(summary.contains("Jobs: 1 completed, 0 failed, 1 skipped"));
        assert!(summary.contains("Model calls: 2"));
        assert!(summary.contains("Tokens: 2000 input, 200 output, 0 cached"));
        assert!(summary.contains("two_pass: 1"));
    }
}
