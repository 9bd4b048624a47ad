//! End-to-end tests for the orchestrator

#[cfg(test)]
mod tests {
    use crate::{
        ExtractorConfig, Orchestrator, ParseContext, ParseState, ProgressLog, ProgressPhase,
        RetrySettings, PARSER_VERSION,
    };
    use comply_coverage::{ArticleMapping, CoverageLevel, CoverageScorer, MappingTable};
    use async_trait::async_trait;
    use comply_domain::{ExtractionStrategy, TestResult, TokenUsage};
    use comply_llm::{
        DocumentHandle, ExtractionCall, FailureKind, LlmError, MockBackend, ModelBackend,
        ModelResponse,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    const SINGLE_PASS_BYTES: usize = 2_000_000; // 40 pages
    const TWO_PASS_BYTES: usize = 4_050_000; // 81 pages
    const PARALLEL_BYTES: usize = 7_550_000; // 151 pages

    fn fast_config() -> ExtractorConfig {
        ExtractorConfig {
            retry: RetrySettings {
                max_attempts: 3,
                base_delay_ms: 1,
                max_delay_ms: 2,
            },
            ..Default::default()
        }
    }

    fn single_article_scorer() -> CoverageScorer {
        let table = MappingTable::new(
            "test",
            vec![ArticleMapping {
                article_id: "Article 99".to_string(),
                title: "Everything".to_string(),
                description: String::new(),
                categories: ["CC1", "CC2", "CC3", "CC4", "CC5"]
                    .iter()
                    .map(|c| c.to_string())
                    .collect(),
                weight: 1.0,
            }],
        )
        .unwrap();
        CoverageScorer::new(Arc::new(table), Default::default())
    }

    fn controls(categories: &[&str], per_category: usize) -> Value {
        let items: Vec<Value> = categories
            .iter()
            .flat_map(|category| {
                (1..=per_category).map(move |n| {
                    json!({
                        "controlId": format!("{}.{}", category, n),
                        "tscCategory": category,
                        "description": format!("{} control {}", category, n),
                        "testResult": "operating_effectively",
                        "pageRef": 30 + n
                    })
                })
            })
            .collect();
        Value::Array(items)
    }

    fn metadata() -> Value {
        json!({
            "reportType": "type2",
            "auditFirm": "Example LLP",
            "opinion": "unqualified",
            "periodStart": "2024-01-01",
            "periodEnd": "2024-12-31",
            "serviceOrgName": "Acme Cloud",
            "trustServicesCriteria": ["security", "availability"]
        })
    }

    fn full_response() -> String {
        json!({
            "metadata": metadata(),
            "controls": controls(&["CC1", "CC2", "CC3", "CC4", "CC5"], 2),
            "exceptions": [],
            "subserviceOrgs": [{"name": "AWS", "serviceDescription": "Hosting", "carveOut": true}],
            "cuecs": [{"description": "Review access", "customerResponsibility": "Quarterly", "relatedControl": "CC5.1"}]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_end_to_end_single_pass() {
        let backend = MockBackend::new(full_response());
        let orchestrator =
            Orchestrator::new(backend.clone(), single_article_scorer(), fast_config()).unwrap();
        let progress = ProgressLog::new();

        let document = vec![0u8; SINGLE_PASS_BYTES];
        let result = orchestrator
            .parse(&document, &ParseContext::new("doc-1").with_job("job-1"), &progress)
            .await;

        assert!(result.success, "parse failed: {:?}", result.error);
        assert_eq!(result.document_id, "doc-1");
        assert_eq!(result.size.unwrap().pages, 40);
        assert_eq!(result.strategy, Some(ExtractionStrategy::SinglePass));
        assert_eq!(result.calls_made, 1);
        assert_eq!(result.state, ParseState::Complete);
        assert_eq!(result.extracted_controls, 10);
        assert_eq!(result.parser_version, PARSER_VERSION);

        let coverage = result.coverage.as_ref().unwrap();
        assert_eq!(coverage.articles_covered, 1);
        let article = coverage.article("Article 99").unwrap();
        assert_eq!(article.level, CoverageLevel::Full);
        assert_eq!(article.confidence, 0.95);
        assert_eq!(coverage.overall_score, 0.95);

        assert_eq!(progress.percentages(), vec![5, 20, 80, 100]);
        assert_eq!(backend.call_count(), 1);
        assert_eq!(backend.upload_count(), 1);
        assert_eq!(backend.outstanding_uploads(), 0);
    }

    #[tokio::test]
    async fn test_two_pass_flow() {
        let backend = MockBackend::new("{}");
        backend.add_response(
            "metadata",
            json!({
                "metadata": metadata(),
                "subserviceOrgs": [{"name": "AWS", "serviceDescription": "Hosting"}],
                "cuecs": []
            })
            .to_string(),
        );
        backend.add_response(
            "controls",
            json!({
                "controls": controls(&["CC6", "CC7"], 3),
                "exceptions": [{"controlId": "CC7.2", "description": "Late review"}]
            })
            .to_string(),
        );

        let orchestrator =
            Orchestrator::new(backend.clone(), CoverageScorer::dora(), fast_config()).unwrap();
        let progress = ProgressLog::new();

        let document = vec![0u8; TWO_PASS_BYTES];
        let result = orchestrator
            .parse(&document, &ParseContext::new("doc-2"), &progress)
            .await;

        assert!(result.success, "parse failed: {:?}", result.error);
        assert_eq!(result.strategy, Some(ExtractionStrategy::TwoPass));
        assert_eq!(result.calls_made, 2);
        assert_eq!(result.usage.input_tokens, 2000);
        assert_eq!(result.usage.output_tokens, 200);

        let record = result.record.as_ref().unwrap();
        assert_eq!(record.controls.len(), 6);
        assert_eq!(record.exceptions.len(), 1);
        assert_eq!(record.subservice_orgs[0].name, "AWS");

        assert_eq!(progress.percentages(), vec![5, 15, 80, 100]);
        assert_eq!(backend.calls_for("metadata"), 1);
        assert_eq!(backend.calls_for("controls"), 1);
        assert_eq!(backend.upload_count(), 1);
        assert_eq!(backend.outstanding_uploads(), 0);
    }

    #[tokio::test]
    async fn test_parallel_flow() {
        let backend = MockBackend::new("{}");
        backend.add_response("metadata", json!({"metadata": metadata()}).to_string());
        backend.add_response(
            "controls_cc1_cc5",
            json!({"controls": controls(&["CC1", "CC3", "CC5"], 1)}).to_string(),
        );
        backend.add_response(
            "controls_cc6_plus",
            json!({"controls": controls(&["CC6", "A"], 2), "exceptions": []}).to_string(),
        );

        let orchestrator =
            Orchestrator::new(backend.clone(), CoverageScorer::dora(), fast_config()).unwrap();
        let progress = ProgressLog::new();

        let document = vec![0u8; PARALLEL_BYTES];
        let result = orchestrator
            .parse(&document, &ParseContext::new("doc-3"), &progress)
            .await;

        assert!(result.success, "parse failed: {:?}", result.error);
        assert_eq!(result.strategy, Some(ExtractionStrategy::Parallel));
        assert_eq!(result.calls_made, 3);
        assert_eq!(result.extracted_controls, 3 + 4);

        let record = result.record.as_ref().unwrap();
        assert_eq!(record.controls[0].control_id, "CC1.1");
        assert_eq!(record.controls[3].category_code, "CC6");

        assert_eq!(progress.percentages(), vec![5, 15, 80, 100]);
        assert_eq!(backend.upload_count(), 1);
        assert_eq!(backend.release_count(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_exhaustion_fails_parse() {
        let backend = MockBackend::new(full_response());
        backend.fail_times("full", 3, FailureKind::RateLimited);

        let orchestrator =
            Orchestrator::new(backend.clone(), CoverageScorer::dora(), fast_config()).unwrap();
        let progress = ProgressLog::new();

        let result = orchestrator
            .parse(b"%PDF-1.7", &ParseContext::new("doc-4"), &progress)
            .await;

        assert!(!result.success);
        assert_eq!(result.state, ParseState::Failed);
        assert_eq!(result.failed_stage, Some(ParseState::Extracting));
        assert_eq!(result.strategy, Some(ExtractionStrategy::SinglePass));
        assert!(result.record.is_none());
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .contains("rate limit exceeded after 3 attempts"));

        let events = progress.events();
        let last = events.last().unwrap();
        assert_eq!(last.phase, ProgressPhase::Failed);
        assert_eq!(last.percentage, 20);
        assert_eq!(progress.percentages(), vec![5, 20, 20]);

        assert_eq!(backend.calls_for("full"), 3);
        assert_eq!(backend.outstanding_uploads(), 0);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let backend = MockBackend::new(full_response());
        backend.fail_times("full", 2, FailureKind::Transient);

        let orchestrator =
            Orchestrator::new(backend.clone(), CoverageScorer::dora(), fast_config()).unwrap();
        let result = orchestrator
            .parse(b"%PDF-1.7", &ParseContext::new("doc-5"), &crate::NoProgress)
            .await;

        assert!(result.success);
        assert_eq!(backend.calls_for("full"), 3);
    }

    #[tokio::test]
    async fn test_upload_failure_fails_parse() {
        let backend = MockBackend::new(full_response());
        backend.fail_uploads(1, FailureKind::Terminal);

        let orchestrator =
            Orchestrator::new(backend.clone(), CoverageScorer::dora(), fast_config()).unwrap();
        let result = orchestrator
            .parse(b"%PDF-1.7", &ParseContext::new("doc-6"), &crate::NoProgress)
            .await;

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("Upload failed"));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_controls_fails_during_merge() {
        let backend = MockBackend::new(json!({"metadata": metadata()}).to_string())
            .with_usage(TokenUsage::new(100, 10, 0));
        let orchestrator =
            Orchestrator::new(backend.clone(), CoverageScorer::dora(), fast_config()).unwrap();
        let progress = ProgressLog::new();

        let result = orchestrator
            .parse(b"%PDF-1.7", &ParseContext::new("doc-7"), &progress)
            .await;

        assert!(!result.success);
        assert_eq!(result.failed_stage, Some(ParseState::Merging));
        assert!(result.error.as_deref().unwrap().contains("'controls'"));
        assert_eq!(progress.percentages(), vec![5, 20, 80, 80]);
        assert_eq!(backend.outstanding_uploads(), 0);
        assert_eq!(result.calls_made, 1);
        assert_eq!(result.usage, TokenUsage::new(100, 10, 0));
    }

    struct PanickingBackend;

    #[async_trait]
    impl ModelBackend for PanickingBackend {
        async fn upload(&self, document: &[u8]) -> Result<DocumentHandle, LlmError> {
            Ok(DocumentHandle {
                id: "doc".to_string(),
                size_bytes: document.len(),
            })
        }

        async fn release(&self, _handle: &DocumentHandle) -> Result<(), LlmError> {
            Ok(())
        }

        async fn generate(
            &self,
            _handle: &DocumentHandle,
            _call: &ExtractionCall,
        ) -> Result<ModelResponse, LlmError> {
            panic!("vendor sdk bug");
        }
    }

    #[tokio::test]
    async fn test_backend_panic_becomes_failed_result() {
        let orchestrator = Arc::new(
            Orchestrator::new(PanickingBackend, CoverageScorer::dora(), fast_config()).unwrap(),
        );
        let progress = Arc::new(ProgressLog::new());

        let task = {
            let orchestrator = Arc::clone(&orchestrator);
            let progress = Arc::clone(&progress);
            tokio::spawn(async move {
                orchestrator
                    .parse(b"%PDF-1.7", &ParseContext::new("doc-p"), progress.as_ref())
                    .await
            })
        };
        let result = task.await.unwrap();

        assert!(!result.success);
        assert_eq!(result.failed_stage, Some(ParseState::Extracting));
        assert!(result.error.as_deref().unwrap().contains("vendor sdk bug"));
        assert_eq!(result.calls_made, 0);
        assert_eq!(
            progress.events().last().unwrap().phase,
            ProgressPhase::Failed
        );
    }

    #[tokio::test]
    async fn test_sink_panic_becomes_failed_result() {
        let backend = MockBackend::new(json!({"metadata": metadata()}).to_string());
        let orchestrator =
            Orchestrator::new(backend.clone(), CoverageScorer::dora(), fast_config()).unwrap();
        let sink = |event: &crate::ProgressEvent| {
            if event.percentage >= 20 {
                panic!("sink closed");
            }
        };

        let result = orchestrator
            .parse(b"%PDF-1.7", &ParseContext::new("doc-s"), &sink)
            .await;

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("sink closed"));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_fails_parse() {
        let backend = MockBackend::new("Sorry, I cannot read this document.");
        let orchestrator =
            Orchestrator::new(backend.clone(), CoverageScorer::dora(), fast_config()).unwrap();

        let result = orchestrator
            .parse(b"%PDF-1.7", &ParseContext::new("doc-8"), &crate::NoProgress)
            .await;

        assert!(!result.success);
        assert_eq!(result.failed_stage, Some(ParseState::Extracting));
        assert_eq!(backend.calls_for("full"), 1);
    }

    #[tokio::test]
    async fn test_timeout_releases_upload() {
        let backend = MockBackend::new(full_response());
        backend.set_delay("full", Duration::from_secs(5));

        let config = ExtractorConfig {
            extraction_timeout_secs: 1,
            ..fast_config()
        };
        let orchestrator = Orchestrator::new(backend.clone(), CoverageScorer::dora(), config).unwrap();

        let result = orchestrator
            .parse(b"%PDF-1.7", &ParseContext::new("doc-9"), &crate::NoProgress)
            .await;

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("timed out after 1s"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(backend.outstanding_uploads(), 0);
    }

    #[tokio::test]
    async fn test_persisted_round_trip() {
        let backend = MockBackend::new(full_response());
        let orchestrator =
            Orchestrator::new(backend, CoverageScorer::dora(), fast_config()).unwrap();

        let result = orchestrator
            .parse(b"%PDF-1.7", &ParseContext::new("doc-10"), &crate::NoProgress)
            .await;
        let persisted = result.to_persisted().unwrap();

        assert_eq!(persisted.raw_extraction.extraction_strategy, ExtractionStrategy::SinglePass);
        assert_eq!(persisted.raw_extraction.api_calls_count, 1);
        assert_eq!(persisted.raw_extraction.parser_version, PARSER_VERSION);
        assert!((persisted.confidence_scores.controls - 0.9).abs() < 1e-9);

        let json = serde_json::to_string(&persisted).unwrap();
        let reloaded: comply_domain::PersistedRecord = serde_json::from_str(&json).unwrap();
        let record = reloaded.to_record();
        let original = result.record.as_ref().unwrap();

        assert_eq!(record.controls.len(), original.controls.len());
        assert_eq!(record.exceptions.len(), original.exceptions.len());
        assert_eq!(record.metadata, original.metadata);
        assert_eq!(record.count_by_result(TestResult::Effective), 10);
        assert!(record.related_control(&record.cuecs[0]).is_some());
    }

    #[tokio::test]
    async fn test_failed_parse_has_no_persisted_shape() {
        let backend = MockBackend::new("{}");
        let orchestrator =
            Orchestrator::new(backend, CoverageScorer::dora(), fast_config()).unwrap();

        let result = orchestrator
            .parse(b"%PDF-1.7", &ParseContext::new("doc-11"), &crate::NoProgress)
            .await;

        assert!(!result.success);
        assert!(result.to_persisted().is_none());
        assert_eq!(result.usage.total(), 0);
    }
}
