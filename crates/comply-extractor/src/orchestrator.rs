//! Extraction orchestrator
//!
//! Drives one parse through its states:
//!
//! ```text
//! INIT → ESTIMATING → STRATEGY_SELECTED → EXTRACTING → MERGING → SCORING → COMPLETE
//!                                 (any state) → FAILED
//! ```

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::estimate::{estimate, SizeEstimate};
use crate::merge::merge_results;
use crate::parser::ResultParser;
use crate::progress::{ProgressPhase, ProgressSink, ProgressTracker};
use crate::prompt::plan;
use crate::selector::select_strategy;
use crate::types::{ParseContext, ParseResult, ParseState};
use comply_coverage::{CoverageResult, CoverageScorer};
use comply_domain::{ConfidenceScores, ExtractionRecord, ExtractionStrategy, TokenUsage};
use comply_llm::{BatchOutput, ExtractionCall, LlmError, ModelBackend, ModelClient};
use futures::FutureExt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, SystemTime};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Parses SOC 2 reports and scores their coverage
pub struct Orchestrator<B: ModelBackend + 'static> {
    client: ModelClient<B>,
    scorer: CoverageScorer,
    parser: ResultParser,
    config: ExtractorConfig,
}

/// What is known about a parse so far
#[derive(Debug, Clone, Copy)]
struct Trace {
    state: ParseState,
    size: Option<SizeEstimate>,
    strategy: Option<ExtractionStrategy>,
    calls_made: usize,
    usage: TokenUsage,
}

struct Extraction {
    record: ExtractionRecord,
    usage: TokenUsage,
    calls_made: usize,
    coverage: CoverageResult,
}

impl<B: ModelBackend + 'static> Orchestrator<B> {
    /// Create an orchestrator whose client retries per `config.retry`
    pub fn new(
        backend: B,
        scorer: CoverageScorer,
        config: ExtractorConfig,
    ) -> Result<Self, ExtractorError> {
        let client = ModelClient::new(backend, config.retry.policy());
        Self::with_client(client, scorer, config)
    }

    /// Create an orchestrator around an existing client
    pub fn with_client(
        client: ModelClient<B>,
        scorer: CoverageScorer,
        config: ExtractorConfig,
    ) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;

        Ok(Self {
            client,
            scorer,
            parser: ResultParser::new(config.default_control_confidence),
            config,
        })
    }

    /// The configuration in use
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// The coverage scorer in use
    pub fn scorer(&self) -> &CoverageScorer {
        &self.scorer
    }

    /// The model client in use
    pub fn client(&self) -> &ModelClient<B> {
        &self.client
    }

    /// Parse a document
    ///
    /// Never returns an error: failures produce a `ParseResult` with
    /// `success == false`, after a final `failed` progress event.
    pub async fn parse(
        &self,
        document: &[u8],
        context: &ParseContext,
        sink: &dyn ProgressSink,
    ) -> ParseResult {
        let start_time = SystemTime::now();
        let mut tracker = ProgressTracker::new(sink);
        let mut trace = Trace {
            state: ParseState::Init,
            size: None,
            strategy: None,
            calls_made: 0,
            usage: TokenUsage::default(),
        };

        info!(
            "Parsing document {} ({} bytes, job {})",
            context.document_id,
            document.len(),
            context.job_id.as_deref().unwrap_or("-")
        );

        let outcome = AssertUnwindSafe(self.run(document, &mut trace, &mut tracker))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(ExtractorError::Aborted(panic_message(payload))));

        let elapsed_ms = start_time
            .elapsed()
            .unwrap_or(Duration::from_secs(0))
            .as_millis() as u64;

        match outcome {
            Ok(extraction) => {
                notify(|| tracker.emit(ProgressPhase::Complete, 100, "Extraction complete"));
                info!(
                    "Parsed document {}: {} controls, {} of {} articles covered, score {:.3} in {}ms",
                    context.document_id,
                    extraction.record.controls.len(),
                    extraction.coverage.articles_covered,
                    extraction.coverage.articles_total,
                    extraction.coverage.overall_score,
                    elapsed_ms
                );

                ParseResult {
                    success: true,
                    document_id: context.document_id.clone(),
                    strategy: trace.strategy,
                    calls_made: extraction.calls_made,
                    usage: extraction.usage,
                    error: None,
                    elapsed_ms,
                    size: trace.size,
                    state: ParseState::Complete,
                    failed_stage: None,
                    parser_version: self.config.parser_version.clone(),
                    extracted_controls: extraction.record.controls.len(),
                    confidence_scores: Some(ConfidenceScores::for_record(&extraction.record)),
                    coverage: Some(extraction.coverage),
                    record: Some(extraction.record),
                }
            }
            Err(e) => {
                let message = e.to_string();
                error!(
                    "Parse of document {} failed while {}: {}",
                    context.document_id,
                    trace.state.as_str(),
                    message
                );
                notify(|| tracker.fail(message.clone()));

                ParseResult {
                    success: false,
                    document_id: context.document_id.clone(),
                    record: None,
                    strategy: trace.strategy,
                    calls_made: trace.calls_made,
                    usage: trace.usage,
                    coverage: None,
                    error: Some(message),
                    elapsed_ms,
                    size: trace.size,
                    state: ParseState::Failed,
                    failed_stage: Some(trace.state),
                    parser_version: self.config.parser_version.clone(),
                    extracted_controls: 0,
                    confidence_scores: None,
                }
            }
        }
    }

    async fn run(
        &self,
        document: &[u8],
        trace: &mut Trace,
        tracker: &mut ProgressTracker<'_>,
    ) -> Result<Extraction, ExtractorError> {
        trace.state = ParseState::Estimating;
        let size = estimate(document, &self.config);
        trace.size = Some(size);
        tracker.emit(
            ProgressPhase::Analyzing,
            5,
            format!("Analyzing document ({} pages)", size.pages),
        );

        trace.state = ParseState::StrategySelected;
        let strategy = select_strategy(size.pages, &self.config);
        trace.strategy = Some(strategy);
        info!(
            "Selected {} for ~{} pages (~{} tokens)",
            strategy, size.pages, size.tokens
        );

        trace.state = ParseState::Extracting;
        let (percentage, message) = match strategy {
            ExtractionStrategy::SinglePass => (20, "Extracting all data in a single pass"),
            ExtractionStrategy::TwoPass => (15, "Extracting metadata, then controls"),
            ExtractionStrategy::Parallel => (15, "Running parallel extraction"),
        };
        tracker.emit(ProgressPhase::Extracting, percentage, message);

        let calls = plan(strategy);
        let batch = timeout(
            self.config.extraction_timeout(),
            self.invoke(strategy, document, &calls),
        )
        .await
        .map_err(|_| ExtractorError::Timeout(self.config.extraction_timeout_secs))??;
        trace.calls_made = calls.len();
        trace.usage = batch.usage;

        debug!(
            "{} calls used {} tokens",
            calls.len(),
            batch.usage.total()
        );

        trace.state = ParseState::Merging;
        tracker.emit(ProgressPhase::Processing, 80, "Merging results");
        let record = merge_results(strategy, &batch.values, &self.parser)?;

        trace.state = ParseState::Scoring;
        let coverage = self.scorer.score(&record.controls);

        trace.state = ParseState::Complete;
        Ok(Extraction {
            record,
            usage: batch.usage,
            calls_made: calls.len(),
            coverage,
        })
    }

    async fn invoke(
        &self,
        strategy: ExtractionStrategy,
        document: &[u8],
        calls: &[ExtractionCall],
    ) -> Result<BatchOutput, LlmError> {
        match strategy {
            ExtractionStrategy::SinglePass | ExtractionStrategy::TwoPass => {
                self.client.extract_batch_sequential(document, calls).await
            }
            ExtractionStrategy::Parallel => self.client.extract_batch_parallel(document, calls).await,
        }
    }
}

/// Deliver a final progress event; a panicking sink must not undo the result
fn notify(f: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        warn!("Progress sink panicked on the final event");
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {}", message)
    } else {
        "panic".to_string()
    }
}
