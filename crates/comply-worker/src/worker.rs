//! Job runner for the inbound extraction trigger

use crate::assessments::{
    assessment_rows, AssessmentContext, ASSESSMENT_CONFLICT_KEYS, ASSESSMENT_TABLE,
};
use crate::evidence::{control_evidence, truncate_chars};
use crate::{ExtractionTrigger, JobAck, JobOutcome, WorkerConfig, WorkerError, WorkerMetrics};
use chrono::Utc;
use comply_coverage::CoverageResult;
use comply_domain::{
    ComplianceStore, DocumentAnalysis, DocumentInfo, JobStats, JobStatus, ProgressUpdate,
};
use comply_extractor::{Orchestrator, ParseContext, ParseResult, ProgressEvent};
use comply_llm::ModelBackend;
use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

/// Runs extraction jobs against a store and an orchestrator
///
/// Cloning is cheap; clones share the store, orchestrator and metrics.
///
/// # Examples
///
/// ```
/// use comply_coverage::CoverageScorer;
/// use comply_extractor::{ExtractorConfig, Orchestrator};
/// use comply_llm::MockBackend;
/// use comply_store::SqliteStore;
/// use comply_worker::{ExtractionTrigger, JobOutcome, JobRunner, WorkerConfig};
///
/// # tokio_test::block_on(async {
/// let orchestrator = Orchestrator::new(
///     MockBackend::new("{}"),
///     CoverageScorer::dora(),
///     ExtractorConfig::default(),
/// )
/// .unwrap();
/// let store = SqliteStore::new(":memory:").unwrap();
/// let runner = JobRunner::new(store, orchestrator, WorkerConfig::default()).unwrap();
///
/// let outcome = runner.run(&ExtractionTrigger::new("doc-1", "job-1", "org-1")).await;
/// assert!(matches!(outcome, JobOutcome::Failed { .. }));
/// # });
/// ```
pub struct JobRunner<S, B: ModelBackend + 'static> {
    store: Arc<Mutex<S>>,
    orchestrator: Arc<Orchestrator<B>>,
    config: WorkerConfig,
    metrics: Arc<Mutex<WorkerMetrics>>,
}

impl<S, B: ModelBackend + 'static> Clone for JobRunner<S, B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            orchestrator: Arc::clone(&self.orchestrator),
            config: self.config.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn elapsed_ms(start: SystemTime) -> u64 {
    start
        .elapsed()
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

impl<S, B> JobRunner<S, B>
where
    S: ComplianceStore + Send + 'static,
    S::Error: Display,
    B: ModelBackend + 'static,
{
    /// Create a runner that owns its store and orchestrator
    pub fn new(
        store: S,
        orchestrator: Orchestrator<B>,
        config: WorkerConfig,
    ) -> Result<Self, WorkerError> {
        Self::from_shared(
            Arc::new(Mutex::new(store)),
            Arc::new(orchestrator),
            config,
        )
    }

    /// Create a runner around a shared store and orchestrator
    pub fn from_shared(
        store: Arc<Mutex<S>>,
        orchestrator: Arc<Orchestrator<B>>,
        config: WorkerConfig,
    ) -> Result<Self, WorkerError> {
        config.validate().map_err(WorkerError::Config)?;

        Ok(Self {
            store,
            orchestrator,
            config,
            metrics: Arc::new(Mutex::new(WorkerMetrics::new())),
        })
    }

    /// The shared store
    pub fn store(&self) -> &Arc<Mutex<S>> {
        &self.store
    }

    /// The configuration in use
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// A snapshot of the metrics
    pub fn metrics(&self) -> WorkerMetrics {
        lock(&self.metrics).clone()
    }

    /// Reset the metrics counters
    pub fn reset_metrics(&self) {
        lock(&self.metrics).reset();
    }

    /// Accept a job and run it on its own task
    ///
    /// Returns as soon as the task is spawned. Must be called within a tokio
    /// runtime.
    pub fn enqueue(&self, trigger: ExtractionTrigger) -> JobAck {
        let runner = self.clone();
        let job_id = trigger.job_id.clone();

        debug!("Accepted job {} for document {}", trigger.job_id, trigger.document_id);
        let handle = tokio::spawn(async move { runner.run(&trigger).await });

        JobAck::new(job_id, handle)
    }

    /// Run a job to completion
    ///
    /// Never returns an error: a failure marks the job failed in storage
    /// (best-effort) and is reported as [`JobOutcome::Failed`].
    pub async fn run(&self, trigger: &ExtractionTrigger) -> JobOutcome {
        let start = SystemTime::now();
        info!(
            "Starting job {} for document {}",
            trigger.job_id, trigger.document_id
        );

        match self.process(trigger, start).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = truncate_chars(&e.to_string(), self.config.max_error_message_len);
                let elapsed_ms = elapsed_ms(start);
                error!("Job {} failed: {}", trigger.job_id, message);

                if let Err(store_error) =
                    self.with_store(|store| store.fail_job(&trigger.job_id, &message))
                {
                    error!(
                        "Could not mark job {} failed: {}",
                        trigger.job_id, store_error
                    );
                }

                lock(&self.metrics).record_failure(elapsed_ms);
                JobOutcome::Failed {
                    error: message,
                    elapsed_ms,
                }
            }
        }
    }

    async fn process(
        &self,
        trigger: &ExtractionTrigger,
        start: SystemTime,
    ) -> Result<JobOutcome, WorkerError> {
        let job_id = trigger.job_id.as_str();
        let document_id = trigger.document_id.as_str();

        self.progress(
            job_id,
            ProgressUpdate::new(JobStatus::Analyzing, 5, "starting", "Initializing parser"),
        )?;

        let document = self
            .with_store(|store| store.get_document(document_id))?
            .ok_or_else(|| WorkerError::DocumentNotFound(document_id.to_string()))?;

        if let Some(existing) = self.with_store(|store| store.check_existing(document_id))? {
            info!(
                "Document {} already parsed as {}, skipping extraction",
                document_id, existing.id
            );
            self.with_store(|store| store.complete_job(job_id, &existing.id, &JobStats::default()))?;
            lock(&self.metrics).record_skip();
            return Ok(JobOutcome::AlreadyParsed {
                record_id: existing.id,
            });
        }

        self.progress(
            job_id,
            ProgressUpdate::new(JobStatus::Analyzing, 10, "downloading", "Downloading document"),
        )?;
        let bytes = self.with_store(|store| store.download(&document.storage_path))?;

        let result = self.parse(trigger, &bytes).await;
        lock(&self.metrics).record_usage(result.calls_made, result.usage);

        if !result.success {
            return Err(WorkerError::Extraction(
                result.error.unwrap_or_else(|| "Parsing failed".to_string()),
            ));
        }

        let (record, strategy, persisted) =
            match (&result.record, result.strategy, result.to_persisted()) {
                (Some(record), Some(strategy), Some(persisted)) => (record, strategy, persisted),
                _ => {
                    return Err(WorkerError::Extraction(
                        "Parse succeeded without a record".to_string(),
                    ))
                }
            };

        self.progress(
            job_id,
            ProgressUpdate::new(JobStatus::Mapping, 85, "storing", "Storing parsed data")
                .with_stats(result.extracted_controls, result.calls_made, strategy),
        )?;

        let record_id = self.with_store(|store| store.insert_record(document_id, &persisted))?;

        let analysis = DocumentAnalysis {
            parsed_id: record_id.clone(),
            parser_version: result.parser_version.clone(),
            processing_time_ms: result.elapsed_ms,
        };
        self.with_store(|store| store.record_document_analysis(document_id, &analysis))?;

        if self.config.record_evidence && !record.controls.is_empty() {
            let locations = control_evidence(record, self.config.evidence_text_limit);
            self.with_store(|store| {
                store.insert_evidence_locations(&trigger.organization_id, document_id, &locations)
            })?;
            debug!("Recorded {} evidence locations", locations.len());
        }

        let assessments_written = match (&document.vendor_id, &result.coverage) {
            (Some(vendor_id), Some(coverage)) if self.config.create_assessments => {
                self.write_assessments(trigger, &document, vendor_id, coverage)?
            }
            _ => 0,
        };

        let stats = JobStats {
            extracted_controls: result.extracted_controls,
            token_usage: result.usage,
        };
        self.with_store(|store| store.complete_job(job_id, &record_id, &stats))?;

        let elapsed_ms = elapsed_ms(start);
        lock(&self.metrics).record_completion(strategy, elapsed_ms);
        info!(
            "Job {} complete: record {}, {} controls via {} in {}ms",
            job_id, record_id, result.extracted_controls, strategy, elapsed_ms
        );

        Ok(JobOutcome::Completed {
            record_id,
            extracted_controls: result.extracted_controls,
            strategy,
            calls_made: result.calls_made,
            overall_score: result.coverage.as_ref().map(|c| c.overall_score),
            assessments_written,
            elapsed_ms,
        })
    }

    async fn parse(&self, trigger: &ExtractionTrigger, bytes: &[u8]) -> ParseResult {
        let store = Arc::clone(&self.store);
        let job_id = trigger.job_id.clone();

        let sink = move |event: &ProgressEvent| {
            let update = ProgressUpdate::new(
                event.phase.job_status(),
                event.percentage,
                event.phase.as_str(),
                event.message.as_str(),
            );
            if let Err(e) = lock(&store).update_progress(&job_id, &update) {
                warn!("Progress update for job {} failed: {}", job_id, e);
            }
        };

        let context = ParseContext::new(trigger.document_id.as_str()).with_job(trigger.job_id.as_str());
        self.orchestrator.parse(bytes, &context, &sink).await
    }

    fn write_assessments(
        &self,
        trigger: &ExtractionTrigger,
        document: &DocumentInfo,
        vendor_id: &str,
        coverage: &CoverageResult,
    ) -> Result<usize, WorkerError> {
        let framework_code = self.config.framework_code.as_str();

        let framework_id = match self.with_store(|store| store.framework_id(framework_code)) {
            Ok(Some(id)) => id,
            Ok(None) => {
                debug!("Framework {} not registered, skipping assessments", framework_code);
                return Ok(0);
            }
            Err(e) => {
                warn!("Framework lookup for {} failed: {}", framework_code, e);
                return Ok(0);
            }
        };

        let controls = self.with_store(|store| store.framework_controls(&framework_id))?;
        let context = AssessmentContext {
            vendor_id,
            organization_id: &trigger.organization_id,
            document_id: &document.id,
            valid_from: Utc::now().date_naive(),
        };
        let rows = assessment_rows(coverage, &controls, &context);
        if rows.is_empty() {
            return Ok(0);
        }

        let written = self.with_store(|store| {
            store.upsert_rows(ASSESSMENT_TABLE, &rows, &ASSESSMENT_CONFLICT_KEYS)
        })?;

        lock(&self.metrics).record_assessments(written);
        info!(
            "Wrote {} {} assessments for vendor {}",
            written, framework_code, vendor_id
        );
        Ok(written)
    }

    fn progress(&self, job_id: &str, update: ProgressUpdate) -> Result<(), WorkerError> {
        self.with_store(|store| store.update_progress(job_id, &update))
    }

    fn with_store<T>(
        &self,
        f: impl FnOnce(&mut S) -> Result<T, S::Error>,
    ) -> Result<T, WorkerError> {
        let mut store = lock(&self.store);
        f(&mut store).map_err(|e| WorkerError::Store(e.to_string()))
    }
}
