//! Comply Storage Layer
//!
//! Implements the `ComplianceStore` trait on SQLite.
//!
//! # Architecture
//!
//! - One table per stored concern: documents and their bytes, parsed
//!   reports, extraction jobs, evidence locations, frameworks and their
//!   controls, vendor assessments
//! - Parsed reports are kept whole as a JSON column next to a few indexed
//!   summary columns
//! - `parsed_reports.document_id` is unique, which makes "at most one
//!   record per document" a storage invariant
//!
//! # Examples
//!
//! ```
//! use comply_domain::{ComplianceStore, DocumentInfo};
//! use comply_store::SqliteStore;
//!
//! let mut store = SqliteStore::new(":memory:").unwrap();
//! store
//!     .insert_document(&DocumentInfo {
//!         id: "doc-1".to_string(),
//!         filename: "soc2.pdf".to_string(),
//!         storage_path: "org-1/soc2.pdf".to_string(),
//!         mime_type: "application/pdf".to_string(),
//!         vendor_id: None,
//!         organization_id: "org-1".to_string(),
//!     })
//!     .unwrap();
//!
//! assert!(store.get_document("doc-1").unwrap().is_some());
//! assert!(store.check_existing("doc-1").unwrap().is_none());
//! ```

#![warn(missing_docs)]

mod rows;

use chrono::Utc;
use comply_domain::{
    ComplianceStore, DocumentAnalysis, DocumentInfo, EvidenceLocation, ExistingRecord,
    ExtractionStrategy, FrameworkControl, JobStats, JobStatus, PersistedRecord, ProgressUpdate,
    RecordId, Row, TokenUsage,
};
use rows::{from_sql, identifier, to_sql};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A record already exists for the document
    #[error("Record already exists for document {0}")]
    Duplicate(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::InvalidData(e.to_string())
    }
}

/// An extraction job as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job id
    pub id: String,
    /// Document being parsed
    pub document_id: String,
    /// Owning organization
    pub organization_id: String,
    /// Current status
    pub status: JobStatus,
    /// Progress in [0, 100]
    pub percentage: u8,
    /// Last reported phase
    pub phase: Option<String>,
    /// Last reported message
    pub message: Option<String>,
    /// Controls extracted
    pub extracted_controls: Option<usize>,
    /// Model calls made
    pub api_calls_count: Option<usize>,
    /// Strategy used
    pub extraction_strategy: Option<ExtractionStrategy>,
    /// Stored record id, once complete
    pub result_id: Option<String>,
    /// Error message, once failed
    pub error: Option<String>,
    /// Token usage, once complete
    pub token_usage: TokenUsage,
}

/// SQLite-based implementation of ComplianceStore
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Share a store between tasks
/// behind a mutex.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a store at the given path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    fn now() -> String {
        Utc::now().to_rfc3339()
    }

    /// Register a document
    pub fn insert_document(&mut self, document: &DocumentInfo) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO documents (id, filename, storage_path, mime_type, vendor_id, organization_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &document.id,
                &document.filename,
                &document.storage_path,
                &document.mime_type,
                &document.vendor_id,
                &document.organization_id,
                Self::now(),
            ],
        )?;
        Ok(())
    }

    /// Store bytes at a path, replacing anything already there
    pub fn put_blob(&mut self, storage_path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO document_blobs (storage_path, bytes) VALUES (?1, ?2)
             ON CONFLICT(storage_path) DO UPDATE SET bytes = excluded.bytes",
            params![storage_path, bytes],
        )?;
        Ok(())
    }

    /// Create a pending job
    pub fn create_job(
        &mut self,
        job_id: &str,
        document_id: &str,
        organization_id: &str,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO extraction_jobs (id, document_id, organization_id, status, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                job_id,
                document_id,
                organization_id,
                JobStatus::Pending.as_str(),
                Self::now()
            ],
        )?;
        Ok(())
    }

    /// Register a framework and its control ids; returns the framework id
    pub fn insert_framework(
        &mut self,
        code: &str,
        name: &str,
        control_ids: &[&str],
    ) -> Result<String, StoreError> {
        let framework_id = RecordId::new().to_string();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO frameworks (id, code, name) VALUES (?1, ?2, ?3)",
            params![&framework_id, code, name],
        )?;
        for control_id in control_ids {
            tx.execute(
                "INSERT INTO framework_controls (id, framework_id, control_id) VALUES (?1, ?2, ?3)",
                params![RecordId::new().to_string(), &framework_id, control_id],
            )?;
        }

        tx.commit()?;
        debug!("Registered framework {} with {} controls", code, control_ids.len());
        Ok(framework_id)
    }

    /// Read a job
    pub fn job(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        let job = self
            .conn
            .query_row(
                "SELECT id, document_id, organization_id, status, percentage, phase, message,
                        extracted_controls, api_calls_count, extraction_strategy, result_id, error,
                        input_tokens, output_tokens, cached_tokens
                 FROM extraction_jobs WHERE id = ?1",
                params![job_id],
                |row| {
                    let status: String = row.get(3)?;
                    let strategy: Option<String> = row.get(9)?;
                    let extracted: Option<i64> = row.get(7)?;
                    let calls: Option<i64> = row.get(8)?;

                    Ok(JobRecord {
                        id: row.get(0)?,
                        document_id: row.get(1)?,
                        organization_id: row.get(2)?,
                        status: JobStatus::parse(&status).unwrap_or(JobStatus::Pending),
                        percentage: row.get::<_, i64>(4)?.clamp(0, 100) as u8,
                        phase: row.get(5)?,
                        message: row.get(6)?,
                        extracted_controls: extracted.map(|n| n as usize),
                        api_calls_count: calls.map(|n| n as usize),
                        extraction_strategy: strategy.as_deref().and_then(ExtractionStrategy::parse),
                        result_id: row.get(10)?,
                        error: row.get(11)?,
                        token_usage: TokenUsage::new(
                            row.get::<_, i64>(12)? as u64,
                            row.get::<_, i64>(13)? as u64,
                            row.get::<_, i64>(14)? as u64,
                        ),
                    })
                },
            )
            .optional()?;

        Ok(job)
    }

    /// Read a stored record
    pub fn record(&self, record_id: &str) -> Result<Option<PersistedRecord>, StoreError> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT record FROM parsed_reports WHERE id = ?1",
                params![record_id],
                |row| row.get(0),
            )
            .optional()?;

        json.map(|j| serde_json::from_str(&j).map_err(StoreError::from))
            .transpose()
    }

    /// Read the analysis marker of a document
    pub fn document_analysis(
        &self,
        document_id: &str,
    ) -> Result<Option<DocumentAnalysis>, StoreError> {
        let json: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT ai_analysis FROM documents WHERE id = ?1",
                params![document_id],
                |row| row.get(0),
            )
            .optional()?;

        json.flatten()
            .map(|j| serde_json::from_str(&j).map_err(StoreError::from))
            .transpose()
    }

    /// Evidence locations recorded for a document
    pub fn evidence_locations(&self, document_id: &str) -> Result<Vec<EvidenceLocation>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT evidence_type, evidence_id, page_number, section_reference, extracted_text,
                    confidence, extraction_method
             FROM evidence_locations WHERE document_id = ?1 ORDER BY id",
        )?;

        let locations = stmt
            .query_map(params![document_id], |row| {
                let page: Option<i64> = row.get(2)?;
                Ok(EvidenceLocation {
                    evidence_type: row.get(0)?,
                    evidence_id: row.get(1)?,
                    page_number: page.and_then(|p| u32::try_from(p).ok()),
                    section_reference: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    extracted_text: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    confidence: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
                    extraction_method: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(locations)
    }

    /// Every row of a table as JSON
    pub fn rows(&self, table: &str) -> Result<Vec<Row>, StoreError> {
        let sql = format!("SELECT * FROM {}", identifier(table)?);
        let mut stmt = self.conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let rows = stmt
            .query_map([], |row| {
                let mut out = Row::new();
                for (idx, name) in columns.iter().enumerate() {
                    out.insert(name.clone(), from_sql(row.get_ref(idx)?));
                }
                Ok(out)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn require_changed(changed: usize, what: &str, id: &str) -> Result<(), StoreError> {
        if changed == 0 {
            return Err(StoreError::NotFound(format!("{} {}", what, id)));
        }
        Ok(())
    }
}

impl ComplianceStore for SqliteStore {
    type Error = StoreError;

    fn get_document(&self, document_id: &str) -> Result<Option<DocumentInfo>, Self::Error> {
        let document = self
            .conn
            .query_row(
                "SELECT id, filename, storage_path, mime_type, vendor_id, organization_id
                 FROM documents WHERE id = ?1",
                params![document_id],
                |row| {
                    Ok(DocumentInfo {
                        id: row.get(0)?,
                        filename: row.get(1)?,
                        storage_path: row.get(2)?,
                        mime_type: row.get(3)?,
                        vendor_id: row.get(4)?,
                        organization_id: row.get(5)?,
                    })
                },
            )
            .optional()?;

        Ok(document)
    }

    fn download(&self, storage_path: &str) -> Result<Vec<u8>, Self::Error> {
        self.conn
            .query_row(
                "SELECT bytes FROM document_blobs WHERE storage_path = ?1",
                params![storage_path],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("blob {}", storage_path)))
    }

    fn check_existing(&self, document_id: &str) -> Result<Option<ExistingRecord>, Self::Error> {
        let existing = self
            .conn
            .query_row(
                "SELECT id, created_at FROM parsed_reports WHERE document_id = ?1",
                params![document_id],
                |row| {
                    Ok(ExistingRecord {
                        id: row.get(0)?,
                        created_at: row.get(1)?,
                    })
                },
            )
            .optional()?;

        Ok(existing)
    }

    fn insert_record(
        &mut self,
        document_id: &str,
        record: &PersistedRecord,
    ) -> Result<String, Self::Error> {
        if self.check_existing(document_id)?.is_some() {
            return Err(StoreError::Duplicate(document_id.to_string()));
        }

        let id = RecordId::new().to_string();
        let json = serde_json::to_string(record)?;

        self.conn.execute(
            "INSERT INTO parsed_reports (id, document_id, report_type, audit_firm, service_org_name, record, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &id,
                document_id,
                record.report_type.as_str(),
                &record.audit_firm,
                &record.service_org_name,
                json,
                Self::now(),
            ],
        )?;

        debug!(
            "Stored record {} for document {} ({} controls)",
            id,
            document_id,
            record.controls.len()
        );
        Ok(id)
    }

    fn record_document_analysis(
        &mut self,
        document_id: &str,
        analysis: &DocumentAnalysis,
    ) -> Result<(), Self::Error> {
        let json = serde_json::to_string(analysis)?;
        let changed = self.conn.execute(
            "UPDATE documents SET ai_analysis = ?1 WHERE id = ?2",
            params![json, document_id],
        )?;
        Self::require_changed(changed, "document", document_id)
    }

    fn update_progress(
        &mut self,
        job_id: &str,
        update: &ProgressUpdate,
    ) -> Result<(), Self::Error> {
        let changed = self.conn.execute(
            "UPDATE extraction_jobs SET
                status = ?1,
                percentage = ?2,
                phase = COALESCE(?3, phase),
                message = COALESCE(?4, message),
                expected_controls = COALESCE(?5, expected_controls),
                extracted_controls = COALESCE(?6, extracted_controls),
                api_calls_count = COALESCE(?7, api_calls_count),
                extraction_strategy = COALESCE(?8, extraction_strategy),
                updated_at = ?9
             WHERE id = ?10",
            params![
                update.status.as_str(),
                i64::from(update.percentage),
                &update.phase,
                &update.message,
                update.expected_controls.map(|n| n as i64),
                update.extracted_controls.map(|n| n as i64),
                update.api_calls_count.map(|n| n as i64),
                update.extraction_strategy.map(|s| s.as_str()),
                Self::now(),
                job_id,
            ],
        )?;
        Self::require_changed(changed, "job", job_id)
    }

    fn complete_job(
        &mut self,
        job_id: &str,
        result_id: &str,
        stats: &JobStats,
    ) -> Result<(), Self::Error> {
        let changed = self.conn.execute(
            "UPDATE extraction_jobs SET
                status = ?1, percentage = 100, phase = ?1, result_id = ?2,
                extracted_controls = ?3, input_tokens = ?4, output_tokens = ?5, cached_tokens = ?6,
                error = NULL, updated_at = ?7
             WHERE id = ?8",
            params![
                JobStatus::Complete.as_str(),
                result_id,
                stats.extracted_controls as i64,
                stats.token_usage.input_tokens as i64,
                stats.token_usage.output_tokens as i64,
                stats.token_usage.cached_tokens as i64,
                Self::now(),
                job_id,
            ],
        )?;
        Self::require_changed(changed, "job", job_id)
    }

    fn fail_job(&mut self, job_id: &str, error: &str) -> Result<(), Self::Error> {
        let changed = self.conn.execute(
            "UPDATE extraction_jobs SET status = ?1, phase = ?1, message = ?2, error = ?2, updated_at = ?3
             WHERE id = ?4",
            params![JobStatus::Failed.as_str(), error, Self::now(), job_id],
        )?;
        Self::require_changed(changed, "job", job_id)
    }

    fn insert_evidence_locations(
        &mut self,
        organization_id: &str,
        document_id: &str,
        locations: &[EvidenceLocation],
    ) -> Result<(), Self::Error> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO evidence_locations (organization_id, document_id, evidence_type, evidence_id,
                    page_number, section_reference, extracted_text, confidence, extraction_method)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for location in locations {
                stmt.execute(params![
                    organization_id,
                    document_id,
                    &location.evidence_type,
                    &location.evidence_id,
                    location.page_number,
                    &location.section_reference,
                    &location.extracted_text,
                    location.confidence,
                    &location.extraction_method,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn framework_id(&self, code: &str) -> Result<Option<String>, Self::Error> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM frameworks WHERE code = ?1 COLLATE NOCASE",
                params![code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn framework_controls(&self, framework_id: &str) -> Result<Vec<FrameworkControl>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, control_id FROM framework_controls WHERE framework_id = ?1 ORDER BY control_id",
        )?;

        let controls = stmt
            .query_map(params![framework_id], |row| {
                Ok(FrameworkControl {
                    id: row.get(0)?,
                    control_id: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(controls)
    }

    fn upsert_rows(
        &mut self,
        table: &str,
        rows: &[Row],
        conflict_keys: &[&str],
    ) -> Result<usize, Self::Error> {
        let table = identifier(table)?;
        for key in conflict_keys {
            identifier(key)?;
        }

        let tx = self.conn.transaction()?;
        let mut written = 0;

        for row in rows {
            let columns: Vec<&str> = row
                .keys()
                .map(|k| identifier(k))
                .collect::<Result<_, _>>()?;

            if let Some(missing) = conflict_keys.iter().find(|k| !columns.contains(*k)) {
                return Err(StoreError::InvalidData(format!(
                    "Row for {} is missing conflict key {}",
                    table, missing
                )));
            }

            let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
            let updates: Vec<String> = columns
                .iter()
                .filter(|c| !conflict_keys.contains(*c))
                .map(|c| format!("{} = excluded.{}", c, c))
                .collect();
            let on_conflict = if updates.is_empty() {
                "DO NOTHING".to_string()
            } else {
                format!("DO UPDATE SET {}", updates.join(", "))
            };

            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) {}",
                table,
                columns.join(", "),
                placeholders.join(", "),
                conflict_keys.join(", "),
                on_conflict
            );

            written += tx.execute(&sql, params_from_iter(row.values().map(to_sql)))?;
        }

        tx.commit()?;
        debug!("Upserted {} rows into {}", written, table);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_initializes_twice() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        assert!(store.initialize_schema().is_ok());
    }

    #[test]
    fn test_missing_job_updates_fail() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        let err = store.fail_job("nope", "boom").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_download_missing_blob() {
        let store = SqliteStore::new(":memory:").unwrap();
        assert!(matches!(
            store.download("org/missing.pdf"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_rows_rejects_bad_table() {
        let store = SqliteStore::new(":memory:").unwrap();
        assert!(matches!(
            store.rows("jobs; DROP TABLE documents"),
            Err(StoreError::InvalidData(_))
        ));
    }
}
