//! Chunked batch submission engine
//!
//! Turns a validated CSV upload into one durable batch row plus its
//! records, written sequentially in bounded chunks. Ingestion is not
//! transactional across chunks; instead the batch carries an explicit
//! ingest state and a chunk cursor so a failure partway through is
//! observable and resumable rather than a silent count mismatch.

use crate::db;
use crate::services::csv_ingest::{self, ParsedCsv, SubmissionConfig, ValidationError};
use crate::services::registry::CategoryRegistry;
use crate::services::with_write_timeout;
use rostra_common::events::{EventBus, RostraEvent};
use rostra_common::models::{BulkBatch, BulkRecord, Identity, IngestState, ReviewStatus};
use rostra_common::{db::settings, Error};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

/// Reference chunk size; overridable via the `ir_chunk_size` setting
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default per-chunk write timeout in milliseconds
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 10_000;

/// Submission failure taxonomy
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// Configuration precondition failed; nothing was written
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The batch row itself could not be created
    #[error("failed to create batch row: {source}")]
    BatchCreate {
        #[source]
        source: Error,
    },

    /// A chunk write failed; the batch is left partially ingested
    #[error("chunk {chunk_index} of {total_chunks} failed after {rows_written} rows: {source}")]
    ChunkFailed {
        batch_id: Uuid,
        /// Zero-based index of the failed chunk
        chunk_index: usize,
        total_chunks: usize,
        chunks_committed: usize,
        rows_written: usize,
        #[source]
        source: Error,
    },

    /// All chunks committed but the final state transition did not
    #[error("failed to finalize batch {batch_id}: {source}")]
    Finalize {
        batch_id: Uuid,
        #[source]
        source: Error,
    },

    #[error("batch {0} not found")]
    NotFound(Uuid),

    #[error("batch {batch_id} is not resumable from state {state}")]
    NotResumable { batch_id: Uuid, state: IngestState },

    #[error("resume supplied {supplied} rows but batch {batch_id} declared {declared}")]
    RowCountMismatch {
        batch_id: Uuid,
        supplied: usize,
        declared: i64,
    },
}

/// Store seam for batch ingestion.
///
/// The engine only ever needs these three writes; keeping them behind a
/// trait lets tests exercise partial failure without a wounded store.
pub trait BatchWriter {
    /// Create the batch row. Must be durable before any chunk is written.
    fn create_batch(
        &self,
        batch: &BulkBatch,
    ) -> impl std::future::Future<Output = rostra_common::Result<()>> + Send;

    /// Insert one chunk of records and advance the batch's resume cursor
    /// to `chunks_committed`, atomically.
    fn write_chunk(
        &self,
        batch_id: Uuid,
        records: &[BulkRecord],
        chunks_committed: i64,
    ) -> impl std::future::Future<Output = rostra_common::Result<()>> + Send;

    /// Record the batch's ingest state transition
    fn set_ingest_state(
        &self,
        batch_id: Uuid,
        state: IngestState,
    ) -> impl std::future::Future<Output = rostra_common::Result<()>> + Send;
}

/// sqlx-backed writer with a bounded per-write timeout
#[derive(Debug, Clone)]
pub struct SqliteBatchWriter {
    pool: SqlitePool,
    write_timeout: Duration,
}

impl SqliteBatchWriter {
    pub fn new(pool: SqlitePool, write_timeout: Duration) -> Self {
        Self {
            pool,
            write_timeout,
        }
    }
}

impl BatchWriter for SqliteBatchWriter {
    async fn create_batch(&self, batch: &BulkBatch) -> rostra_common::Result<()> {
        with_write_timeout(self.write_timeout, db::batches::insert_batch(&self.pool, batch)).await
    }

    async fn write_chunk(
        &self,
        batch_id: Uuid,
        records: &[BulkRecord],
        chunks_committed: i64,
    ) -> rostra_common::Result<()> {
        let pool = self.pool.clone();
        with_write_timeout(self.write_timeout, async move {
            // One transaction per chunk: the rows and the cursor move
            // together, so the cursor never points past persisted data
            let mut tx = pool.begin().await?;
            db::records::insert_chunk(&mut *tx, records).await?;
            sqlx::query("UPDATE bulk_batches SET chunks_committed = ? WHERE id = ?")
                .bind(chunks_committed)
                .bind(batch_id.to_string())
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    async fn set_ingest_state(
        &self,
        batch_id: Uuid,
        state: IngestState,
    ) -> rostra_common::Result<()> {
        with_write_timeout(
            self.write_timeout,
            db::batches::set_ingest_state(&self.pool, batch_id, state),
        )
        .await
    }
}

/// The chunked submission engine
pub struct SubmissionEngine<W: BatchWriter> {
    writer: W,
    event_bus: EventBus,
    chunk_size: usize,
}

impl SubmissionEngine<SqliteBatchWriter> {
    /// Build an engine with chunk size and write timeout from settings
    pub async fn from_settings(pool: &SqlitePool, event_bus: EventBus) -> rostra_common::Result<Self> {
        let chunk_size =
            settings::get_i64_setting(pool, "ir_chunk_size", DEFAULT_CHUNK_SIZE as i64).await?;
        let timeout_ms = settings::get_i64_setting(
            pool,
            "ir_write_timeout_ms",
            DEFAULT_WRITE_TIMEOUT_MS as i64,
        )
        .await?;

        let writer = SqliteBatchWriter::new(pool.clone(), Duration::from_millis(timeout_ms as u64));
        Ok(Self::new(writer, event_bus, chunk_size.max(1) as usize))
    }
}

impl<W: BatchWriter> SubmissionEngine<W> {
    pub fn new(writer: W, event_bus: EventBus, chunk_size: usize) -> Self {
        Self {
            writer,
            event_bus,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Chunk writes needed for `rows` rows
    pub fn total_chunks(&self, rows: usize) -> usize {
        (rows + self.chunk_size - 1) / self.chunk_size
    }

    /// Validate the configuration and create the batch row.
    ///
    /// The batch exists (pending review, `ingesting`) before any record is
    /// written; callers follow up with [`ingest_rows`](Self::ingest_rows).
    pub async fn create_batch(
        &self,
        parsed: &ParsedCsv,
        config: &SubmissionConfig,
        registry: &CategoryRegistry,
        submitter: &Identity,
    ) -> Result<BulkBatch, SubmissionError> {
        csv_ingest::validate_config(parsed, config, registry)?;

        let batch = BulkBatch {
            id: Uuid::new_v4(),
            batch_name: config.effective_batch_name(),
            category_key: config.category_key.clone(),
            tag_value: config.tag_value.clone(),
            id_column_name: config.id_column.clone(),
            record_count: parsed.rows.len() as i64,
            chunks_committed: 0,
            ingest_state: IngestState::Ingesting,
            notes: config
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            submitted_by: submitter.user_id,
            submitted_by_email: submitter.email.clone(),
            status: ReviewStatus::Pending,
            created_at: chrono::Utc::now(),
        };

        self.writer
            .create_batch(&batch)
            .await
            .map_err(|source| SubmissionError::BatchCreate { source })?;

        tracing::info!(
            batch_id = %batch.id,
            batch_name = %batch.batch_name,
            record_count = batch.record_count,
            total_chunks = self.total_chunks(parsed.rows.len()),
            "Batch created, starting chunked ingestion"
        );

        self.event_bus.emit(RostraEvent::BatchSubmissionStarted {
            batch_id: batch.id,
            record_count: parsed.rows.len(),
            total_chunks: self.total_chunks(parsed.rows.len()),
            timestamp: chrono::Utc::now(),
        });

        Ok(batch)
    }

    /// Stream a batch's rows into the store in chunk order
    pub async fn ingest_rows(
        &self,
        batch: &BulkBatch,
        rows: Vec<BTreeMap<String, String>>,
    ) -> Result<(), SubmissionError> {
        self.ingest_from(batch, rows, batch.chunks_committed as usize)
            .await
    }

    /// Convenience path: validate, create, and fully ingest in one call
    pub async fn submit(
        &self,
        parsed: ParsedCsv,
        config: &SubmissionConfig,
        registry: &CategoryRegistry,
        submitter: &Identity,
    ) -> Result<BulkBatch, SubmissionError> {
        let batch = self.create_batch(&parsed, config, registry, submitter).await?;
        self.ingest_rows(&batch, parsed.rows).await?;
        Ok(batch)
    }

    /// Check that a batch can be resumed with the supplied row count
    pub fn validate_resume(
        &self,
        batch: &BulkBatch,
        supplied_rows: usize,
    ) -> Result<(), SubmissionError> {
        if batch.ingest_state != IngestState::PartiallyIngested {
            return Err(SubmissionError::NotResumable {
                batch_id: batch.id,
                state: batch.ingest_state,
            });
        }
        if supplied_rows as i64 != batch.record_count {
            return Err(SubmissionError::RowCountMismatch {
                batch_id: batch.id,
                supplied: supplied_rows,
                declared: batch.record_count,
            });
        }
        Ok(())
    }

    /// Resume a partially ingested batch from its chunk cursor.
    ///
    /// The caller re-supplies the same rows; chunks up to `chunks_committed`
    /// are skipped, everything after is written as in a fresh submission.
    pub async fn resume(
        &self,
        batch: &BulkBatch,
        rows: Vec<BTreeMap<String, String>>,
    ) -> Result<(), SubmissionError> {
        self.validate_resume(batch, rows.len())?;

        let resume_from = batch.chunks_committed as usize;
        self.writer
            .set_ingest_state(batch.id, IngestState::Ingesting)
            .await
            .map_err(|source| SubmissionError::Finalize {
                batch_id: batch.id,
                source,
            })?;

        tracing::info!(
            batch_id = %batch.id,
            resume_from_chunk = resume_from,
            "Resuming partially ingested batch"
        );

        self.event_bus.emit(RostraEvent::BatchResumeStarted {
            batch_id: batch.id,
            resume_from_chunk: resume_from,
            total_chunks: self.total_chunks(rows.len()),
            timestamp: chrono::Utc::now(),
        });

        self.ingest_from(batch, rows, resume_from).await
    }

    /// Sequential chunk loop shared by submission and resume.
    ///
    /// Chunk k+1 is not issued until chunk k is acknowledged; on the first
    /// failure the loop stops, marks the batch partial, and reports exactly
    /// how much was written. Already-written chunks are never deleted.
    async fn ingest_from(
        &self,
        batch: &BulkBatch,
        rows: Vec<BTreeMap<String, String>>,
        skip_chunks: usize,
    ) -> Result<(), SubmissionError> {
        let total_rows = rows.len();
        let total_chunks = self.total_chunks(total_rows);

        for (chunk_index, chunk) in rows.chunks(self.chunk_size).enumerate() {
            if chunk_index < skip_chunks {
                continue;
            }

            let records: Vec<BulkRecord> = chunk
                .iter()
                .cloned()
                .map(|row| BulkRecord::from_row(batch.id, &batch.id_column_name, row))
                .collect();

            if let Err(source) = self
                .writer
                .write_chunk(batch.id, &records, (chunk_index + 1) as i64)
                .await
            {
                let rows_written = (chunk_index * self.chunk_size).min(total_rows);

                tracing::error!(
                    batch_id = %batch.id,
                    chunk_index = chunk_index,
                    total_chunks = total_chunks,
                    rows_written = rows_written,
                    error = %source,
                    "Chunk write failed, leaving batch partially ingested"
                );

                if let Err(mark_error) = self
                    .writer
                    .set_ingest_state(batch.id, IngestState::PartiallyIngested)
                    .await
                {
                    tracing::warn!(
                        batch_id = %batch.id,
                        error = %mark_error,
                        "Failed to mark batch partially ingested"
                    );
                }

                self.event_bus.emit(RostraEvent::BatchSubmissionFailed {
                    batch_id: batch.id,
                    chunk_index,
                    rows_written,
                    error: source.to_string(),
                    timestamp: chrono::Utc::now(),
                });

                return Err(SubmissionError::ChunkFailed {
                    batch_id: batch.id,
                    chunk_index,
                    total_chunks,
                    chunks_committed: chunk_index,
                    rows_written,
                    source,
                });
            }

            let rows_written = ((chunk_index + 1) * self.chunk_size).min(total_rows);
            let percent = (((chunk_index + 1) * 100) / total_chunks) as u8;

            tracing::debug!(
                batch_id = %batch.id,
                chunk_index = chunk_index,
                total_chunks = total_chunks,
                rows_written = rows_written,
                percent = percent,
                "Chunk committed"
            );

            self.event_bus.emit(RostraEvent::BatchChunkCommitted {
                batch_id: batch.id,
                chunk_index,
                total_chunks,
                rows_written,
                percent,
                timestamp: chrono::Utc::now(),
            });
        }

        self.writer
            .set_ingest_state(batch.id, IngestState::Ingested)
            .await
            .map_err(|source| SubmissionError::Finalize {
                batch_id: batch.id,
                source,
            })?;

        tracing::info!(
            batch_id = %batch.id,
            record_count = total_rows,
            total_chunks = total_chunks,
            "Batch fully ingested"
        );

        self.event_bus.emit(RostraEvent::BatchSubmissionCompleted {
            batch_id: batch.id,
            record_count: total_rows,
            timestamp: chrono::Utc::now(),
        });

        Ok(())
    }
}
