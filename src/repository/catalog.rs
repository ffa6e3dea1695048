//! Catalogue persistence: insert-or-skip by `(title, category)`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use thiserror::Error;
use tracing::{debug, warn};

use super::models::{CatalogRecordRow, NewCatalogRecord};
use super::pool::{DbError, DbPool};
use crate::models::{CatalogRecord, MAX_TEXT_LEN};
use crate::schema::catalog_records;
use crate::with_conn;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("database error: {0}")]
    Database(#[from] DbError),
}

/// Destination for normalized records.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Store a batch atomically, returning how many rows were inserted.
    ///
    /// Records whose natural key already exists are skipped without error.
    /// Any other failure rolls back the whole batch.
    async fn persist_batch(&self, records: &[CatalogRecord]) -> Result<usize, SinkError>;
}

/// Diesel-backed catalogue repository.
#[derive(Clone)]
pub struct CatalogRepository {
    pool: DbPool,
}

impl CatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a batch inside one transaction; conflicts on the natural key
    /// are left untouched.
    pub async fn insert_batch(&self, records: &[CatalogRecord]) -> Result<usize, DbError> {
        warn_oversized(records);

        let rows: Vec<NewCatalogRecord<'_>> = records.iter().map(NewCatalogRecord::from).collect();

        let inserted = with_conn!(self.pool, conn => {
            conn.transaction(|conn| {
                Box::pin(async move {
                    let mut inserted = 0usize;
                    for row in &rows {
                        inserted += diesel::insert_into(catalog_records::table)
                            .values(row)
                            .on_conflict((catalog_records::title, catalog_records::category))
                            .do_nothing()
                            .execute(conn)
                            .await?;
                    }
                    Ok::<_, DbError>(inserted)
                })
            })
            .await
        })?;

        debug!(
            batch = records.len(),
            inserted,
            skipped = records.len() - inserted,
            "persisted batch"
        );

        Ok(inserted)
    }

    /// Total stored records.
    pub async fn count(&self) -> Result<i64, DbError> {
        with_conn!(self.pool, conn => {
            catalog_records::table
                .count()
                .get_result::<i64>(&mut conn)
                .await
        })
    }

    /// Look up a record by its natural key.
    pub async fn find(
        &self,
        title: &str,
        category: &str,
    ) -> Result<Option<CatalogRecord>, DbError> {
        let row: Option<CatalogRecordRow> = with_conn!(self.pool, conn => {
            catalog_records::table
                .filter(catalog_records::title.eq(title))
                .filter(catalog_records::category.eq(category))
                .select(CatalogRecordRow::as_select())
                .first(&mut conn)
                .await
                .optional()
        })?;

        row.map(CatalogRecord::try_from).transpose()
    }

    /// All records in insertion order.
    pub async fn all(&self) -> Result<Vec<CatalogRecord>, DbError> {
        let rows: Vec<CatalogRecordRow> = with_conn!(self.pool, conn => {
            catalog_records::table
                .order(catalog_records::id.asc())
                .select(CatalogRecordRow::as_select())
                .load(&mut conn)
                .await
        })?;

        rows.into_iter().map(CatalogRecord::try_from).collect()
    }
}

/// Warn about every record with a text field over [`MAX_TEXT_LEN`].
/// Returns how many records were flagged.
fn warn_oversized(records: &[CatalogRecord]) -> usize {
    let mut flagged = 0;
    for record in records {
        let oversized = record.oversized_fields();
        if !oversized.is_empty() {
            flagged += 1;
            warn!(
                title = %record.title,
                fields = ?oversized,
                limit = MAX_TEXT_LEN,
                "record exceeds column bound, storing untruncated"
            );
        }
    }
    flagged
}

#[async_trait]
impl RecordSink for CatalogRepository {
    async fn persist_batch(&self, records: &[CatalogRecord]) -> Result<usize, SinkError> {
        Ok(self.insert_batch(records).await?)
    }
}
