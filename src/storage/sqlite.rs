use crate::analyzer::BatchSummary;
use crate::model::{FeedbackRecord, StorageError};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::collections::BTreeMap;

/// Sale feedback and per-batch statistics kept between runs.
pub struct FeedbackStore {
    conn: Connection,
}

impl FeedbackStore {
    /// Opens (or creates) the database and makes sure the tables exist.
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ad_id TEXT,
                brand TEXT,
                predicted_price REAL NOT NULL,
                actual_price REAL NOT NULL,
                recorded_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS feedback_brand ON feedback (brand);

            CREATE TABLE IF NOT EXISTS batch_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                generated_at TEXT NOT NULL,
                processed INTEGER NOT NULL,
                skipped INTEGER NOT NULL,
                priced INTEGER NOT NULL,
                not_found INTEGER NOT NULL,
                matched_by_source TEXT NOT NULL DEFAULT '{}',
                mean_total_depreciation REAL NOT NULL,
                mean_estimated_price REAL,
                estimated_price_std_dev REAL,
                urgent_sales INTEGER NOT NULL
            );
            ",
        )?;

        Ok(Self { conn })
    }

    pub fn record_feedback(&self, record: &FeedbackRecord) -> Result<(), StorageError> {
        insert_feedback(&self.conn, record)
    }

    /// Stores a batch of records in one transaction and returns how many were written.
    pub fn import_feedback(&mut self, records: &[FeedbackRecord]) -> Result<usize, StorageError> {
        let tx = self.conn.transaction()?;
        for record in records {
            insert_feedback(&tx, record)?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    pub fn feedback_records(&self) -> Result<Vec<FeedbackRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT ad_id, brand, predicted_price, actual_price, recorded_at
             FROM feedback ORDER BY id ASC",
        )?;

        let rows = stmt.query_map([], Self::map_feedback)?;
        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }

        Ok(records)
    }

    /// `actual / predicted` ratios of usable feedback, optionally for one brand.
    pub fn ratio_samples(&self, brand: Option<&str>) -> Result<Vec<f64>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT actual_price / predicted_price FROM feedback
             WHERE predicted_price > 0 AND actual_price > 0
               AND (?1 IS NULL OR brand = ?1)
             ORDER BY id ASC",
        )?;

        let rows = stmt.query_map(params![brand], |row| row.get::<_, f64>(0))?;
        let mut ratios = Vec::new();
        for ratio in rows {
            ratios.push(ratio?);
        }

        Ok(ratios)
    }

    pub fn save_batch_summary(&self, summary: &BatchSummary) -> Result<(), StorageError> {
        let by_source = serde_json::to_string(&summary.matched_by_source)
            .map_err(|e| StorageError::InvalidData(format!("source counts: {e}")))?;

        self.conn.execute(
            "INSERT INTO batch_stats (
                generated_at, processed, skipped, priced, not_found,
                matched_by_source, mean_total_depreciation,
                mean_estimated_price, estimated_price_std_dev, urgent_sales
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                &summary.generated_at.to_rfc3339(),
                &summary.processed,
                &summary.skipped,
                &summary.priced,
                &summary.not_found,
                &by_source,
                &summary.mean_total_depreciation,
                &summary.mean_estimated_price,
                &summary.estimated_price_std_dev,
                &summary.urgent_sales,
            ],
        )?;
        Ok(())
    }

    /// Most recently saved batch summary, if any run has been recorded.
    pub fn latest_summary(&self) -> Result<Option<BatchSummary>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT generated_at, processed, skipped, priced, not_found,
                    matched_by_source, mean_total_depreciation,
                    mean_estimated_price, estimated_price_std_dev, urgent_sales
             FROM batch_stats ORDER BY id DESC LIMIT 1",
        )?;

        let mut rows = stmt.query([])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let generated_at = parse_timestamp(&row.get::<_, String>(0)?)?;
        let by_source: String = row.get(5)?;
        let matched_by_source: BTreeMap<String, usize> = serde_json::from_str(&by_source)
            .map_err(|e| StorageError::InvalidData(format!("source counts: {e}")))?;

        Ok(Some(BatchSummary {
            processed: row.get(1)?,
            skipped: row.get(2)?,
            priced: row.get(3)?,
            not_found: row.get(4)?,
            matched_by_source,
            mean_total_depreciation: row.get(6)?,
            mean_estimated_price: row.get(7)?,
            estimated_price_std_dev: row.get(8)?,
            urgent_sales: row.get(9)?,
            generated_at,
        }))
    }

    fn map_feedback(row: &Row) -> Result<FeedbackRecord, rusqlite::Error> {
        let recorded_at: String = row.get(4)?;
        let recorded_at = recorded_at.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(FeedbackRecord {
            ad_id: row.get(0)?,
            brand: row.get(1)?,
            predicted_price: row.get(2)?,
            actual_price: row.get(3)?,
            recorded_at,
        })
    }
}

fn insert_feedback(conn: &Connection, record: &FeedbackRecord) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO feedback (ad_id, brand, predicted_price, actual_price, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            &record.ad_id,
            &record.brand,
            &record.predicted_price,
            &record.actual_price,
            &record.recorded_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, StorageError> {
    text.parse()
        .map_err(|e| StorageError::InvalidData(format!("invalid timestamp {text:?}: {e}")))
}
