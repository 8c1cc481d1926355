//! libSQL delivery ledger.
//!
//! The [`Ledger`] struct wraps a local libSQL database holding the set of
//! already-delivered cases, the LLM enrichment cache, and run history.
//!
//! **Contract:** the ledger is the authority on "already sent". A case is
//! recorded only after its digest was delivered, so a failed delivery leaves
//! the ledger untouched and the case is picked up again on the next run.

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use docketwatch_shared::{CaseRecord, Category, DocketwatchError, Result};
use libsql::{Connection, Database, TransactionBehavior, params};
use uuid::Uuid;

const UPSERT_DELIVERED_SQL: &str =
    "INSERT INTO delivered_cases (case_id, title, issued_at, delivered_at, precedential)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT(case_id) DO UPDATE SET
       title = excluded.title,
       issued_at = excluded.issued_at,
       delivered_at = excluded.delivered_at,
       precedential = excluded.precedential";

/// A delivered-case row.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    /// Docket number, e.g. `24-1145`.
    pub case_id: String,
    /// Case caption as it appeared in the feed.
    pub title: String,
    /// Date the court issued the decision.
    pub issued_at: chrono::NaiveDate,
    /// RFC 3339 timestamp of the digest delivery that included this case.
    pub delivered_at: String,
    /// Whether the decision was marked precedential.
    pub precedential: bool,
}

impl LedgerEntry {
    /// Build the row a delivered record is remembered by.
    pub fn for_delivery(record: &CaseRecord, delivered_at: DateTime<Utc>) -> Self {
        Self {
            case_id: record.case_id.clone(),
            title: record.title.clone(),
            issued_at: record.issued_at,
            delivered_at: delivered_at.to_rfc3339(),
            precedential: record.is_precedential,
        }
    }
}

/// A cached enrichment result.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEnrichment {
    pub summary: String,
    pub category: Option<Category>,
}

/// Primary ledger handle wrapping a libSQL database.
pub struct Ledger {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Ledger {
    /// Open or create a ledger database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DocketwatchError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DocketwatchError::Ledger(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DocketwatchError::Ledger(e.to_string()))?;

        let ledger = Self { db, conn };
        ledger.run_migrations().await?;
        Ok(ledger)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    DocketwatchError::Ledger(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Delivered-case operations
    // -----------------------------------------------------------------------

    /// Whether a case has already been delivered.
    pub async fn contains(&self, case_id: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM delivered_cases WHERE case_id = ?1",
                params![case_id],
            )
            .await
            .map_err(|e| DocketwatchError::Ledger(e.to_string()))?;

        match rows.next().await {
            Ok(Some(_)) => Ok(true),
            Ok(None) => Ok(false),
            Err(e) => Err(DocketwatchError::Ledger(e.to_string())),
        }
    }

    /// Record a single delivered case (upserts on `case_id`).
    pub async fn record(&self, entry: &LedgerEntry) -> Result<()> {
        let issued = entry.issued_at.to_string();
        self.conn
            .execute(
                UPSERT_DELIVERED_SQL,
                params![
                    entry.case_id.as_str(),
                    entry.title.as_str(),
                    issued.as_str(),
                    entry.delivered_at.as_str(),
                    i64::from(entry.precedential),
                ],
            )
            .await
            .map_err(|e| DocketwatchError::Ledger(e.to_string()))?;
        Ok(())
    }

    /// Record a batch of delivered cases in a single immediate transaction,
    /// so a crash mid-batch never leaves a partially committed digest.
    pub async fn record_all(&self, entries: &[LedgerEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await
            .map_err(|e| DocketwatchError::Ledger(e.to_string()))?;

        for entry in entries {
            let issued = entry.issued_at.to_string();
            tx.execute(
                UPSERT_DELIVERED_SQL,
                params![
                    entry.case_id.as_str(),
                    entry.title.as_str(),
                    issued.as_str(),
                    entry.delivered_at.as_str(),
                    i64::from(entry.precedential),
                ],
            )
            .await
            .map_err(|e| DocketwatchError::Ledger(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| DocketwatchError::Ledger(e.to_string()))?;

        tracing::info!(count = entries.len(), "recorded delivered cases");
        Ok(())
    }

    /// List delivered cases, most recent delivery first.
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<LedgerEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT case_id, title, issued_at, delivered_at, precedential
                 FROM delivered_cases ORDER BY delivered_at DESC, case_id LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(|e| DocketwatchError::Ledger(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_entry(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Run history operations
    // -----------------------------------------------------------------------

    /// Insert a new run record. Returns the generated run ID.
    pub async fn begin_run(&self) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO runs (id, started_at) VALUES (?1, ?2)",
                params![id.as_str(), now.as_str()],
            )
            .await
            .map_err(|e| DocketwatchError::Ledger(e.to_string()))?;
        Ok(id)
    }

    /// Update a run record with completion data.
    pub async fn finish_run(&self, run_id: &str, stats_json: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE runs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, run_id],
            )
            .await
            .map_err(|e| DocketwatchError::Ledger(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Enrichment cache operations
    // -----------------------------------------------------------------------

    /// Get a cached enrichment result.
    pub async fn cached_enrichment(
        &self,
        case_id: &str,
        prompt_hash: &str,
        model_id: &str,
    ) -> Result<Option<CachedEnrichment>> {
        let mut rows = self
            .conn
            .query(
                "SELECT summary, category FROM enrichment_cache
                 WHERE case_id = ?1 AND prompt_hash = ?2 AND model_id = ?3",
                params![case_id, prompt_hash, model_id],
            )
            .await
            .map_err(|e| DocketwatchError::Ledger(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let summary: String = row
                    .get(0)
                    .map_err(|e| DocketwatchError::Ledger(e.to_string()))?;
                let category = row
                    .get::<String>(1)
                    .ok()
                    .and_then(|s| s.parse::<Category>().ok());
                Ok(Some(CachedEnrichment { summary, category }))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DocketwatchError::Ledger(e.to_string())),
        }
    }

    /// Store an enrichment result in the cache (upserts).
    pub async fn store_enrichment(
        &self,
        case_id: &str,
        prompt_hash: &str,
        model_id: &str,
        summary: &str,
        category: Option<Category>,
    ) -> Result<()> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO enrichment_cache (id, case_id, prompt_hash, model_id, summary, category, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(case_id, prompt_hash, model_id) DO UPDATE SET
                   summary = excluded.summary,
                   category = excluded.category,
                   created_at = excluded.created_at",
                params![
                    id.as_str(),
                    case_id,
                    prompt_hash,
                    model_id,
                    summary,
                    category.map(|c| c.as_str()),
                    now.as_str()
                ],
            )
            .await
            .map_err(|e| DocketwatchError::Ledger(e.to_string()))?;
        Ok(())
    }
}

/// Convert a database row to a [`LedgerEntry`].
fn row_to_entry(row: &libsql::Row) -> Result<LedgerEntry> {
    Ok(LedgerEntry {
        case_id: row
            .get::<String>(0)
            .map_err(|e| DocketwatchError::Ledger(e.to_string()))?,
        title: row
            .get::<String>(1)
            .map_err(|e| DocketwatchError::Ledger(e.to_string()))?,
        issued_at: {
            let s: String = row
                .get(2)
                .map_err(|e| DocketwatchError::Ledger(e.to_string()))?;
            s.parse()
                .map_err(|e| DocketwatchError::Ledger(format!("invalid date: {e}")))?
        },
        delivered_at: row
            .get::<String>(3)
            .map_err(|e| DocketwatchError::Ledger(e.to_string()))?,
        precedential: row
            .get::<i64>(4)
            .map_err(|e| DocketwatchError::Ledger(e.to_string()))?
            != 0,
    })
}
