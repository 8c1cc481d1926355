//! Enrichment fan-out with ledger-backed caching.
//!
//! Cache reads and writes stay on the calling task; only the model calls
//! fan out, capped by the configured concurrency.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use docketwatch_enrich::{Enricher, prompt_hash};
use docketwatch_ledger::Ledger;
use docketwatch_shared::CaseRecord;

use crate::pipeline::RunProgress;

/// Counters for one enrichment phase.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentStats {
    /// Records whose enrichment came out of the ledger cache.
    pub cache_hits: usize,
    /// Records that went to the model.
    pub cache_misses: usize,
    /// Records that came back from the model with a summary.
    pub enriched: usize,
}

/// Enrich `records`, consulting the ledger cache first and fanning the
/// misses out to the model.
///
/// Never fails: a record whose enrichment goes sideways passes through
/// unchanged so the digest still carries it.
#[instrument(skip_all, fields(records = records.len(), concurrency))]
pub(crate) async fn enrich_records(
    enricher: &Arc<Enricher>,
    ledger: &Ledger,
    records: Vec<CaseRecord>,
    concurrency: usize,
    progress: &dyn RunProgress,
) -> (Vec<CaseRecord>, EnrichmentStats) {
    let mut stats = EnrichmentStats::default();
    let mut done: Vec<CaseRecord> = Vec::with_capacity(records.len());
    let mut pending: Vec<CaseRecord> = Vec::new();

    for record in records {
        // Without a document there is nothing to summarize or cache.
        if !record.has_document() {
            done.push(record);
            continue;
        }
        let hash = prompt_hash(&record);
        match ledger
            .cached_enrichment(&record.case_id, &hash, enricher.model_id())
            .await
        {
            Ok(Some(cached)) => {
                debug!(case_id = %record.case_id, "enrichment cache hit");
                stats.cache_hits += 1;
                let mut record = record.with_summary(cached.summary);
                if let Some(category) = cached.category {
                    record = record.with_category(category);
                }
                done.push(record);
            }
            Ok(None) => pending.push(record),
            Err(e) => {
                warn!(
                    case_id = %record.case_id,
                    error = %e,
                    "enrichment cache read failed, treating as miss"
                );
                pending.push(record);
            }
        }
    }

    stats.cache_misses = pending.len();
    if pending.is_empty() {
        return (done, stats);
    }

    let total = pending.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(total);
    for record in pending {
        let enricher = Arc::clone(enricher);
        let sem = Arc::clone(&semaphore);
        // Kept so a panicked task still yields a deliverable record.
        let fallback = record.clone();
        handles.push((
            fallback,
            tokio::spawn(async move {
                let _permit = sem.acquire().await.expect("semaphore closed");
                enricher.enrich(record).await
            }),
        ));
    }

    let mut fresh: Vec<CaseRecord> = Vec::with_capacity(total);
    for (i, (fallback, handle)) in handles.into_iter().enumerate() {
        let record = match handle.await {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    case_id = %fallback.case_id,
                    error = %e,
                    "enrichment task failed, record passes through unenriched"
                );
                fallback
            }
        };
        progress.record_enriched(i + 1, total, &record.case_id);
        fresh.push(record);
    }

    // Cache writes are best-effort.
    for record in &fresh {
        if let Some(summary) = &record.summary {
            stats.enriched += 1;
            let hash = prompt_hash(record);
            let _ = ledger
                .store_enrichment(
                    &record.case_id,
                    &hash,
                    enricher.model_id(),
                    summary,
                    record.category,
                )
                .await;
        }
    }

    done.append(&mut fresh);
    info!(
        cache_hits = stats.cache_hits,
        cache_misses = stats.cache_misses,
        enriched = stats.enriched,
        "enrichment phase complete"
    );
    (done, stats)
}
