//! End-to-end digest pipeline: feed → records → ledger filter → enrichment
//! → digest → delivery → commit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, Utc};
use tracing::{debug, info, instrument, warn};

use docketwatch_digest::{DeliverySink, render_digest};
use docketwatch_enrich::Enricher;
use docketwatch_feed::{FeedClient, parse_feed, parse_record, resolve_document_url};
use docketwatch_ledger::{Ledger, LedgerEntry};
use docketwatch_shared::{AppConfig, CaseRecord, DocketwatchError, Result};

use crate::enrichment::{self, EnrichmentStats};

/// Per-run knobs the CLI can override.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Only decisions issued within this many days are considered.
    pub window_days: i64,
    /// Whether delivered cases are recorded in the ledger.
    pub commit: bool,
}

/// What one pipeline run saw and did.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Raw `<item>` entries in the fetched feed.
    pub entries_seen: usize,
    /// Entries that parsed into decision records.
    pub parsed: usize,
    /// Records inside the date window.
    pub in_window: usize,
    /// Records for which a document URL was resolved.
    pub resolved: usize,
    /// Records not yet in the ledger.
    pub new_records: usize,
    /// Enrichment counters.
    pub enrichment: EnrichmentStats,
    /// Records carried by the delivered digest.
    pub delivered: usize,
    /// Whether the delivered cases were recorded.
    pub committed: bool,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl RunReport {
    /// Compact JSON for the run-history row.
    pub fn stats_json(&self) -> String {
        serde_json::json!({
            "entries_seen": self.entries_seen,
            "parsed": self.parsed,
            "in_window": self.in_window,
            "resolved": self.resolved,
            "new_records": self.new_records,
            "cache_hits": self.enrichment.cache_hits,
            "cache_misses": self.enrichment.cache_misses,
            "enriched": self.enrichment.enriched,
            "delivered": self.delivered,
            "committed": self.committed,
            "elapsed_ms": self.elapsed.as_millis() as u64,
        })
        .to_string()
    }
}

/// Progress callbacks for the pipeline.
pub trait RunProgress: Send + Sync {
    /// A new pipeline phase has started.
    fn phase(&self, _name: &str) {}
    /// One record finished enrichment.
    fn record_enriched(&self, _current: usize, _total: usize, _case_id: &str) {}
    /// The run finished.
    fn done(&self, _report: &RunReport) {}
}

/// A reporter that does nothing (for tests / non-TTY).
pub struct SilentProgress;

impl RunProgress for SilentProgress {}

/// Run the digest pipeline once.
///
/// The ledger records a case only after the sink confirms delivery; a
/// failed delivery leaves every case in the batch eligible for the next
/// run. A run that outlives the feed fetch always closes its history
/// row, with stats on success and an error marker on failure.
#[instrument(skip_all, fields(window_days = options.window_days, commit = options.commit))]
pub async fn run_digest(
    config: &AppConfig,
    options: &RunOptions,
    ledger: &Ledger,
    enricher: Option<Arc<Enricher>>,
    sink: &dyn DeliverySink,
    progress: &dyn RunProgress,
) -> Result<RunReport> {
    let start = Instant::now();

    // --- Phase 1: Fetch the feed ---
    progress.phase("Fetching feed");
    let client = FeedClient::from_config(&config.feed)?;
    let xml = client.fetch().await?;

    // The run row is created only once the feed is in hand; a fetch
    // failure leaves the ledger untouched.
    let run_id = ledger.begin_run().await?;
    info!(run_id = %run_id, "digest run started");

    // --- Phase 2: Parse entries into records ---
    progress.phase("Parsing entries");
    let entries = parse_feed(&xml);
    let entries_seen = entries.len();

    let host = match config.feed.document_host_url() {
        Ok(host) => host,
        Err(e) => {
            fail_run(ledger, &run_id, &e).await;
            return Err(e);
        }
    };
    let today = Local::now().date_naive();
    let cutoff = today - chrono::Duration::days(options.window_days);

    let mut parsed = 0usize;
    let mut resolved = 0usize;
    let mut candidates: Vec<CaseRecord> = Vec::new();
    for entry in &entries {
        let Some(record) = parse_record(entry) else {
            continue;
        };
        parsed += 1;
        if record.issued_at < cutoff {
            debug!(
                case_id = %record.case_id,
                issued_at = %record.issued_at,
                "outside the date window, skipping"
            );
            continue;
        }
        let record = match resolve_document_url(&record, entry, &host) {
            Some(url) => {
                resolved += 1;
                record.with_document_url(url)
            }
            None => record,
        };
        candidates.push(record);
    }
    let in_window = candidates.len();

    // --- Phase 3: Drop already-delivered cases ---
    progress.phase("Checking the ledger");
    let mut fresh: Vec<CaseRecord> = Vec::new();
    for record in candidates {
        // A failed read aborts the run rather than risk a duplicate send.
        let delivered_before = match ledger.contains(&record.case_id).await {
            Ok(seen) => seen,
            Err(e) => {
                fail_run(ledger, &run_id, &e).await;
                return Err(e);
            }
        };
        if delivered_before {
            debug!(case_id = %record.case_id, "already delivered, skipping");
            continue;
        }
        fresh.push(record);
    }
    let new_records = fresh.len();

    if fresh.is_empty() {
        info!("no new decisions, nothing to deliver");
        let report = RunReport {
            entries_seen,
            parsed,
            in_window,
            resolved,
            new_records,
            enrichment: EnrichmentStats::default(),
            delivered: 0,
            committed: false,
            elapsed: start.elapsed(),
        };
        finish_run(ledger, &run_id, &report).await;
        progress.done(&report);
        return Ok(report);
    }

    // --- Phase 4: Enrichment (optional) ---
    let (mut fresh, enrichment_stats) = match &enricher {
        Some(enricher) => {
            progress.phase("Summarizing decisions");
            enrichment::enrich_records(
                enricher,
                ledger,
                fresh,
                config.enrichment.concurrency,
                progress,
            )
            .await
        }
        None => (fresh, EnrichmentStats::default()),
    };

    // Deterministic digest order: newest first, then docket number.
    fresh.sort_by(|a, b| {
        b.issued_at
            .cmp(&a.issued_at)
            .then_with(|| a.case_id.cmp(&b.case_id))
    });

    // --- Phase 5: Render and deliver ---
    progress.phase("Rendering digest");
    let digest = render_digest(&fresh, today);

    progress.phase("Delivering digest");
    if let Err(e) = sink.deliver(&digest, &config.delivery.recipients).await {
        fail_run(ledger, &run_id, &e).await;
        return Err(e);
    }
    let delivered = fresh.len();

    // --- Phase 6: Commit to the ledger ---
    let committed = if options.commit {
        let now = Utc::now();
        let delivered_entries: Vec<LedgerEntry> = fresh
            .iter()
            .map(|record| LedgerEntry::for_delivery(record, now))
            .collect();
        if let Err(e) = ledger.record_all(&delivered_entries).await {
            fail_run(ledger, &run_id, &e).await;
            return Err(e);
        }
        true
    } else {
        info!("dry run, ledger left untouched");
        false
    };

    let report = RunReport {
        entries_seen,
        parsed,
        in_window,
        resolved,
        new_records,
        enrichment: enrichment_stats,
        delivered,
        committed,
        elapsed: start.elapsed(),
    };
    finish_run(ledger, &run_id, &report).await;

    info!(
        delivered = report.delivered,
        new_records = report.new_records,
        cache_hits = report.enrichment.cache_hits,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "digest run complete"
    );
    progress.done(&report);
    Ok(report)
}

/// Close out the run-history row. Failures are logged, not propagated.
async fn finish_run(ledger: &Ledger, run_id: &str, report: &RunReport) {
    if let Err(e) = ledger.finish_run(run_id, &report.stats_json()).await {
        warn!(run_id = %run_id, error = %e, "failed to close the run record");
    }
}

/// Close out the run-history row with an error marker, best-effort, so an
/// aborted run does not dangle open in the history.
async fn fail_run(ledger: &Ledger, run_id: &str, error: &DocketwatchError) {
    let stats = serde_json::json!({ "error": error.to_string() }).to_string();
    if let Err(e) = ledger.finish_run(run_id, &stats).await {
        warn!(run_id = %run_id, error = %e, "failed to close the run record");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use docketwatch_digest::RenderedDigest;
    use docketwatch_shared::{
        AppConfig, DeliveryConfig, DocketwatchError, EnrichmentConfig, FeedConfig, LedgerConfig,
    };
    use libsql::params;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<RenderedDigest>>,
    }

    impl RecordingSink {
        fn count(&self) -> usize {
            self.delivered.lock().unwrap().len()
        }

        fn last(&self) -> RenderedDigest {
            self.delivered.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl DeliverySink for RecordingSink {
        async fn deliver(&self, digest: &RenderedDigest, _recipients: &[String]) -> Result<()> {
            self.delivered.lock().unwrap().push(digest.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl DeliverySink for FailingSink {
        async fn deliver(&self, _digest: &RenderedDigest, _recipients: &[String]) -> Result<()> {
            Err(DocketwatchError::delivery("sink offline"))
        }
    }

    fn feed_item(case_id: &str, caption: &str, kind: &str, issued: NaiveDate, desc: &str) -> String {
        let pub_date = format!("{} 12:00:00 -0400", issued.format("%a, %d %b %Y"));
        format!(
            "<item>\n<title>{case_id}: {caption} [{kind}]</title>\n\
             <link>https://www.cafc.uscourts.gov/?p={case_id}</link>\n\
             <description>{desc}</description>\n\
             <pubDate>{pub_date}</pubDate>\n</item>"
        )
    }

    fn feed_xml(items: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <rss version=\"2.0\"><channel>\n\
             <title>Court Opinions and Orders</title>\n\
             {items}\n\
             </channel></rss>"
        )
    }

    async fn feed_server(xml: String) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string(xml))
            .mount(&server)
            .await;
        server
    }

    fn test_config(feed_url: String, db_path: &Path) -> AppConfig {
        AppConfig {
            feed: FeedConfig {
                url: feed_url,
                document_host: "https://www.cafc.uscourts.gov".into(),
                timeout_secs: 5,
                window_days: 30,
            },
            ledger: LedgerConfig {
                db_path: Some(db_path.to_path_buf()),
            },
            enrichment: EnrichmentConfig {
                enabled: false,
                api_key_env: "DW_TEST_UNUSED_KEY".into(),
                base_url: "http://127.0.0.1:9/v1".into(),
                model: "test-model".into(),
                timeout_secs: 5,
                concurrency: 2,
                max_document_chars: 50_000,
            },
            delivery: DeliveryConfig {
                smtp_host: "smtp.example.test".into(),
                smtp_port: 587,
                from_address: "bot@example.test".into(),
                password_env: "DW_TEST_UNUSED_SMTP".into(),
                recipients: vec!["court-watchers@example.test".into()],
            },
        }
    }

    async fn temp_ledger() -> (Ledger, std::path::PathBuf) {
        let db_path = std::env::temp_dir().join(format!("dw_test_{}.db", Uuid::now_v7()));
        let ledger = Ledger::open(&db_path).await.unwrap();
        (ledger, db_path)
    }

    async fn run(
        config: &AppConfig,
        ledger: &Ledger,
        sink: &dyn DeliverySink,
        commit: bool,
    ) -> Result<RunReport> {
        run_digest(
            config,
            &RunOptions {
                window_days: 30,
                commit,
            },
            ledger,
            None,
            sink,
            &SilentProgress,
        )
        .await
    }

    fn yesterday() -> NaiveDate {
        Local::now().date_naive() - chrono::Duration::days(1)
    }

    const ANCHOR_DESC: &str = "Origin: PTAB | Nonprecedential | \
        &lt;a href=&quot;/opinions-orders/24-1145.OPINION.10-27-2025_2598245.pdf&quot;&gt;\
        Opinion&lt;/a&gt;";

    #[tokio::test]
    async fn delivers_new_decisions_and_commits_them() {
        let recent = feed_item(
            "24-1145",
            "ACME CORP. v. WIDGET LLC",
            "OPINION",
            yesterday(),
            ANCHOR_DESC,
        );
        let stale = feed_item(
            "22-0001",
            "OLD CASE v. OLDER CASE",
            "ORDER",
            Local::now().date_naive() - chrono::Duration::days(90),
            "Origin: DCT | Nonprecedential",
        );
        let server = feed_server(feed_xml(&format!("{recent}\n{stale}"))).await;
        let (ledger, db_path) = temp_ledger().await;
        let config = test_config(format!("{}/rss", server.uri()), &db_path);
        let sink = RecordingSink::default();

        let report = run(&config, &ledger, &sink, true).await.unwrap();

        assert_eq!(report.entries_seen, 2);
        assert_eq!(report.parsed, 2);
        assert_eq!(report.in_window, 1);
        assert_eq!(report.resolved, 1);
        assert_eq!(report.new_records, 1);
        assert_eq!(report.delivered, 1);
        assert!(report.committed);

        assert_eq!(sink.count(), 1);
        let digest = sink.last();
        assert!(digest.subject.starts_with("CAFC Daily Decisions"));
        assert!(digest.html.contains("ACME CORP. v. WIDGET LLC"));
        assert!(
            digest
                .html
                .contains("https://www.cafc.uscourts.gov/opinions-orders/24-1145.OPINION")
        );

        assert!(ledger.contains("24-1145").await.unwrap());
        assert!(!ledger.contains("22-0001").await.unwrap());
        let _ = std::fs::remove_file(db_path);
    }

    #[tokio::test]
    async fn second_run_delivers_nothing() {
        let item = feed_item(
            "24-1200",
            "REPEAT v. VISITOR",
            "OPINION",
            yesterday(),
            "Origin: CFC | Precedential",
        );
        let server = feed_server(feed_xml(&item)).await;
        let (ledger, db_path) = temp_ledger().await;
        let config = test_config(format!("{}/rss", server.uri()), &db_path);
        let sink = RecordingSink::default();

        let first = run(&config, &ledger, &sink, true).await.unwrap();
        assert_eq!(first.delivered, 1);

        let second = run(&config, &ledger, &sink, true).await.unwrap();
        assert_eq!(second.new_records, 0);
        assert_eq!(second.delivered, 0);
        assert_eq!(sink.count(), 1);
        let _ = std::fs::remove_file(db_path);
    }

    #[tokio::test]
    async fn failed_delivery_keeps_the_case_undelivered() {
        let item = feed_item(
            "24-1300",
            "RETRY v. NEXT RUN",
            "OPINION",
            yesterday(),
            "Origin: PTAB | Nonprecedential",
        );
        let server = feed_server(feed_xml(&item)).await;
        let (ledger, db_path) = temp_ledger().await;
        let config = test_config(format!("{}/rss", server.uri()), &db_path);

        let err = run(&config, &ledger, &FailingSink, true).await;
        assert!(err.is_err());
        assert!(!ledger.contains("24-1300").await.unwrap());

        // The next run picks the case back up.
        let sink = RecordingSink::default();
        let report = run(&config, &ledger, &sink, true).await.unwrap();
        assert_eq!(report.delivered, 1);
        assert!(ledger.contains("24-1300").await.unwrap());
        let _ = std::fs::remove_file(db_path);
    }

    #[tokio::test]
    async fn failed_delivery_still_closes_the_run_record() {
        let item = feed_item(
            "24-1310",
            "CLOSED v. BOOKS",
            "OPINION",
            yesterday(),
            "Origin: PTAB | Nonprecedential",
        );
        let server = feed_server(feed_xml(&item)).await;
        let (ledger, db_path) = temp_ledger().await;
        let config = test_config(format!("{}/rss", server.uri()), &db_path);

        let err = run(&config, &ledger, &FailingSink, true).await;
        assert!(err.is_err());

        // The run row carries the failure instead of dangling open.
        let db = libsql::Builder::new_local(&db_path).build().await.unwrap();
        let conn = db.connect().unwrap();
        let mut rows = conn
            .query("SELECT finished_at, stats_json FROM runs", params![])
            .await
            .unwrap();
        let row = rows.next().await.unwrap().expect("one run row");
        let finished = row.get::<String>(0).expect("finished_at set");
        assert!(!finished.is_empty());
        let stats = row.get::<String>(1).unwrap();
        assert!(stats.contains("sink offline"));
        assert!(rows.next().await.unwrap().is_none());
        let _ = std::fs::remove_file(db_path);
    }

    #[tokio::test]
    async fn feed_failure_aborts_before_the_ledger() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let (ledger, db_path) = temp_ledger().await;
        let config = test_config(format!("{}/rss", server.uri()), &db_path);
        let sink = RecordingSink::default();

        let err = run(&config, &ledger, &sink, true).await;
        assert!(err.is_err());
        assert_eq!(sink.count(), 0);
        assert!(ledger.list_recent(10).await.unwrap().is_empty());
        let _ = std::fs::remove_file(db_path);
    }

    #[tokio::test]
    async fn dry_run_leaves_the_ledger_untouched() {
        let item = feed_item(
            "24-1400",
            "DRY v. RUN",
            "OPINION",
            yesterday(),
            "Origin: ITC | Nonprecedential",
        );
        let server = feed_server(feed_xml(&item)).await;
        let (ledger, db_path) = temp_ledger().await;
        let config = test_config(format!("{}/rss", server.uri()), &db_path);
        let sink = RecordingSink::default();

        let report = run(&config, &ledger, &sink, false).await.unwrap();
        assert_eq!(report.delivered, 1);
        assert!(!report.committed);
        assert!(!ledger.contains("24-1400").await.unwrap());

        // Uncommitted cases are delivered again.
        let again = run(&config, &ledger, &sink, false).await.unwrap();
        assert_eq!(again.delivered, 1);
        assert_eq!(sink.count(), 2);
        let _ = std::fs::remove_file(db_path);
    }

    #[tokio::test]
    async fn unparseable_entries_do_not_sink_the_run() {
        let good = feed_item(
            "24-1500",
            "PARSES v. FINE",
            "OPINION",
            yesterday(),
            "Origin: DCT | Nonprecedential",
        );
        let garbage = "<item><title>Court holiday notice</title>\
             <description>The Clerk's Office is closed.</description>\
             <pubDate>not a date</pubDate></item>";
        let server = feed_server(feed_xml(&format!("{good}\n{garbage}"))).await;
        let (ledger, db_path) = temp_ledger().await;
        let config = test_config(format!("{}/rss", server.uri()), &db_path);
        let sink = RecordingSink::default();

        let report = run(&config, &ledger, &sink, true).await.unwrap();
        assert_eq!(report.entries_seen, 2);
        assert_eq!(report.parsed, 1);
        assert_eq!(report.delivered, 1);
        let _ = std::fs::remove_file(db_path);
    }

    #[tokio::test]
    async fn empty_window_short_circuits_without_delivery() {
        let stale = feed_item(
            "21-0042",
            "ANCIENT v. HISTORY",
            "ORDER",
            Local::now().date_naive() - chrono::Duration::days(365),
            "Origin: MSPB | Nonprecedential",
        );
        let server = feed_server(feed_xml(&stale)).await;
        let (ledger, db_path) = temp_ledger().await;
        let config = test_config(format!("{}/rss", server.uri()), &db_path);
        let sink = RecordingSink::default();

        let report = run(&config, &ledger, &sink, true).await.unwrap();
        assert_eq!(report.in_window, 0);
        assert_eq!(report.delivered, 0);
        assert!(!report.committed);
        assert_eq!(sink.count(), 0);
        let _ = std::fs::remove_file(db_path);
    }

    #[tokio::test]
    async fn digest_orders_newest_decisions_first() {
        let newer = feed_item(
            "24-0002",
            "NEWER v. DECISION",
            "OPINION",
            yesterday(),
            "Origin: PTAB | Nonprecedential",
        );
        let older = feed_item(
            "24-0001",
            "OLDER v. DECISION",
            "OPINION",
            yesterday() - chrono::Duration::days(1),
            "Origin: PTAB | Nonprecedential",
        );
        let server = feed_server(feed_xml(&format!("{older}\n{newer}"))).await;
        let (ledger, db_path) = temp_ledger().await;
        let config = test_config(format!("{}/rss", server.uri()), &db_path);
        let sink = RecordingSink::default();

        run(&config, &ledger, &sink, true).await.unwrap();

        let html = sink.last().html;
        let newer_at = html.find("24-0002").unwrap();
        let older_at = html.find("24-0001").unwrap();
        assert!(newer_at < older_at);
        let _ = std::fs::remove_file(db_path);
    }
}
