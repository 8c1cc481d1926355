//! Document URL resolution.
//!
//! The feed does not reliably carry a link to the decision PDF: newer
//! entries embed an anchor in the description, older shapes only imply the
//! filename through the permalink. Resolution is an ordered list of named
//! strategies tried first-hit-wins, so the fallback chain is a declared,
//! testable table instead of nested conditionals. No strategy succeeding
//! is a normal outcome, not an error.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use docketwatch_shared::{CaseRecord, DocumentKind};

use crate::parser::FeedEntry;

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches a PDF anchor on the court's documents path in a description blob.
static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="(/opinions-orders/[^"]+\.pdf)""#).expect("anchor regex"));

/// Matches the date token following a document-kind keyword in a permalink.
static PERMALINK_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-(?:order|opinion|errata|rule_36_judgment)-(\d{1,2}-\d{1,2}-\d{4})_")
        .expect("permalink date regex")
});

/// Matches the numeric document id at the end of a permalink path.
static DOC_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(\d+)/?$").expect("doc id regex"));

// ---------------------------------------------------------------------------
// Strategy table
// ---------------------------------------------------------------------------

/// Everything a resolution strategy may draw on.
struct ResolveContext<'a> {
    case_id: &'a str,
    document_kind: DocumentKind,
    description: &'a str,
    permalink: &'a str,
    host: &'a Url,
}

type Strategy = for<'a> fn(&ResolveContext<'a>) -> Option<String>;

/// Resolution strategies in declared order; the first `Some` wins.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("anchor-extract", anchor_extract),
    ("permalink-reconstruct", permalink_reconstruct),
];

/// Resolve the document URL for a parsed record.
pub fn resolve_document_url(record: &CaseRecord, entry: &FeedEntry, host: &Url) -> Option<String> {
    let ctx = ResolveContext {
        case_id: &record.case_id,
        document_kind: record.document_kind,
        description: &entry.description,
        permalink: &entry.permalink,
        host,
    };

    for (name, strategy) in STRATEGIES {
        if let Some(url) = strategy(&ctx) {
            debug!(case_id = %record.case_id, strategy = name, url = %url, "document URL resolved");
            return Some(url);
        }
    }

    debug!(case_id = %record.case_id, permalink = %entry.permalink, "no strategy produced a document URL");
    None
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Strategy 1: a PDF anchor embedded in the description, resolved against
/// the document host.
fn anchor_extract(ctx: &ResolveContext<'_>) -> Option<String> {
    let caps = ANCHOR_RE.captures(ctx.description)?;
    ctx.host.join(&caps[1]).ok().map(|url| url.to_string())
}

/// Strategy 2: reconstruct the filename the court publishes under, from the
/// date token and trailing document id carried by the permalink.
fn permalink_reconstruct(ctx: &ResolveContext<'_>) -> Option<String> {
    let date = PERMALINK_DATE_RE.captures(ctx.permalink)?;
    let doc_id = DOC_ID_RE.captures(ctx.permalink)?;

    let path = format!(
        "/opinions-orders/{}.{}.{}_{}.pdf",
        ctx.case_id,
        ctx.document_kind.as_str(),
        &date[1],
        &doc_id[1],
    );
    ctx.host.join(&path).ok().map(|url| url.to_string())
}
