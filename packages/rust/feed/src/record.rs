//! Turning one raw feed entry into a structured case record.
//!
//! The title pattern is the primary discriminator: the feed carries items
//! this pipeline does not understand (announcements, miscellany), and
//! anything whose title is not `id: caption [KIND]` is silently skipped
//! rather than half-parsed. A missing origin or missing precedential token
//! only degrades the affected field; an unparseable publication date
//! discards the entry, because a record without an issue date cannot be
//! window-filtered or rendered meaningfully.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use tracing::{debug, warn};

use docketwatch_shared::{CaseRecord, DocumentKind, UNKNOWN_ORIGIN};

use crate::parser::FeedEntry;

/// Publication date layout after the offset suffix is stripped.
const PUBLISHED_FORMAT: &str = "%a, %d %b %Y %H:%M:%S";

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches `24-1145: CAPTION [KIND]` at the start of a title.
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+-\d+):\s*(.+?)\s*\[([^\]]+)\]").expect("title regex"));

/// Matches the `Origin: XXXX` token in a description blob.
static ORIGIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Origin:\s*(\w+)").expect("origin regex"));

/// Matches the trailing numeric UTC-offset suffix of a pubDate.
static OFFSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[+-]\d{4}$").expect("offset regex"));

// ---------------------------------------------------------------------------
// Entry → record
// ---------------------------------------------------------------------------

/// Parse one feed entry into a [`CaseRecord`], or `None` if the entry is
/// not a recognizable decision record.
pub fn parse_record(entry: &FeedEntry) -> Option<CaseRecord> {
    let caps = match TITLE_RE.captures(&entry.title) {
        Some(caps) => caps,
        None => {
            debug!(title = %entry.title, "title does not look like a decision, skipping");
            return None;
        }
    };

    let case_id = caps[1].to_string();
    let title = caps[2].trim().to_string();
    let document_kind = DocumentKind::from_tag(&caps[3]);

    let issued_at = match parse_published(&entry.published) {
        Some(date) => date,
        None => {
            warn!(
                case_id = %case_id,
                published = %entry.published,
                "unparseable publication date, skipping entry"
            );
            return None;
        }
    };

    Some(CaseRecord {
        case_id,
        title,
        origin: extract_origin(&entry.description),
        document_kind,
        is_precedential: is_precedential(&entry.description),
        issued_at,
        document_url: String::new(),
        summary: None,
        category: None,
    })
}

/// Extract the lower-tribunal code, defaulting to the sentinel.
fn extract_origin(description: &str) -> String {
    ORIGIN_RE
        .captures(description)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| UNKNOWN_ORIGIN.to_string())
}

/// Precedential only when "Precedential" appears and "Nonprecedential"
/// does not. "Precedential" is a substring of "Nonprecedential", so the
/// negation check is mandatory, not polish.
fn is_precedential(description: &str) -> bool {
    description.contains("Precedential") && !description.contains("Nonprecedential")
}

/// Strip the offset suffix and parse the fixed-format date, keeping the
/// day component.
fn parse_published(published: &str) -> Option<chrono::NaiveDate> {
    let stripped = OFFSET_RE.replace(published.trim(), "");
    NaiveDateTime::parse_from_str(&stripped, PUBLISHED_FORMAT)
        .ok()
        .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(title: &str, description: &str, published: &str) -> FeedEntry {
        FeedEntry {
            title: title.into(),
            description: description.into(),
            permalink: "https://www.cafc.uscourts.gov/home/case/".into(),
            published: published.into(),
        }
    }

    #[test]
    fn parses_title_into_id_caption_and_kind() {
        let record = parse_record(&entry(
            "24-1145: AORTIC INNOVATIONS LLC v. EDWARDS LIFESCIENCES CORPORATION [OPINION]",
            "Origin: DCT; Precedential",
            "Mon, 27 Oct 2025 15:00:00 +0000",
        ))
        .expect("decision record");

        assert_eq!(record.case_id, "24-1145");
        assert_eq!(
            record.title,
            "AORTIC INNOVATIONS LLC v. EDWARDS LIFESCIENCES CORPORATION"
        );
        assert_eq!(record.document_kind, DocumentKind::Opinion);
        assert_eq!(record.origin, "DCT");
        assert!(record.is_precedential);
        assert_eq!(
            record.issued_at,
            NaiveDate::from_ymd_opt(2025, 10, 27).unwrap()
        );
        assert!(record.document_url.is_empty());
    }

    #[test]
    fn title_without_bracket_tag_is_skipped() {
        let result = parse_record(&entry(
            "Announcement: The Clerk's Office will close early",
            "",
            "Mon, 27 Oct 2025 15:00:00 +0000",
        ));
        assert!(result.is_none());
    }

    #[test]
    fn title_without_docket_number_is_skipped() {
        let result = parse_record(&entry(
            "AORTIC INNOVATIONS LLC v. EDWARDS LIFESCIENCES CORPORATION [OPINION]",
            "Origin: DCT",
            "Mon, 27 Oct 2025 15:00:00 +0000",
        ));
        assert!(result.is_none());
    }

    #[test]
    fn nonprecedential_token_always_wins() {
        // "Precedential" is textually present inside "Nonprecedential".
        let record = parse_record(&entry(
            "24-1290: PICTOMETRY INTERNATIONAL CORP. v. NEARMAP US, INC. [ORDER]",
            "Origin: PTO; Nonprecedential",
            "Mon, 27 Oct 2025 15:00:00 +0000",
        ))
        .expect("decision record");
        assert!(!record.is_precedential);

        // Both tokens present verbatim: negation still wins.
        let record = parse_record(&entry(
            "24-1291: A v. B [ORDER]",
            "Precedential status: Nonprecedential",
            "Mon, 27 Oct 2025 15:00:00 +0000",
        ))
        .expect("decision record");
        assert!(!record.is_precedential);
    }

    #[test]
    fn missing_description_degrades_defaults_only() {
        let record = parse_record(&entry(
            "25-2002: PETER J. POLINSKI TRUST v. US [ORDER]",
            "",
            "Tue, 28 Oct 2025 12:00:00 +0000",
        ))
        .expect("decision record");

        assert_eq!(record.origin, UNKNOWN_ORIGIN);
        assert!(!record.is_precedential);
        assert_eq!(record.case_id, "25-2002");
    }

    #[test]
    fn offset_suffix_is_stripped_before_date_parse() {
        for published in [
            "Mon, 27 Oct 2025 15:00:00 +0000",
            "Mon, 27 Oct 2025 15:00:00 -0400",
            "Mon, 27 Oct 2025 15:00:00",
        ] {
            let record = parse_record(&entry(
                "24-1145: A v. B [OPINION]",
                "Origin: DCT",
                published,
            ))
            .unwrap_or_else(|| panic!("should parse: {published}"));
            assert_eq!(
                record.issued_at,
                NaiveDate::from_ymd_opt(2025, 10, 27).unwrap()
            );
        }
    }

    #[test]
    fn unparseable_date_discards_the_entry() {
        let result = parse_record(&entry(
            "24-1145: A v. B [OPINION]",
            "Origin: DCT",
            "sometime last Tuesday",
        ));
        assert!(result.is_none());
    }

    #[test]
    fn unknown_kind_tag_maps_to_other() {
        let record = parse_record(&entry(
            "24-1299: C v. D [NOTICE]",
            "Origin: PTO",
            "Mon, 27 Oct 2025 15:00:00 +0000",
        ))
        .expect("decision record");
        assert_eq!(record.document_kind, DocumentKind::Other);
    }

    #[test]
    fn malformed_entries_do_not_affect_neighbors() {
        let entries = vec![
            entry(
                "24-1145: A v. B [OPINION]",
                "Origin: DCT",
                "Mon, 27 Oct 2025 15:00:00 +0000",
            ),
            entry("no docket here", "", "Mon, 27 Oct 2025 15:00:00 +0000"),
            entry("24-1146: C v. D [ORDER]", "", "bad date"),
            entry(
                "24-1147: E v. F [ERRATA]",
                "Origin: CFC",
                "Tue, 28 Oct 2025 09:30:00 +0000",
            ),
        ];

        let records: Vec<_> = entries.iter().filter_map(parse_record).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].case_id, "24-1145");
        assert_eq!(records[1].case_id, "24-1147");
    }
}
