//! Core domain types for the docketwatch pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sentinel origin used when the description carries no "Origin:" token.
pub const UNKNOWN_ORIGIN: &str = "Unknown";

// ---------------------------------------------------------------------------
// DocumentKind
// ---------------------------------------------------------------------------

/// The bracketed document-kind tag carried in a feed entry title.
///
/// The canonical token (`as_str`) is also the filename segment used by the
/// court's document host, so it must stay uppercase with underscores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    #[serde(rename = "OPINION")]
    Opinion,
    #[serde(rename = "ORDER")]
    Order,
    #[serde(rename = "ERRATA")]
    Errata,
    #[serde(rename = "RULE_36_JUDGMENT")]
    Rule36Judgment,
    #[serde(rename = "OTHER")]
    Other,
}

impl DocumentKind {
    /// Map a raw bracket tag onto a kind.
    ///
    /// Tags are normalized (trimmed, uppercased, spaces to underscores) so
    /// that "Rule 36 Judgment" and "RULE_36_JUDGMENT" land on the same
    /// variant. Anything unrecognized is `Other`, never a parse failure.
    pub fn from_tag(tag: &str) -> Self {
        let normalized = tag.trim().to_ascii_uppercase().replace(' ', "_");
        match normalized.as_str() {
            "OPINION" => Self::Opinion,
            "ORDER" => Self::Order,
            "ERRATA" => Self::Errata,
            "RULE_36_JUDGMENT" => Self::Rule36Judgment,
            _ => Self::Other,
        }
    }

    /// Canonical uppercase token, as used in constructed document filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opinion => "OPINION",
            Self::Order => "ORDER",
            Self::Errata => "ERRATA",
            Self::Rule36Judgment => "RULE_36_JUDGMENT",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Enriched classification of a decision's subject matter.
///
/// Absent (`None` on the record) means the classifier did not produce a
/// determination; consumers that group by category treat absence as the
/// inclusive default, so classification failures fail open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Patent,
    NonPatent,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patent => "patent",
            Self::NonPatent => "non_patent",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "patent" => Ok(Self::Patent),
            "non_patent" => Ok(Self::NonPatent),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// CaseRecord
// ---------------------------------------------------------------------------

/// One court decision extracted from the feed — the pipeline's unit of work.
///
/// Records are immutable once the parser constructs them; the resolver and
/// the enrichment adapter produce successors via the consuming `with_*`
/// builders rather than mutating a record in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Canonical docket identifier, e.g. "24-1145". Unique within a run.
    pub case_id: String,
    /// Normalized case caption.
    pub title: String,
    /// Short code of the lower tribunal/agency, or [`UNKNOWN_ORIGIN`].
    pub origin: String,
    /// Bracketed kind tag from the entry title.
    pub document_kind: DocumentKind,
    /// Derived from the Precedential/Nonprecedential tokens in the description.
    pub is_precedential: bool,
    /// Issue date, day granularity.
    pub issued_at: NaiveDate,
    /// Resolved absolute document URL; empty when no strategy succeeded.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub document_url: String,
    /// Model-generated summary; absent until enrichment succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Classification; absent until enrichment produces a determination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl CaseRecord {
    /// Successor record with the document URL resolved.
    pub fn with_document_url(mut self, url: impl Into<String>) -> Self {
        self.document_url = url.into();
        self
    }

    /// Successor record with a generated summary attached.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Successor record with a classification attached.
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Whether link resolution produced a document URL for this record.
    pub fn has_document(&self) -> bool {
        !self.document_url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> CaseRecord {
        CaseRecord {
            case_id: "24-1145".into(),
            title: "AORTIC INNOVATIONS LLC v. EDWARDS LIFESCIENCES CORPORATION".into(),
            origin: "DCT".into(),
            document_kind: DocumentKind::Opinion,
            is_precedential: true,
            issued_at: NaiveDate::from_ymd_opt(2025, 10, 27).unwrap(),
            document_url: String::new(),
            summary: None,
            category: None,
        }
    }

    #[test]
    fn kind_tag_normalization() {
        assert_eq!(DocumentKind::from_tag("OPINION"), DocumentKind::Opinion);
        assert_eq!(DocumentKind::from_tag(" order "), DocumentKind::Order);
        assert_eq!(
            DocumentKind::from_tag("Rule 36 Judgment"),
            DocumentKind::Rule36Judgment
        );
        assert_eq!(
            DocumentKind::from_tag("RULE_36_JUDGMENT"),
            DocumentKind::Rule36Judgment
        );
        assert_eq!(DocumentKind::from_tag("SUMMARY AFFIRMANCE"), DocumentKind::Other);
    }

    #[test]
    fn kind_token_matches_filename_convention() {
        assert_eq!(DocumentKind::Rule36Judgment.as_str(), "RULE_36_JUDGMENT");
        assert_eq!(DocumentKind::Opinion.to_string(), "OPINION");
    }

    #[test]
    fn kind_serde_uses_canonical_tokens() {
        let json = serde_json::to_string(&DocumentKind::Rule36Judgment).expect("serialize");
        assert_eq!(json, "\"RULE_36_JUDGMENT\"");
        let parsed: DocumentKind = serde_json::from_str("\"ORDER\"").expect("deserialize");
        assert_eq!(parsed, DocumentKind::Order);
    }

    #[test]
    fn category_roundtrip() {
        let parsed: Category = "non_patent".parse().expect("parse category");
        assert_eq!(parsed, Category::NonPatent);
        assert_eq!(Category::Patent.as_str(), "patent");
        assert!("other".parse::<Category>().is_err());
    }

    #[test]
    fn builders_produce_successors() {
        let record = sample_record()
            .with_document_url("https://example.test/opinions-orders/24-1145.OPINION.pdf")
            .with_summary("Affirmed.")
            .with_category(Category::Patent);

        assert!(record.has_document());
        assert_eq!(record.summary.as_deref(), Some("Affirmed."));
        assert_eq!(record.category, Some(Category::Patent));
        // Parser-owned fields are untouched by the builders.
        assert_eq!(record.case_id, "24-1145");
        assert!(record.is_precedential);
    }

    #[test]
    fn record_serialization_omits_absent_fields() {
        let record = sample_record();
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(!json.contains("document_url"));
        assert!(!json.contains("summary"));
        assert!(!json.contains("category"));

        let parsed: CaseRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, record);
    }
}
