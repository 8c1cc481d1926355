//! LLM enrichment of case records.
//!
//! The [`Enricher`] fetches each record's decision document, extracts its
//! text, and asks a chat model for a short summary and a patent-relatedness
//! classification.
//!
//! **Contract:** enrichment never blocks delivery. Every failure mode
//! (missing document, fetch error, image-only PDF, model error, timeout)
//! returns the record unchanged; a failed classification leaves `category`
//! absent and rendering decides what absence means.

mod cleanup;
mod document;
mod llm;

use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use docketwatch_shared::{
    CaseRecord, Category, DocketwatchError, EnrichmentConfig, Result, resolve_api_key,
};

use crate::llm::ChatClient;

const USER_AGENT: &str = concat!("docketwatch/", env!("CARGO_PKG_VERSION"));

const SUMMARY_MAX_TOKENS: u32 = 400;
const CLASSIFY_MAX_TOKENS: u32 = 8;

const SUMMARY_SYSTEM_PROMPT: &str = "You are a legal analyst covering the United States Court of \
     Appeals for the Federal Circuit. You write tight, accurate summaries for practitioners.";

const CLASSIFY_SYSTEM_PROMPT: &str =
    "You classify Federal Circuit decisions. Answer with a single word: yes or no.";

// ---------------------------------------------------------------------------
// Classification outcome
// ---------------------------------------------------------------------------

/// Three-valued outcome of the patent-relatedness classification.
///
/// An unparseable model reply is a distinct state, not a guess in either
/// direction; it maps to an absent category downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relevance {
    Included,
    Excluded,
    Undetermined,
}

impl Relevance {
    /// Parse a model reply by its first token.
    fn parse(reply: &str) -> Self {
        let first = reply
            .split_whitespace()
            .next()
            .unwrap_or("")
            .trim_matches(|c: char| !c.is_ascii_alphabetic())
            .to_ascii_lowercase();

        match first.as_str() {
            "yes" => Self::Included,
            "no" => Self::Excluded,
            _ => Self::Undetermined,
        }
    }

    fn into_category(self) -> Option<Category> {
        match self {
            Self::Included => Some(Category::Patent),
            Self::Excluded => Some(Category::NonPatent),
            Self::Undetermined => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

/// Compute the cache key for what would be asked of the model for `record`.
///
/// The document URL stands in for the document content (published PDFs are
/// immutable), and the system prompts are folded in so prompt changes
/// invalidate old cache entries. The model id is keyed separately.
pub fn prompt_hash(record: &CaseRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.case_id.as_bytes());
    hasher.update(b"|");
    hasher.update(record.document_url.as_bytes());
    hasher.update(b"|");
    hasher.update(SUMMARY_SYSTEM_PROMPT.as_bytes());
    hasher.update(CLASSIFY_SYSTEM_PROMPT.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Per-record enrichment: document fetch, text extraction, summary, and
/// classification, all behind one fail-open entry point.
pub struct Enricher {
    client: ChatClient,
    http: reqwest::Client,
    max_document_chars: usize,
}

impl Enricher {
    /// Build with an explicit API key, bypassing environment lookup.
    pub fn new(config: &EnrichmentConfig, api_key: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DocketwatchError::enrichment(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client: ChatClient::new(http.clone(), config, api_key),
            http,
            max_document_chars: config.max_document_chars,
        })
    }

    /// Build from config. Returns `Ok(None)` when enrichment is disabled or
    /// the key env var is unset; the pipeline then runs without enrichment.
    pub fn from_config(config: &EnrichmentConfig) -> Result<Option<Self>> {
        if !config.enabled {
            info!("enrichment disabled by config");
            return Ok(None);
        }

        match resolve_api_key(config) {
            Some(api_key) => Ok(Some(Self::new(config, api_key)?)),
            None => {
                warn!(
                    var = %config.api_key_env,
                    "enrichment API key not set; records will go out unenriched"
                );
                Ok(None)
            }
        }
    }

    /// Model identifier used for cache keying and logging.
    pub fn model_id(&self) -> &str {
        self.client.model()
    }

    /// Enrich one record, returning it unchanged on any failure.
    #[instrument(skip_all, fields(case_id = %record.case_id))]
    pub async fn enrich(&self, record: CaseRecord) -> CaseRecord {
        if !record.has_document() {
            debug!("no document URL; nothing to enrich");
            return record;
        }

        let text = match self.document_text(&record.document_url).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "document unavailable; record goes out unenriched");
                return record;
            }
        };

        let summary = match self.summarize(&record, &text).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "summarization failed; record goes out unenriched");
                return record;
            }
        };

        let category = match self.classify(&record, &text).await {
            Ok(relevance) => relevance.into_category(),
            Err(e) => {
                warn!(error = %e, "classification failed; category left undetermined");
                None
            }
        };

        let record = record.with_summary(summary);
        match category {
            Some(category) => record.with_category(category),
            None => record,
        }
    }

    async fn document_text(&self, url: &str) -> Result<String> {
        let bytes = document::fetch_document(&self.http, url).await?;
        document::extract_document_text(&bytes, self.max_document_chars)
    }

    async fn summarize(&self, record: &CaseRecord, text: &str) -> Result<String> {
        let user = format!(
            "Summarize the following decision in 2-3 sentences covering the legal issue, \
             the holding, and its practical significance. Respond with plain prose only.\n\n\
             Case: {} ({})\n\n{}",
            record.title, record.case_id, text
        );
        let reply = self
            .client
            .complete(SUMMARY_SYSTEM_PROMPT, &user, SUMMARY_MAX_TOKENS)
            .await?;
        Ok(cleanup::clean_summary(&reply))
    }

    async fn classify(&self, record: &CaseRecord, text: &str) -> Result<Relevance> {
        let user = format!(
            "Is the following decision primarily about patent law (infringement, validity, \
             claim construction, or appeals from the PTAB in patent matters)? \
             Answer yes or no.\n\nCase: {}\n\n{}",
            record.title, text
        );
        let reply = self
            .client
            .complete(CLASSIFY_SYSTEM_PROMPT, &user, CLASSIFY_MAX_TOKENS)
            .await?;
        Ok(Relevance::parse(&reply))
    }
}
