//! Decision document retrieval and text extraction.
//!
//! Court decisions are published as PDFs. The payload is fetched as opaque
//! bytes, text-extracted in memory, and truncated to the configured budget
//! before prompting. A near-empty extraction means a scanned, image-only
//! PDF; there is no OCR here, so that counts as an extraction failure.

use docketwatch_shared::{DocketwatchError, Result};
use tracing::debug;

/// Extractions shorter than this are image-only PDFs in practice.
pub(crate) const MIN_TEXT_CHARS: usize = 100;

/// Fetch the document at `url` as raw bytes.
pub(crate) async fn fetch_document(http: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| DocketwatchError::enrichment(format!("document fetch failed for {url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DocketwatchError::enrichment(format!(
            "document fetch for {url} returned {status}"
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| DocketwatchError::enrichment(format!("document body read failed for {url}: {e}")))?;

    debug!(url, bytes = bytes.len(), "fetched document");
    Ok(bytes.to_vec())
}

/// Extract plain text from in-memory PDF bytes, truncated to `max_chars`.
pub(crate) fn extract_document_text(bytes: &[u8], max_chars: usize) -> Result<String> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| DocketwatchError::enrichment(format!("pdf text extraction failed: {e}")))?;

    let text = text.trim();
    if text.chars().count() < MIN_TEXT_CHARS {
        return Err(DocketwatchError::enrichment(format!(
            "extracted only {} chars; document appears to be image-only",
            text.chars().count()
        )));
    }

    Ok(truncate_text(text, max_chars))
}

/// Truncate to approximately `max_chars`, backing up to a char boundary.
fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.len() <= max_chars {
        return text.to_string();
    }

    let mut end = max_chars;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}\n\n[... document truncated for model context ...]",
        &text[..end]
    )
}
