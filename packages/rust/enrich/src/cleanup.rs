//! Cleanup passes for model output.
//!
//! Summaries are rendered into an HTML digest as plain sentences, so any
//! Markdown emphasis the model sneaks in must be stripped to bare words
//! here. Each pass is a function `&str -> String` applied in sequence;
//! double markers run before single ones so `**bold**` never degrades
//! into stray asterisks.

use std::sync::LazyLock;

use regex::Regex;

/// Strip inline emphasis markup from a model-produced summary.
pub(crate) fn clean_summary(text: &str) -> String {
    let mut result = text.to_string();

    result = strip_bold_stars(&result);
    result = strip_italic_stars(&result);
    result = strip_bold_underscores(&result);
    result = strip_italic_underscores(&result);

    result.trim().to_string()
}

fn strip_bold_stars(text: &str) -> String {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex"));
    RE.replace_all(text, "$1").to_string()
}

fn strip_italic_stars(text: &str) -> String {
    static RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*]+)\*").expect("valid regex"));
    RE.replace_all(text, "$1").to_string()
}

fn strip_bold_underscores(text: &str) -> String {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"__([^_]+)__").expect("valid regex"));
    RE.replace_all(text, "$1").to_string()
}

fn strip_italic_underscores(text: &str) -> String {
    static RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_([^_]+)_").expect("valid regex"));
    RE.replace_all(text, "$1").to_string()
}
