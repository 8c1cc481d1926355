//! Application configuration for docketwatch.
//!
//! User config lives at `~/.docketwatch/docketwatch.toml`.
//! CLI flags override config file values, which override defaults.
//!
//! Secrets never live in the file: config stores the *names* of the env
//! vars holding the OpenRouter API key and the SMTP password, and the
//! resolvers below read them exactly once at process start. Pipeline code
//! never touches the environment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DocketwatchError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docketwatch.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docketwatch";

/// Default ledger database file name, stored in the config directory.
const LEDGER_DB_FILE_NAME: &str = "docketwatch.db";

// ---------------------------------------------------------------------------
// Config structs (matching docketwatch.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Feed source settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Delivery ledger settings.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Summarization/classification settings.
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Digest delivery settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// `[feed]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Feed URL to poll.
    #[serde(default = "default_feed_url")]
    pub url: String,

    /// Host the court serves decision documents from; anchor paths and
    /// reconstructed filenames are resolved against it.
    #[serde(default = "default_document_host")]
    pub document_host: String,

    /// HTTP timeout for the feed fetch, in seconds.
    #[serde(default = "default_feed_timeout_secs")]
    pub timeout_secs: u64,

    /// Only decisions issued within the last N days are considered.
    #[serde(default = "default_window_days")]
    pub window_days: i64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            document_host: default_document_host(),
            timeout_secs: default_feed_timeout_secs(),
            window_days: default_window_days(),
        }
    }
}

impl FeedConfig {
    /// Parse the configured document host into a URL.
    pub fn document_host_url(&self) -> Result<Url> {
        Url::parse(&self.document_host).map_err(|e| {
            DocketwatchError::config(format!(
                "invalid document_host {:?}: {e}",
                self.document_host
            ))
        })
    }
}

fn default_feed_url() -> String {
    "https://www.cafc.uscourts.gov/category/opinion-order/feed/".into()
}
fn default_document_host() -> String {
    "https://www.cafc.uscourts.gov".into()
}
fn default_feed_timeout_secs() -> u64 {
    30
}
fn default_window_days() -> i64 {
    30
}

/// `[ledger]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Override path for the ledger database file.
    /// Defaults to `docketwatch.db` inside the config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

impl LedgerConfig {
    /// The effective database path, creating no directories.
    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => Ok(config_dir()?.join(LEDGER_DB_FILE_NAME)),
        }
    }
}

/// `[enrichment]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Master switch; when false the pipeline emits unenriched records.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// OpenAI-compatible API base URL.
    #[serde(default = "default_enrichment_base_url")]
    pub base_url: String,

    /// Model to use for summaries and classification.
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-call HTTP timeout, in seconds (document fetch and model calls).
    #[serde(default = "default_enrichment_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum concurrent enrichment calls.
    #[serde(default = "default_enrichment_concurrency")]
    pub concurrency: usize,

    /// Extracted document text is truncated to this length before prompting.
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key_env: default_api_key_env(),
            base_url: default_enrichment_base_url(),
            model: default_model(),
            timeout_secs: default_enrichment_timeout_secs(),
            concurrency: default_enrichment_concurrency(),
            max_document_chars: default_max_document_chars(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_enrichment_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_enrichment_timeout_secs() -> u64 {
    30
}
fn default_enrichment_concurrency() -> usize {
    2
}
fn default_max_document_chars() -> usize {
    50_000
}

/// `[delivery]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// SMTP relay host.
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    /// SMTP relay port (STARTTLS).
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// Sender address; also used as the SMTP username.
    #[serde(default)]
    pub from_address: String,

    /// Name of the env var holding the SMTP password.
    #[serde(default = "default_smtp_password_env")]
    pub password_env: String,

    /// Digest recipients.
    #[serde(default)]
    pub recipients: Vec<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            from_address: String::new(),
            password_env: default_smtp_password_env(),
            recipients: Vec::new(),
        }
    }
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".into()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_smtp_password_env() -> String {
    "DOCKETWATCH_SMTP_PASSWORD".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docketwatch/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocketwatchError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docketwatch/docketwatch.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocketwatchError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocketwatchError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocketwatchError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocketwatchError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocketwatchError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

// ---------------------------------------------------------------------------
// Secret resolution (called once at process start)
// ---------------------------------------------------------------------------

/// Read the enrichment API key from the env var named in config.
///
/// `None` disables enrichment for the run; the pipeline degrades to
/// unenriched records rather than failing.
pub fn resolve_api_key(config: &EnrichmentConfig) -> Option<String> {
    std::env::var(&config.api_key_env)
        .ok()
        .filter(|val| !val.trim().is_empty())
}

/// Read the SMTP password from the env var named in config.
///
/// Unlike the API key this is required: a digest run without delivery
/// credentials cannot do its job.
pub fn resolve_smtp_password(config: &DeliveryConfig) -> Result<String> {
    let var_name = &config.password_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(DocketwatchError::config(format!(
            "SMTP password not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("cafc.uscourts.gov"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
        assert!(toml_str.contains("smtp.gmail.com"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.feed.window_days, 30);
        assert_eq!(parsed.delivery.smtp_port, 587);
        assert_eq!(parsed.enrichment.max_document_chars, 50_000);
        assert!(parsed.enrichment.enabled);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[feed]
window_days = 7

[delivery]
from_address = "digest@example.com"
recipients = ["a@example.com", "b@example.com"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.feed.window_days, 7);
        assert_eq!(config.feed.timeout_secs, 30);
        assert_eq!(config.delivery.recipients.len(), 2);
        assert_eq!(config.delivery.smtp_host, "smtp.gmail.com");
    }

    #[test]
    fn document_host_parses() {
        let feed = FeedConfig::default();
        let host = feed.document_host_url().expect("parse default host");
        assert_eq!(host.host_str(), Some("www.cafc.uscourts.gov"));

        let bad = FeedConfig {
            document_host: "not a url".into(),
            ..FeedConfig::default()
        };
        assert!(bad.document_host_url().is_err());
    }

    #[test]
    fn db_path_override_wins() {
        let ledger = LedgerConfig {
            db_path: Some(PathBuf::from("/tmp/custom.db")),
        };
        assert_eq!(
            ledger.resolved_db_path().expect("resolve"),
            PathBuf::from("/tmp/custom.db")
        );
    }

    #[test]
    fn missing_api_key_resolves_to_none() {
        let config = EnrichmentConfig {
            // Unique env var name to avoid interfering with other tests
            api_key_env: "DW_TEST_NONEXISTENT_KEY_12345".into(),
            ..EnrichmentConfig::default()
        };
        assert!(resolve_api_key(&config).is_none());
    }

    #[test]
    fn missing_smtp_password_is_an_error() {
        let config = DeliveryConfig {
            password_env: "DW_TEST_NONEXISTENT_SMTP_12345".into(),
            ..DeliveryConfig::default()
        };
        let result = resolve_smtp_password(&config);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("DW_TEST_NONEXISTENT_SMTP_12345")
        );
    }
}
