//! HTTP client for the decision feed.
//!
//! Fetches the raw feed document and nothing else. Network faults, timeouts,
//! and non-success statuses all surface as fetch errors, which are the one
//! failure class that aborts a whole pipeline run. Retry policy, if any,
//! belongs to the orchestrator, not here.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

use docketwatch_shared::{DocketwatchError, FeedConfig, Result};

/// Maximum number of redirects to follow when fetching the feed.
const MAX_REDIRECTS: usize = 3;

/// User-Agent string for feed and document requests.
const USER_AGENT: &str = concat!("docketwatch/", env!("CARGO_PKG_VERSION"));

/// HTTP client bound to a single feed URL.
pub struct FeedClient {
    http: Client,
    feed_url: Url,
}

impl FeedClient {
    /// Build a client from feed configuration.
    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        let feed_url = Url::parse(&config.url).map_err(|e| {
            DocketwatchError::config(format!("invalid feed url {:?}: {e}", config.url))
        })?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DocketwatchError::fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, feed_url })
    }

    /// The feed URL this client polls.
    pub fn feed_url(&self) -> &Url {
        &self.feed_url
    }

    /// Fetch the raw feed document.
    #[instrument(skip_all, fields(url = %self.feed_url))]
    pub async fn fetch(&self) -> Result<String> {
        debug!("fetching feed");

        let response = self
            .http
            .get(self.feed_url.clone())
            .send()
            .await
            .map_err(|e| DocketwatchError::fetch(format!("{}: {e}", self.feed_url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocketwatchError::fetch(format!(
                "{}: HTTP {status}",
                self.feed_url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| {
                DocketwatchError::fetch(format!("{}: failed to read body: {e}", self.feed_url))
            })?;

        info!(bytes = body.len(), "feed fetched");
        Ok(body)
    }
}
