//! Delivery sinks.
//!
//! The pipeline treats delivery as a black box that either confirms or
//! fails; the ledger commit hangs on that answer, so a sink must not
//! report success until the payload has actually left its hands.

use std::path::PathBuf;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, instrument};

use docketwatch_shared::{DeliveryConfig, DocketwatchError, Result, resolve_smtp_password};

use crate::render::RenderedDigest;

/// Transport seam between the pipeline and the outside world.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, digest: &RenderedDigest, recipients: &[String]) -> Result<()>;
}

// ---------------------------------------------------------------------------
// SMTP sink
// ---------------------------------------------------------------------------

/// SMTP delivery over a STARTTLS relay.
#[derive(Debug)]
pub struct SmtpSink {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpSink {
    /// Build from config. Credentials are resolved exactly once, here;
    /// nothing downstream reads the environment.
    pub fn from_config(config: &DeliveryConfig) -> Result<Self> {
        if config.from_address.is_empty() {
            return Err(DocketwatchError::config("delivery.from_address is not set"));
        }
        let password = resolve_smtp_password(config)?;

        let from: Mailbox = format!("CAFC Decisions Bot <{}>", config.from_address)
            .parse()
            .map_err(|e| DocketwatchError::config(format!("invalid from_address: {e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| DocketwatchError::delivery(format!("SMTP relay setup failed: {e}")))?
            .port(config.smtp_port)
            .credentials(Credentials::new(config.from_address.clone(), password))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl DeliverySink for SmtpSink {
    #[instrument(skip_all, fields(recipients = recipients.len()))]
    async fn deliver(&self, digest: &RenderedDigest, recipients: &[String]) -> Result<()> {
        let to = parse_recipients(recipients)?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(digest.subject.as_str())
            .header(ContentType::TEXT_HTML);
        for mailbox in to {
            builder = builder.to(mailbox);
        }

        let message = builder
            .body(digest.html.clone())
            .map_err(|e| DocketwatchError::delivery(format!("message build failed: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| DocketwatchError::delivery(format!("SMTP send failed: {e}")))?;

        info!(subject = %digest.subject, "digest delivered");
        Ok(())
    }
}

fn parse_recipients(recipients: &[String]) -> Result<Vec<Mailbox>> {
    if recipients.is_empty() {
        return Err(DocketwatchError::delivery("no recipients configured"));
    }
    recipients
        .iter()
        .map(|r| {
            r.parse::<Mailbox>()
                .map_err(|e| DocketwatchError::delivery(format!("invalid recipient {r}: {e}")))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// File sink
// ---------------------------------------------------------------------------

/// Writes the digest HTML to a local file. Backs `--dry-run` and output
/// inspection; recipients are ignored.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DeliverySink for FileSink {
    async fn deliver(&self, digest: &RenderedDigest, _recipients: &[String]) -> Result<()> {
        tokio::fs::write(&self.path, &digest.html)
            .await
            .map_err(|e| DocketwatchError::io(&self.path, e))?;
        info!(path = %self.path.display(), subject = %digest.subject, "digest written to file");
        Ok(())
    }
}
