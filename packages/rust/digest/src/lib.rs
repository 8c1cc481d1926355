//! Digest rendering and delivery.
//!
//! [`render_digest`] turns a day's record set into a self-contained HTML
//! email body; [`DeliverySink`] is the transport seam the pipeline hands
//! that body to. SMTP is the production sink, a file sink backs dry runs.

pub mod delivery;
pub mod render;

pub use delivery::{DeliverySink, FileSink, SmtpSink};
pub use render::{RenderedDigest, render_digest};
