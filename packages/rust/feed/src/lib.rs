//! Feed ingestion: fetching the court's decision feed, parsing entries into
//! case records, and resolving each record's document URL.
//!
//! The three stages are deliberately separate:
//! - [`client`] fetches raw feed XML and nothing else
//! - [`parser`] tokenizes the XML into [`FeedEntry`] values and [`record`]
//!   turns one entry into a [`CaseRecord`](docketwatch_shared::CaseRecord)
//!   (or skips it)
//! - [`resolver`] derives the document URL from the entry's raw metadata
//!   via an ordered list of named strategies

pub mod client;
pub mod parser;
pub mod record;
pub mod resolver;

pub use client::FeedClient;
pub use parser::{FeedEntry, parse_feed};
pub use record::parse_record;
pub use resolver::resolve_document_url;
