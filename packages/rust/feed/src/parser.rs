//! RSS feed document parsing.
//!
//! Tokenizes the raw feed XML and collects the `title`, `description`,
//! `pubDate`, and `link` children of each `<item>` into a [`FeedEntry`].
//! Descriptions arrive either entity-escaped or wrapped in CDATA; both are
//! decoded to the embedded markup string as published.
//!
//! A tokenizer error mid-document is not fatal to the run: the entries
//! collected before the corrupt point are kept and the remainder is dropped
//! with a warning. Only the feed fetch itself may abort a run.

use quick_xml::Reader;
use quick_xml::events::{BytesText, Event};
use tracing::{debug, warn};

/// One raw `<item>` from the feed, fields as published.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    /// Entry title, e.g. `24-1145: SOME CASE [OPINION]`.
    pub title: String,
    /// Free-form description blob; may contain embedded markup.
    pub description: String,
    /// The entry's permalink.
    pub permalink: String,
    /// Raw `pubDate` text, RFC-822-like with a trailing numeric offset.
    pub published: String,
}

/// Which child of the current `<item>` text content is routed to.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Title,
    Description,
    PubDate,
    Link,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"description" => Some(Self::Description),
            b"pubDate" => Some(Self::PubDate),
            b"link" => Some(Self::Link),
            _ => None,
        }
    }
}

/// Parse a feed document into its raw entries.
pub fn parse_feed(xml: &str) -> Vec<FeedEntry> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries: Vec<FeedEntry> = Vec::new();
    let mut current: Option<FeedEntry> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let name = start.local_name();
                if name.as_ref() == b"item" {
                    current = Some(FeedEntry::default());
                    field = None;
                } else if current.is_some() && field.is_none() {
                    // Channel-level title/link live outside any <item> and
                    // are never routed anywhere.
                    field = Field::from_name(name.as_ref());
                }
            }
            Ok(Event::End(end)) => {
                let name = end.local_name();
                if name.as_ref() == b"item" {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                    field = None;
                } else if current.is_some() && Field::from_name(name.as_ref()) == field {
                    field = None;
                }
            }
            Ok(Event::Text(text)) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    push_field(entry, f, &decode_text(&text));
                }
            }
            Ok(Event::CData(cdata)) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    push_field(entry, f, &String::from_utf8_lossy(&cdata));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(
                    error = %e,
                    entries = entries.len(),
                    "feed XML malformed, keeping entries parsed so far"
                );
                break;
            }
        }
    }

    debug!(entries = entries.len(), "feed document parsed");
    entries
}

/// Append a decoded chunk to the entry field it belongs to.
fn push_field(entry: &mut FeedEntry, field: Field, chunk: &str) {
    let target = match field {
        Field::Title => &mut entry.title,
        Field::Description => &mut entry.description,
        Field::PubDate => &mut entry.published,
        Field::Link => &mut entry.permalink,
    };
    target.push_str(chunk);
}

/// Unescape a text node, falling back to the raw bytes on unknown entities.
fn decode_text(text: &BytesText<'_>) -> String {
    match text.unescape() {
        Ok(s) => s.into_owned(),
        Err(_) => String::from_utf8_lossy(text.as_ref()).into_owned(),
    }
}
