//! Feed fetcher with security measures.
//!
//! Downloads a syndication document over HTTP and reads it into
//! [`FetchedEntry`] values. `<rss>` documents of any version are read
//! directly so the publication date reaches the ingestion engine exactly as
//! written; other formats (Atom, RSS 1.0, JSON Feed) go through feed-rs.

use std::net::IpAddr;
use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use tracing::debug;

use crate::config::FetchConfig;
use crate::ingest::FeedSource;
use crate::rss::types::FetchedEntry;

/// User agent string for feed fetching.
const USER_AGENT: &str = "Scrapper/0.1 (Feed Reader)";

/// Errors raised while fetching or reading a feed document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The URL is malformed or points somewhere we refuse to go.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Connection, TLS or transfer failure.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP error: {0}")]
    Status(u16),

    /// The document exceeds the configured size limit.
    #[error("feed too large (max {max} bytes)")]
    TooLarge {
        /// Configured limit in bytes.
        max: u64,
    },

    /// The body is not a readable feed document.
    #[error("failed to parse feed: {0}")]
    Parse(String),

    /// The request did not finish in time.
    #[error("fetch timed out")]
    Timeout,

    /// The HTTP client could not be built.
    #[error("failed to create HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// HTTP feed fetcher.
pub struct RssFetcher {
    client: reqwest::Client,
    max_feed_size: u64,
    max_items: usize,
    max_description_length: usize,
    allow_private_hosts: bool,
}

impl RssFetcher {
    /// Create a fetcher from configuration.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
            max_items: config.max_items_per_feed,
            max_description_length: config.max_description_length,
            allow_private_hosts: config.allow_private_hosts,
        })
    }

    /// Fetch the document at `url` and return its entries in document order.
    ///
    /// Entries without a link are dropped. Publication dates are not
    /// interpreted here.
    pub async fn fetch(&self, url: &str) -> Result<Vec<FetchedEntry>, FetchError> {
        validate_url(url, self.allow_private_hosts)?;

        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_feed_size {
                return Err(FetchError::TooLarge {
                    max: self.max_feed_size,
                });
            }
        }

        // Content-Length may be absent or wrong, so enforce the limit while reading.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if (body.len() + chunk.len()) as u64 > self.max_feed_size {
                return Err(FetchError::TooLarge {
                    max: self.max_feed_size,
                });
            }
            body.extend_from_slice(&chunk);
        }

        let entries = self.parse_document(&body)?;
        debug!(url, entries = entries.len(), "Fetched feed document");
        Ok(entries)
    }

    /// Read a feed document into entries.
    pub fn parse_document(&self, bytes: &[u8]) -> Result<Vec<FetchedEntry>, FetchError> {
        let rss = match std::str::from_utf8(bytes) {
            Ok(text) => parse_rss(text)?,
            Err(_) => None,
        };
        let raw = match rss {
            Some(entries) => entries,
            None => parse_with_feed_rs(bytes)?,
        };

        Ok(raw
            .into_iter()
            .filter_map(|entry| self.finish_entry(entry))
            .take(self.max_items)
            .collect())
    }

    fn finish_entry(&self, entry: FetchedEntry) -> Option<FetchedEntry> {
        let link = entry.link.trim();
        if link.is_empty() {
            debug!(title = %entry.title, "Dropping feed entry without a link");
            return None;
        }

        Some(FetchedEntry {
            title: entry.title.trim().to_string(),
            link: link.to_string(),
            description: truncate(&strip_html(&entry.description), self.max_description_length),
            pub_date: entry.pub_date.trim().to_string(),
        })
    }
}

impl FeedSource for RssFetcher {
    async fn fetch_entries(&self, url: &str) -> Result<Vec<FetchedEntry>, FetchError> {
        self.fetch(url).await
    }
}

/// Direct child of `<item>` that becomes part of a [`FetchedEntry`].
///
/// Names are compared exactly, so prefixed twins such as `itunes:title` or
/// `dc:date` are ignored.
#[derive(Debug, Clone, Copy)]
enum ItemField {
    Title,
    Link,
    Description,
    PubDate,
}

impl ItemField {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"link" => Some(Self::Link),
            b"description" => Some(Self::Description),
            b"pubDate" => Some(Self::PubDate),
            _ => None,
        }
    }

    fn slot(self, entry: &mut FetchedEntry) -> &mut String {
        match self {
            Self::Title => &mut entry.title,
            Self::Link => &mut entry.link,
            Self::Description => &mut entry.description,
            Self::PubDate => &mut entry.pub_date,
        }
    }
}

/// Read an `<rss>` document of any version, keeping `pubDate` verbatim.
///
/// Returns `Ok(None)` when the root element is not `rss`, so the caller can
/// try other formats.
fn parse_rss(text: &str) -> Result<Option<Vec<FetchedEntry>>, FetchError> {
    let mut reader = Reader::from_str(text);

    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut is_rss = false;
    let mut saw_channel = false;
    let mut in_channel = false;
    let mut item: Option<FetchedEntry> = None;
    let mut field: Option<ItemField> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) if is_rss => return Err(FetchError::Parse(e.to_string())),
            Err(_) => return Ok(None),
        };

        match event {
            Event::Start(e) => {
                depth += 1;
                let name = e.name();
                match depth {
                    1 if name.as_ref() != b"rss" => return Ok(None),
                    1 => is_rss = true,
                    2 if name.as_ref() == b"channel" => {
                        saw_channel = true;
                        in_channel = true;
                    }
                    3 if in_channel && name.as_ref() == b"item" => {
                        item = Some(FetchedEntry::new("", "", "", ""));
                    }
                    4 if item.is_some() => field = ItemField::from_name(name.as_ref()),
                    _ => {}
                }
            }
            Event::Empty(e) if depth == 0 => {
                if e.name().as_ref() != b"rss" {
                    return Ok(None);
                }
                is_rss = true;
            }
            Event::Empty(e) if depth == 1 && e.name().as_ref() == b"channel" => {
                saw_channel = true;
            }
            Event::Text(t) => {
                if let (Some(entry), Some(field)) = (item.as_mut(), field) {
                    match t.unescape() {
                        Ok(text) => field.slot(entry).push_str(&text),
                        Err(_) => field.slot(entry).push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Event::CData(c) => {
                if let (Some(entry), Some(field)) = (item.as_mut(), field) {
                    field.slot(entry).push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                match depth {
                    4 => field = None,
                    3 => entries.extend(item.take()),
                    2 => in_channel = false,
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !is_rss {
        return Ok(None);
    }
    if !saw_channel {
        return Err(FetchError::Parse("RSS document has no channel".to_string()));
    }
    Ok(Some(entries))
}

/// Read any format feed-rs understands.
///
/// feed-rs hands back parsed timestamps, so they are rendered as RFC 3339.
fn parse_with_feed_rs(bytes: &[u8]) -> Result<Vec<FetchedEntry>, FetchError> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| FetchError::Parse(e.to_string()))?;

    Ok(feed
        .entries
        .into_iter()
        .map(|entry| FetchedEntry {
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            link: entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default(),
            description: entry
                .summary
                .map(|t| t.content)
                .or(entry.content.and_then(|c| c.body))
                .unwrap_or_default(),
            pub_date: entry
                .published
                .or(entry.updated)
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_default(),
        })
        .collect())
}

/// Validate a feed URL.
///
/// Only http and https are accepted. Unless `allow_private` is set, loopback,
/// private and reserved hosts are rejected.
pub fn validate_url(url: &str, allow_private: bool) -> Result<(), FetchError> {
    let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl(format!(
            "unsupported URL scheme: {}",
            parsed.scheme()
        )));
    }

    let host = parsed
        .host()
        .ok_or_else(|| FetchError::InvalidUrl("URL has no host".to_string()))?;

    if allow_private {
        return Ok(());
    }

    let ip = match host {
        url::Host::Domain(domain) => {
            if is_forbidden_hostname(domain) {
                return Err(FetchError::InvalidUrl(format!("forbidden host: {domain}")));
            }
            return Ok(());
        }
        url::Host::Ipv4(v4) => IpAddr::V4(v4),
        url::Host::Ipv6(v6) => IpAddr::V6(v6),
    };

    if is_private_ip(&ip) {
        return Err(FetchError::InvalidUrl(format!(
            "private IP address not allowed: {ip}"
        )));
    }
    Ok(())
}

fn is_forbidden_hostname(host: &str) -> bool {
    const SUFFIXES: &[&str] = &[
        ".local",
        ".localhost",
        ".internal",
        ".intranet",
        ".corp",
        ".home",
        ".lan",
    ];

    let host = host.to_ascii_lowercase();
    host == "localhost" || SUFFIXES.iter().any(|s| host.ends_with(s))
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || (a, b, c) == (192, 0, 2)
                || (a, b, c) == (198, 51, 100)
                || (a, b, c) == (203, 0, 113)
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local
                || (first & 0xfe00) == 0xfc00
                // fe80::/10 link local
                || (first & 0xffc0) == 0xfe80
        }
    }
}

/// Strip HTML tags and decode common entities, collapsing whitespace.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut entity: Option<String> = None;

    for ch in html.chars() {
        if in_tag {
            if ch == '>' {
                in_tag = false;
                out.push(' ');
            }
            continue;
        }

        if let Some(name) = entity.as_mut() {
            if ch == ';' {
                push_entity(&mut out, name);
                entity = None;
            } else if ch.is_ascii_alphanumeric() || ch == '#' {
                name.push(ch);
            } else {
                // Not an entity after all.
                out.push('&');
                out.push_str(name);
                entity = None;
                if ch == '<' {
                    in_tag = true;
                } else {
                    out.push(ch);
                }
            }
            continue;
        }

        match ch {
            '<' => in_tag = true,
            '&' => entity = Some(String::new()),
            _ => out.push(ch),
        }
    }

    if let Some(name) = entity {
        out.push('&');
        out.push_str(&name);
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_entity(out: &mut String, name: &str) {
    let decoded = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => name
            .strip_prefix("#x")
            .or_else(|| name.strip_prefix("#X"))
            .map(|hex| u32::from_str_radix(hex, 16).ok())
            .unwrap_or_else(|| name.strip_prefix('#').and_then(|dec| dec.parse().ok()))
            .and_then(char::from_u32),
    };

    match decoded {
        Some(c) => out.push(c),
        None => {
            out.push('&');
            out.push_str(name);
            out.push(';');
        }
    }
}

/// Truncate text to at most `max` characters.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
