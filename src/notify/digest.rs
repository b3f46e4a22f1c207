//! Digest rendering.

use chrono::{DateTime, Utc};

use crate::datetime::{format_utc_datetime, DIGEST_DATE_FORMAT};
use crate::rss::FeedItem;

/// Footer timestamp format ("Mon, 02 Jan 2006 15:04:05 UTC").
const SENT_AT_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %Z";

/// Entry separator in the plain-text body.
const TEXT_SEPARATOR_WIDTH: usize = 50;

/// A rendered digest message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub text: String,
    /// HTML body.
    pub html: String,
}

impl Digest {
    /// Render the digest for one subscriber.
    ///
    /// Dates are shown in `timezone`; unknown zone names fall back to UTC.
    pub fn render(
        recipient: &str,
        feed_name: &str,
        entries: &[FeedItem],
        timezone: &str,
        sent_at: DateTime<Utc>,
    ) -> Self {
        let sent_on = format_utc_datetime(&sent_at, timezone, SENT_AT_FORMAT);

        Self {
            subject: format!("New Items in Your Followed Feed: {feed_name}"),
            text: render_text(recipient, feed_name, entries, timezone, &sent_on),
            html: render_html(recipient, feed_name, entries, timezone, &sent_on),
        }
    }
}

fn render_text(
    recipient: &str,
    feed_name: &str,
    entries: &[FeedItem],
    timezone: &str,
    sent_on: &str,
) -> String {
    let separator = format!("{}\n", "-".repeat(TEXT_SEPARATOR_WIDTH));
    let items = entries
        .iter()
        .map(|item| {
            format!(
                "{}\n{}\nPublished: {}\n{}\n",
                item.title,
                item.link,
                format_utc_datetime(&item.published_at, timezone, DIGEST_DATE_FORMAT),
                item.description
            )
        })
        .collect::<Vec<_>>()
        .join(&separator);

    format!(
        "Hello {recipient},\n\n\
         We found {count} new item(s) in the feed \"{feed_name}\" that you follow:\n\n\
         {items}\n\n\
         Keep up with the latest updates by visiting your dashboard!\n\n\
         Sent on {sent_on}\n\
         Scrapper",
        count = entries.len(),
    )
}

fn render_html(
    recipient: &str,
    feed_name: &str,
    entries: &[FeedItem],
    timezone: &str,
    sent_on: &str,
) -> String {
    let feed_name = escape_html(feed_name);
    let items = entries
        .iter()
        .map(|item| {
            format!(
                "<li style=\"margin-bottom: 10px;\">\
                 <a href=\"{}\" style=\"color: #0066cc; font-weight: 600;\">{}</a>\
                 <p style=\"color: #666666; margin: 5px 0 0 0;\">{}</p>\
                 <p style=\"color: #888888; font-size: 12px; margin: 5px 0 0 0;\">Published: {}</p>\
                 </li>",
                escape_html(&item.link),
                escape_html(&item.title),
                escape_html(&item.description),
                format_utc_datetime(&item.published_at, timezone, DIGEST_DATE_FORMAT),
            )
        })
        .collect::<Vec<_>>()
        .join("<hr style=\"border: 0; border-top: 1px solid #eeeeee; margin: 10px 0;\" />");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Feed Update Notification</title></head>
<body style="font-family: sans-serif; background-color: #f4f4f9;">
<div style="max-width: 600px; margin: 20px auto; background-color: #ffffff;">
<h1 style="background-color: #0066cc; color: #ffffff; padding: 20px; font-size: 24px;">New Items in {feed_name}</h1>
<div style="padding: 30px; color: #333333;">
<p>Hello {recipient},</p>
<p>We found {count} new item(s) in the feed <strong>{feed_name}</strong> that you follow:</p>
<ul style="list-style: none; padding: 0;">{items}</ul>
<p>Keep up with the latest updates by visiting your dashboard!</p>
</div>
<p style="text-align: center; font-size: 12px; color: #666666;">Sent on {sent_on}<br>Scrapper</p>
</div>
</body>
</html>"#,
        recipient = escape_html(recipient),
        count = entries.len(),
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
