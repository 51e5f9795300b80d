//! Renders an [`Email`] as an RFC 5322 message with MIME structure.
//!
//! The part tree mirrors what mail clients expect:
//!
//! ```text
//! multipart/mixed
//! ├── multipart/related
//! │   ├── multipart/alternative
//! │   │   ├── text/plain
//! │   │   └── text/html
//! │   └── inline images (Content-ID)
//! ├── attachments
//! └── message/rfc822 (forwarded original)
//! ```
//!
//! Containers holding a single child are collapsed into that child.

use std::{
    io::Write,
    sync::atomic::{AtomicU64, Ordering},
};

use missive_common::{
    AttachmentResource, ConvertError, Recipient, RecipientType,
    encoding::{base64_wrapped, contains_control, encode_text, escape_quoted, is_header_name},
};

use super::{MimeMessage, parse::is_structural};
use crate::Email;

/// Lines longer than this are not allowed in 7bit content.
const MAX_LINE_LENGTH: usize = 998;

static UNIQUE: AtomicU64 = AtomicU64::new(0);

enum Part<'a> {
    Text {
        subtype: &'static str,
        body: &'a str,
    },
    Resource {
        resource: &'a AttachmentResource,
        inline: bool,
    },
    Message(&'a MimeMessage),
    Multipart {
        subtype: &'static str,
        parts: Vec<Part<'a>>,
    },
}

impl<'a> Part<'a> {
    /// Wraps `parts` in a container, collapsing trivial containers.
    fn container(subtype: &'static str, mut parts: Vec<Self>) -> Option<Self> {
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Self::Multipart { subtype, parts }),
        }
    }

    fn tree(email: &'a Email) -> Self {
        let alternative = email
            .text
            .as_deref()
            .map(|body| Self::Text {
                subtype: "plain",
                body,
            })
            .into_iter()
            .chain(email.text_html.as_deref().map(|body| Self::Text {
                subtype: "html",
                body,
            }))
            .collect();

        let related = Self::container("alternative", alternative)
            .into_iter()
            .chain(email.embedded_images.iter().map(|resource| Self::Resource {
                resource,
                inline: true,
            }))
            .collect();

        let mixed = Self::container("related", related)
            .into_iter()
            .chain(email.attachments.iter().map(|resource| Self::Resource {
                resource,
                inline: false,
            }))
            .chain(email.email_to_forward.as_ref().map(Self::Message))
            .collect();

        Self::container("mixed", mixed).unwrap_or(Self::Text {
            subtype: "plain",
            body: "",
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<(), ConvertError> {
        match self {
            Self::Text { subtype, body } => {
                write!(out, "Content-Type: text/{subtype}; charset=utf-8\r\n")?;
                write_body(out, body.as_bytes(), is_7bit(body))?;
            }
            Self::Resource { resource, inline } => {
                let source = resource.data_source();
                let name = resource.name().map(parameter);
                let name = name.as_deref();

                match name {
                    Some(name) => write!(
                        out,
                        "Content-Type: {}; name=\"{}\"\r\n",
                        source.content_type(),
                        name
                    )?,
                    None => write!(out, "Content-Type: {}\r\n", source.content_type())?,
                }

                if *inline {
                    if let Some(name) = name {
                        write!(out, "Content-ID: <{name}>\r\n")?;
                    }
                    write_disposition(out, "inline", name)?;
                } else {
                    write_disposition(out, "attachment", name)?;
                }

                write_body(out, source.data(), false)?;
            }
            Self::Message(message) => {
                write!(out, "Content-Type: message/rfc822\r\n")?;
                write!(out, "\r\n")?;
                out.extend_from_slice(message.as_bytes());
            }
            Self::Multipart { subtype, parts } => {
                let boundary = generate_boundary();
                write!(
                    out,
                    "Content-Type: multipart/{subtype}; boundary=\"{boundary}\"\r\n"
                )?;
                write!(out, "\r\n")?;

                for part in parts {
                    write!(out, "--{boundary}\r\n")?;
                    part.write(out)?;
                    write!(out, "\r\n")?;
                }

                write!(out, "--{boundary}--\r\n")?;
            }
        }

        Ok(())
    }
}

/// Renders `email` as an RFC 5322 message.
///
/// A Message-ID is generated when the email does not carry one. Bcc
/// recipients are never rendered.
///
/// # Errors
///
/// Returns [`ConvertError::Io`] if writing the message fails.
#[tracing::instrument(level = tracing::Level::TRACE, skip_all, err)]
pub fn email_to_mime_message(email: &Email) -> Result<MimeMessage, ConvertError> {
    let mut message = Vec::with_capacity(2048);

    let id = email
        .id
        .clone()
        .filter(|id| !contains_control(id))
        .unwrap_or_else(|| generate_message_id(email));
    write!(&mut message, "Message-ID: {id}\r\n")?;
    write!(
        &mut message,
        "Date: {}\r\n",
        chrono::Utc::now().to_rfc2822()
    )?;

    if let Some(from) = &email.from {
        write!(&mut message, "From: {}\r\n", format_mailbox(from))?;
    }

    if let Some(reply_to) = &email.reply_to {
        write!(&mut message, "Reply-To: {}\r\n", format_mailbox(reply_to))?;
    }

    for kind in [RecipientType::To, RecipientType::Cc] {
        let list = format_mailbox_list(email.recipients.of_kind(kind));
        if !list.is_empty() {
            write!(&mut message, "{}: {list}\r\n", kind.header_name())?;
        }
    }

    if let Some(subject) = &email.subject {
        write!(&mut message, "Subject: {}\r\n", encode_text(subject))?;
    }

    if let Some(recipient) = email.disposition_notification_recipient() {
        write!(
            &mut message,
            "Disposition-Notification-To: {}\r\n",
            format_mailbox(recipient)
        )?;
    }

    if let Some(recipient) = email.return_receipt_recipient() {
        write!(
            &mut message,
            "Return-Receipt-To: {}\r\n",
            format_mailbox(recipient)
        )?;
    }

    // Custom headers, in a stable order
    let mut headers: Vec<_> = email.headers.iter().collect();
    headers.sort();
    for (name, value) in headers {
        if is_structural(name) || !is_header_name(name) {
            tracing::trace!("Not rendering custom header {name:?}");
            continue;
        }
        write!(&mut message, "{name}: {}\r\n", encode_text(value))?;
    }

    write!(&mut message, "MIME-Version: 1.0\r\n")?;
    Part::tree(email).write(&mut message)?;

    tracing::trace!("Rendered message of {} bytes", message.len());

    Ok(MimeMessage::from_bytes(message))
}

/// Formats a recipient for an address header, encoding names that are not
/// printable ASCII.
pub(super) fn format_mailbox(recipient: &Recipient) -> String {
    match recipient.name() {
        Some(name) if name.is_ascii() && !contains_control(name) => {
            format!("\"{}\" <{}>", escape_quoted(name), recipient.address())
        }
        Some(name) => format!("{} <{}>", encode_text(name), recipient.address()),
        None => recipient.address().to_string(),
    }
}

pub(super) fn format_mailbox_list<'a>(recipients: impl Iterator<Item = &'a Recipient>) -> String {
    recipients.map(format_mailbox).collect::<Vec<_>>().join(", ")
}

/// A resource name made safe for a quoted parameter or a Content-ID.
fn parameter(name: &str) -> String {
    escape_quoted(&name.replace(char::is_control, " "))
}

fn write_disposition(
    out: &mut Vec<u8>,
    disposition: &str,
    name: Option<&str>,
) -> Result<(), ConvertError> {
    match name {
        Some(name) => write!(
            out,
            "Content-Disposition: {disposition}; filename=\"{name}\"\r\n"
        )?,
        None => write!(out, "Content-Disposition: {disposition}\r\n")?,
    }
    Ok(())
}

/// Writes the transfer encoding header, the blank separator line and the body.
fn write_body(out: &mut Vec<u8>, body: &[u8], seven_bit: bool) -> Result<(), ConvertError> {
    if seven_bit {
        write!(out, "Content-Transfer-Encoding: 7bit\r\n")?;
        write!(out, "\r\n")?;
        out.extend_from_slice(&normalize_line_endings(body));
    } else {
        write!(out, "Content-Transfer-Encoding: base64\r\n")?;
        write!(out, "\r\n")?;
        out.extend_from_slice(base64_wrapped(body).as_bytes());
    }
    Ok(())
}

/// Plain ASCII without overlong lines or stray control characters can be
/// sent as is.
fn is_7bit(body: &str) -> bool {
    body.bytes()
        .all(|b| b.is_ascii() && (!b.is_ascii_control() || matches!(b, b'\r' | b'\n' | b'\t')))
        && body.lines().all(|line| line.len() <= MAX_LINE_LENGTH)
}

/// Converts bare LF line endings to CRLF.
fn normalize_line_endings(body: &[u8]) -> Vec<u8> {
    let mut normalized = Vec::with_capacity(body.len() + body.len() / 32);
    let mut prev = 0u8;

    for &b in body {
        if b == b'\n' && prev != b'\r' {
            normalized.push(b'\r');
        }
        normalized.push(b);
        prev = b;
    }

    normalized
}

/// Generates a MIME boundary string, unique within this process.
fn generate_boundary() -> String {
    format!(
        "----=_Part_{}_{}",
        UNIQUE.fetch_add(1, Ordering::Relaxed),
        chrono::Utc::now().timestamp_millis()
    )
}

fn generate_message_id(email: &Email) -> String {
    let domain = email
        .from
        .as_ref()
        .and_then(|from| from.address().rsplit_once('@'))
        .map_or("missive.local", |(_, domain)| domain);

    format!(
        "<{}.{}@{domain}>",
        chrono::Utc::now().timestamp_micros(),
        UNIQUE.fetch_add(1, Ordering::Relaxed)
    )
}
