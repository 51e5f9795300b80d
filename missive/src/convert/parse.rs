//! Reads an RFC 5322 message back into an [`Email`].

use mailparse::{DispositionType, MailAddr, MailHeader, MailHeaderMap, ParsedMail};
use missive_common::{
    ConvertError, DataSource, EmailError, Recipient, RecipientType,
    address_parser::{interpret_recipient, split_address_list},
    encoding::{contains_control, is_header_name},
};

use super::MimeMessage;
use crate::{Email, EmailBuilder};

/// Headers that are mapped onto dedicated email fields, or describe MIME
/// structure, and are therefore not copied as custom headers.
const STRUCTURAL_HEADERS: &[&str] = &[
    "Message-ID",
    "Date",
    "From",
    "Reply-To",
    "To",
    "Cc",
    "Bcc",
    "Subject",
    "MIME-Version",
    "Disposition-Notification-To",
    "Return-Receipt-To",
    "Return-Path",
    "Received",
];

/// Body parts found while walking the MIME tree.
#[derive(Default)]
struct Bodies {
    text: Option<String>,
    html: Option<String>,
    forward: Option<MimeMessage>,
}

fn invalid(err: EmailError) -> ConvertError {
    ConvertError::InvalidStructure(err.to_string())
}

/// Parses `message` into an [`Email`].
///
/// The message id is never carried over, so an email read from a message
/// gets a fresh id when it is rendered again.
///
/// # Errors
///
/// Returns [`ConvertError::Parse`] if the message is malformed, or
/// [`ConvertError::InvalidStructure`] if its content cannot be represented as
/// an email (for example a header without a value).
#[tracing::instrument(level = tracing::Level::TRACE, skip_all, err)]
pub fn mime_message_to_email(message: &MimeMessage) -> Result<Email, ConvertError> {
    let parsed = message.parse()?;
    let headers = &parsed.headers;
    let mut builder = EmailBuilder::new();

    if let Some(from) = mailboxes(headers, "From").first() {
        builder.from_recipient(from);
    }
    if let Some(reply_to) = mailboxes(headers, "Reply-To").first() {
        builder.reply_to_recipient(reply_to);
    }
    if let Some(bounce_to) = mailboxes(headers, "Return-Path").first() {
        builder.bounce_to_recipient(bounce_to);
    }

    for kind in [RecipientType::To, RecipientType::Cc, RecipientType::Bcc] {
        let recipients = mailboxes(headers, kind.header_name());
        if !recipients.is_empty() {
            builder.add_recipients(kind, &recipients).map_err(invalid)?;
        }
    }

    if let Some(subject) = headers.get_first_value("Subject")
        && !subject.trim().is_empty()
    {
        builder.subject(&subject).map_err(invalid)?;
    }

    if headers.get_first_header("Disposition-Notification-To").is_some() {
        match mailboxes(headers, "Disposition-Notification-To").first() {
            Some(recipient) => builder.with_disposition_notification_to_recipient(recipient),
            None => builder.with_disposition_notification_to(),
        };
    }
    if headers.get_first_header("Return-Receipt-To").is_some() {
        match mailboxes(headers, "Return-Receipt-To").first() {
            Some(recipient) => builder.with_return_receipt_to_recipient(recipient),
            None => builder.with_return_receipt_to(),
        };
    }

    for header in headers {
        let key = header.get_key();
        if is_structural(&key) {
            continue;
        }
        if !is_header_name(&key) {
            tracing::trace!("Skipping header with malformed name {key:?}");
            continue;
        }

        // Encoded words may decode to line breaks
        let value = without_controls(&header.get_value());
        if !value.trim().is_empty() {
            builder.add_header(&key, value).map_err(invalid)?;
        }
    }

    let mut bodies = Bodies::default();
    walk(&parsed, &mut builder, &mut bodies)?;

    builder.text(bodies.text.as_deref());
    builder.text_html(bodies.html.as_deref());

    let mut email = builder.build();
    email.email_to_forward = bodies.forward;

    tracing::trace!(
        "Parsed message with {} recipients, {} attachments and {} embedded images",
        email.recipients.len(),
        email.attachments.len(),
        email.embedded_images.len()
    );

    Ok(email)
}

pub(super) fn is_structural(key: &str) -> bool {
    key.to_ascii_lowercase().starts_with("content-")
        || STRUCTURAL_HEADERS
            .iter()
            .any(|header| header.eq_ignore_ascii_case(key))
}

/// Every mailbox in the first header called `name`, with groups flattened.
///
/// A null path (`<>`) holds no mailbox. When the header is not a valid
/// address list it is read entry by entry, and entries that still cannot be
/// made into a recipient are dropped.
pub(super) fn mailboxes(headers: &[MailHeader<'_>], name: &str) -> Vec<Recipient> {
    let Some(header) = headers.get_first_header(name) else {
        return Vec::new();
    };

    match mailparse::addrparse_header(header) {
        Ok(list) => list
            .iter()
            .flat_map(|addr| match addr {
                MailAddr::Single(single) => std::slice::from_ref(single),
                MailAddr::Group(group) => group.addrs.as_slice(),
            })
            .filter_map(|single| mailbox(single.display_name.as_deref(), &single.addr))
            .collect(),
        Err(err) => {
            tracing::trace!("Reading {name} entry by entry: {err}");
            split_address_list(&header.get_value())
                .into_iter()
                .filter_map(|entry| {
                    let recipient = interpret_recipient(None, entry, None).ok()?;
                    mailbox(recipient.name(), recipient.address())
                })
                .collect()
        }
    }
}

fn mailbox(name: Option<&str>, address: &str) -> Option<Recipient> {
    let address = address.trim();
    let address = address
        .strip_prefix('<')
        .and_then(|inner| inner.strip_suffix('>'))
        .unwrap_or(address)
        .trim();
    if address.is_empty() {
        return None;
    }

    let name = name.map(without_controls);
    match Recipient::new(name.as_deref(), address, None) {
        Ok(recipient) => Some(recipient),
        Err(err) => {
            tracing::trace!("Dropping mailbox {address:?}: {err}");
            None
        }
    }
}

fn without_controls(value: &str) -> String {
    if contains_control(value) {
        value.replace(char::is_control, " ")
    } else {
        value.to_string()
    }
}

fn walk(
    part: &ParsedMail<'_>,
    builder: &mut EmailBuilder,
    bodies: &mut Bodies,
) -> Result<(), ConvertError> {
    let mimetype = part.ctype.mimetype.to_ascii_lowercase();

    if mimetype.starts_with("multipart/") {
        for subpart in &part.subparts {
            walk(subpart, builder, bodies)?;
        }
        return Ok(());
    }

    let disposition = part.get_content_disposition();
    let is_attachment = disposition.disposition == DispositionType::Attachment;

    if !is_attachment {
        let slot = match mimetype.as_str() {
            "text/plain" => Some(&mut bodies.text),
            "text/html" => Some(&mut bodies.html),
            _ => None,
        };

        if let Some(slot) = slot
            && slot.is_none()
        {
            let body = part.get_body()?.replace("\r\n", "\n");
            if !body.is_empty() {
                *slot = Some(body);
            }
            return Ok(());
        }

        if mimetype == "message/rfc822" && bodies.forward.is_none() {
            bodies.forward = Some(MimeMessage::from_bytes(part.get_body_raw()?));
            return Ok(());
        }
    }

    let data = part.get_body_raw()?;
    if data.is_empty() {
        tracing::trace!("Skipping empty {mimetype} part");
        return Ok(());
    }
    let source = DataSource::new(data, &mimetype).map_err(invalid)?;

    let content_id = part
        .headers
        .get_first_value("Content-ID")
        .map(|id| id.trim().trim_start_matches('<').trim_end_matches('>').to_string())
        .filter(|id| !id.is_empty());

    match content_id {
        Some(content_id) if !is_attachment => {
            builder
                .embed_image_source(Some(&content_id), source)
                .map_err(invalid)?;
        }
        _ => {
            let name = disposition
                .params
                .get("filename")
                .or_else(|| part.ctype.params.get("name"))
                .map(String::as_str);
            builder.add_attachment_source(name, source);
        }
    }

    Ok(())
}
