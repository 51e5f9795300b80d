//! Reply skeletons: the minimal message that addresses a reply to an
//! original message.

use std::{collections::HashSet, io::Write};

use mailparse::MailHeaderMap;
use missive_common::{
    ConvertError, Recipient,
    encoding::{contains_control, encode_text},
};

use super::{
    MimeMessage,
    parse::mailboxes,
    render::format_mailbox_list,
};

/// Sender placed on every skeleton; the builder never copies it.
const PLACEHOLDER_FROM: &str = "ignore@ignore.ignore";
const PLACEHOLDER_BODY: &str = "ignore";

impl MimeMessage {
    /// Derives the reply skeleton for this message.
    ///
    /// The skeleton carries a `Re: ` subject (never nested), the addressees
    /// of the reply and the threading headers `In-Reply-To` and
    /// `References`. Replies go to the Reply-To addresses, or to the sender
    /// when there are none. With `reply_all`, the original To and Cc
    /// recipients are included too, minus duplicate addresses.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Parse`] if the message is malformed, or
    /// [`ConvertError::InvalidStructure`] if it has no headers at all.
    pub fn reply(&self, reply_all: bool) -> Result<Self, ConvertError> {
        let (headers, _) = mailparse::parse_headers(self.as_bytes())?;
        if headers.is_empty() {
            return Err(ConvertError::InvalidStructure(
                "message has no headers to reply to".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut keep = |recipient: &Recipient| seen.insert(recipient.address().to_ascii_lowercase());

        let mut to = mailboxes(&headers, "Reply-To");
        if to.is_empty() {
            to = mailboxes(&headers, "From");
        }
        to.retain(&mut keep);

        let mut cc = Vec::new();
        if reply_all {
            let mut original_to = mailboxes(&headers, "To");
            original_to.retain(&mut keep);
            to.extend(original_to);

            cc = mailboxes(&headers, "Cc");
            cc.retain(&mut keep);
        }

        let mut reply = Vec::with_capacity(512);
        write!(&mut reply, "From: {PLACEHOLDER_FROM}\r\n")?;

        if !to.is_empty() {
            write!(&mut reply, "To: {}\r\n", format_mailbox_list(to.iter()))?;
        }
        if !cc.is_empty() {
            write!(&mut reply, "Cc: {}\r\n", format_mailbox_list(cc.iter()))?;
        }

        if let Some(subject) = headers.get_first_value("Subject") {
            write!(&mut reply, "Subject: {}\r\n", encode_text(&reply_subject(&subject)))?;
        }

        let message_id = headers
            .get_first_value("Message-ID")
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty() && !contains_control(id));

        if let Some(message_id) = message_id {
            write!(&mut reply, "In-Reply-To: {message_id}\r\n")?;

            let references = headers
                .get_first_value("References")
                .or_else(|| headers.get_first_value("In-Reply-To"))
                .map(|refs| {
                    refs.split_whitespace()
                        .filter(|id| !contains_control(id))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .filter(|refs| !refs.is_empty());

            match references {
                Some(refs) => write!(&mut reply, "References: {refs} {message_id}\r\n")?,
                None => write!(&mut reply, "References: {message_id}\r\n")?,
            }
        }

        write!(&mut reply, "MIME-Version: 1.0\r\n")?;
        write!(&mut reply, "Content-Type: text/plain; charset=utf-8\r\n")?;
        write!(&mut reply, "\r\n{PLACEHOLDER_BODY}")?;

        tracing::trace!(
            "Reply skeleton addresses {} recipients",
            to.len() + cc.len()
        );

        Ok(Self::from_bytes(reply))
    }
}

/// Prefixes `Re: ` unless the subject already carries it.
fn reply_subject(subject: &str) -> String {
    let already_reply = subject
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("re: "));

    if already_reply {
        subject.to_string()
    } else {
        format!("Re: {subject}")
    }
}
