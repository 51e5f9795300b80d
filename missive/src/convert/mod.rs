//! Conversion between [`Email`](crate::Email) values and RFC 5322 messages.
//!
//! - [`email_to_mime_message`] renders an email, MIME structure included.
//! - [`mime_message_to_email`] parses a message back into an email.
//! - [`MimeMessage::reply`] derives the reply skeleton used by reply priming.

mod parse;
mod render;
mod reply;

use std::{fmt, sync::Arc};

use mailparse::{MailHeaderMap, ParsedMail};
use missive_common::ConvertError;

pub use parse::mime_message_to_email;
pub use render::email_to_mime_message;

/// A raw RFC 5322 message.
///
/// The bytes are shared, so cloning is cheap and an email that forwards a
/// message does not copy it.
#[derive(Clone, PartialEq, Eq)]
pub struct MimeMessage {
    raw: Arc<[u8]>,
}

impl MimeMessage {
    /// Wraps raw message bytes. Parsing is deferred until the content is
    /// inspected.
    pub fn from_bytes(raw: impl Into<Arc<[u8]>>) -> Self {
        Self { raw: raw.into() }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Parses the message structure.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Parse`] if the message is malformed.
    pub fn parse(&self) -> Result<ParsedMail<'_>, ConvertError> {
        Ok(mailparse::parse_mail(&self.raw)?)
    }

    /// The decoded value of the first header called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Parse`] if the message is malformed.
    pub fn header(&self, name: &str) -> Result<Option<String>, ConvertError> {
        let (headers, _) = mailparse::parse_headers(&self.raw)?;
        Ok(headers.get_first_value(name))
    }

    /// The decoded subject.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Parse`] if the message is malformed.
    pub fn subject(&self) -> Result<Option<String>, ConvertError> {
        self.header("Subject")
    }
}

impl fmt::Debug for MimeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MimeMessage")
            .field("len", &self.raw.len())
            .finish()
    }
}

impl fmt::Display for MimeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.raw))
    }
}

impl From<String> for MimeMessage {
    fn from(value: String) -> Self {
        Self::from_bytes(value.into_bytes())
    }
}

impl From<&str> for MimeMessage {
    fn from(value: &str) -> Self {
        Self::from_bytes(value.as_bytes())
    }
}

impl From<Vec<u8>> for MimeMessage {
    fn from(value: Vec<u8>) -> Self {
        Self::from_bytes(value)
    }
}
