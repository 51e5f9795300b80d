//! Error types for the missive-common crate.
//!
//! Every failure in email composition is synchronous and raised at the point
//! of the offending call. None of these errors are transient; the caller is
//! expected to correct the input before trying again.

use std::io;

use thiserror::Error;

/// Errors raised while composing an email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// A required argument was missing or empty.
    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    /// An argument contains characters that cannot appear in a header, such
    /// as CR or LF.
    #[error("Invalid characters in argument: {0}")]
    InvalidArgument(&'static str),

    /// Neither the embedded image nor its data source carry a name.
    #[error("No name given for embedded image nor passed inside the data source")]
    NameMissingForEmbeddedImage,

    /// An HTML quoting template must contain exactly one `%s` placeholder.
    #[error("Invalid quoting template, expected exactly one %s placeholder: {0}")]
    InvalidQuotingTemplate(String),

    /// The original message could not be parsed to produce a reply.
    #[error("Unable to parse message to produce a reply for: {0}")]
    ReplyFailed(#[source] ConvertError),

    /// Converting between an email and a mail message failed.
    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// Reading a file backed resource failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EmailError {
    /// Returns `true` if the error was caused by invalid caller input rather
    /// than by content that could not be processed.
    #[must_use]
    pub const fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Self::MissingArgument(_) | Self::InvalidArgument(_) | Self::InvalidQuotingTemplate(_)
        )
    }
}

/// Errors raised while converting between emails and mail messages.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The raw message could not be parsed.
    #[error("Failed to parse message: {0}")]
    Parse(#[from] mailparse::MailParseError),

    /// The message parsed, but its structure is unusable.
    #[error("Invalid message structure: {0}")]
    InvalidStructure(String),

    /// I/O error while rendering a message.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Specialized `Result` type for email composition.
pub type Result<T> = std::result::Result<T, EmailError>;

#[cfg(test)]
mod tests {
    use std::error::Error as StdError;

    use super::*;

    #[test]
    fn test_email_error_display() {
        let err = EmailError::MissingArgument("fromAddress");
        assert_eq!(err.to_string(), "Missing required argument: fromAddress");

        let err = EmailError::NameMissingForEmbeddedImage;
        assert_eq!(
            err.to_string(),
            "No name given for embedded image nor passed inside the data source"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(EmailError::MissingArgument("subject").is_argument_error());
        assert!(EmailError::InvalidArgument("headerName").is_argument_error());
        assert!(EmailError::InvalidQuotingTemplate("<p/>".to_string()).is_argument_error());
        assert!(!EmailError::NameMissingForEmbeddedImage.is_argument_error());
    }

    #[test]
    fn test_error_source_chain() {
        let err = EmailError::ReplyFailed(ConvertError::InvalidStructure(
            "no headers".to_string(),
        ));

        assert!(err.source().is_some());
        assert_eq!(
            err.to_string(),
            "Unable to parse message to produce a reply for: Invalid message structure: no headers"
        );
    }
}
