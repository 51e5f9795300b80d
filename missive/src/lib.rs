//! Fluent composition of email messages.
//!
//! An [`EmailBuilder`] accumulates sender, recipients, bodies, attachments,
//! embedded images, headers and DKIM parameters, and snapshots them into an
//! immutable [`Email`]. The [`convert`] module turns emails into RFC 5322
//! messages and back, which is also what reply and forward priming build on.
//!
//! ```no_run
//! use missive::EmailBuilder;
//!
//! # fn example() -> missive::Result<()> {
//! let mut builder = EmailBuilder::new();
//! builder
//!     .from_with_name(Some("Reports"), "reports@example.com")?
//!     .to("alice@example.com; bob@example.com")?
//!     .subject("Weekly numbers")?
//!     .text(Some("See attached."))
//!     .add_attachment(Some("numbers.csv"), b"a,b\n1,2\n".to_vec(), "text/csv")?;
//!
//! let email = builder.build();
//! let message = missive::convert::email_to_mime_message(&email)?;
//! assert_eq!(message.subject()?.as_deref(), Some("Weekly numbers"));
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod convert;
pub mod dkim;
pub mod email;
pub mod proxy;

pub use builder::{DEFAULT_QUOTING_MARKUP, EmailBuilder, Original};
pub use convert::MimeMessage;
pub use dkim::{DkimConfig, DkimKey};
pub use email::Email;
pub use missive_common::{
    AttachmentResource, ConvertError, DataSource, EmailError, Recipient, RecipientList,
    RecipientType, Result, config::EmailDefaults,
};
