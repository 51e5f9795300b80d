//! Value types, address parsing, errors, defaults and logging shared by the
//! missive crates.

pub mod address;
pub mod address_parser;
pub mod attachment;
pub mod config;
pub mod encoding;
pub mod error;
pub mod logging;

pub use tracing;

pub use address::{Recipient, RecipientList, RecipientType};
pub use attachment::{AttachmentResource, DataSource};
pub use error::{ConvertError, EmailError, Result};
