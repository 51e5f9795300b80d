//! Binary resources attached to, or embedded in, an email.

use std::{fmt, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    encoding::contains_control,
    error::{EmailError, Result},
};

/// Binary content together with its MIME type and an optional inherent name.
///
/// The content is shared, so cloning a data source (and therefore building an
/// email more than once) never copies the bytes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    name: Option<String>,
    content_type: String,
    data: Arc<[u8]>,
}

impl DataSource {
    /// Creates a data source over in-memory content.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if `data` or `content_type` is
    /// empty, and [`EmailError::InvalidArgument`] if `content_type` holds a
    /// control character.
    pub fn new(data: impl Into<Arc<[u8]>>, content_type: &str) -> Result<Self> {
        let data = data.into();
        if data.is_empty() {
            return Err(EmailError::MissingArgument("data"));
        }
        if content_type.trim().is_empty() {
            return Err(EmailError::MissingArgument("mimetype"));
        }
        if contains_control(content_type) {
            return Err(EmailError::InvalidArgument("mimetype"));
        }

        Ok(Self {
            name: None,
            content_type: content_type.trim().to_string(),
            data,
        })
    }

    /// Reads a file into a data source, named after the file and typed by its
    /// extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is empty.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);

        let data = std::fs::read(path)?;
        tracing::trace!("Read {} bytes from {}", data.len(), path.display());

        Ok(Self::new(data, guess_content_type(path))?.with_name(name))
    }

    /// Replaces the inherent name of this data source.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name.filter(|name| !name.is_empty());
        self
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// A named attachment or embedded image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentResource {
    name: Option<String>,
    data_source: DataSource,
}

impl AttachmentResource {
    #[must_use]
    pub fn new(name: Option<String>, data_source: DataSource) -> Self {
        Self {
            name: name.filter(|name| !name.is_empty()),
            data_source,
        }
    }

    /// The explicit name, falling back to the name of the data source.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().or_else(|| self.data_source.name())
    }

    #[must_use]
    pub const fn data_source(&self) -> &DataSource {
        &self.data_source
    }
}

/// Guesses the MIME content type based on file extension.
fn guess_content_type(path: &Path) -> &'static str {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match extension.to_lowercase().as_str() {
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "zip" => "application/zip",
        "json" => "application/json",
        "xml" => "application/xml",
        "eml" => "message/rfc822",
        _ => "application/octet-stream",
    }
}
