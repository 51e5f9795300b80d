//! DKIM signing parameters.
//!
//! The builder only records which key to sign with and for which domain and
//! selector. Reading the key and producing the signature happens later, in
//! whatever signs the rendered message.

use std::{
    fmt,
    io::Read,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use missive_common::error::{EmailError, Result};

/// A shared reader yielding the private key, consumed by the signer.
#[derive(Clone)]
pub struct KeyReader(Arc<Mutex<dyn Read + Send>>);

impl KeyReader {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(reader)))
    }

    /// Reads the remaining key material.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading fails or a previous reader panicked.
    pub fn read_to_end(&self) -> std::io::Result<Vec<u8>> {
        let mut reader = self
            .0
            .lock()
            .map_err(|_| std::io::Error::other("DKIM key reader poisoned"))?;

        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl fmt::Debug for KeyReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyReader(..)")
    }
}

/// Where the DKIM private key comes from.
#[derive(Clone, Debug)]
pub enum DkimKey {
    /// In-memory key material. Keys given as text are stored as UTF-8 bytes.
    Bytes(Arc<[u8]>),
    /// A key file, read when signing.
    File(PathBuf),
    /// A reader, drained when signing.
    Reader(KeyReader),
}

impl DkimKey {
    /// Wraps a reader that yields the key.
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self::Reader(KeyReader::new(reader))
    }

    fn ensure_present(&self) -> Result<()> {
        let empty = match self {
            Self::Bytes(bytes) => bytes.is_empty(),
            Self::File(path) => path.as_os_str().is_empty(),
            Self::Reader(_) => false,
        };

        if empty {
            Err(EmailError::MissingArgument("dkimPrivateKey"))
        } else {
            Ok(())
        }
    }
}

impl From<Vec<u8>> for DkimKey {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value.into())
    }
}

impl From<&[u8]> for DkimKey {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.into())
    }
}

impl From<String> for DkimKey {
    fn from(value: String) -> Self {
        Self::Bytes(value.into_bytes().into())
    }
}

impl From<&str> for DkimKey {
    fn from(value: &str) -> Self {
        Self::Bytes(value.as_bytes().into())
    }
}

impl From<PathBuf> for DkimKey {
    fn from(value: PathBuf) -> Self {
        Self::File(value)
    }
}

impl From<&std::path::Path> for DkimKey {
    fn from(value: &std::path::Path) -> Self {
        Self::File(value.to_path_buf())
    }
}

impl From<KeyReader> for DkimKey {
    fn from(value: KeyReader) -> Self {
        Self::Reader(value)
    }
}

/// Everything needed to DKIM sign a message.
#[derive(Clone, Debug)]
pub struct DkimConfig {
    key: DkimKey,
    signing_domain: String,
    selector: String,
}

impl DkimConfig {
    /// Validates and bundles DKIM parameters.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] if the key, the signing domain
    /// or the selector is empty.
    pub fn new(key: DkimKey, signing_domain: &str, selector: &str) -> Result<Self> {
        key.ensure_present()?;
        if signing_domain.trim().is_empty() {
            return Err(EmailError::MissingArgument("signingDomain"));
        }
        if selector.trim().is_empty() {
            return Err(EmailError::MissingArgument("dkimSelector"));
        }

        Ok(Self {
            key,
            signing_domain: signing_domain.to_string(),
            selector: selector.to_string(),
        })
    }

    #[must_use]
    pub const fn key(&self) -> &DkimKey {
        &self.key
    }

    #[must_use]
    pub fn signing_domain(&self) -> &str {
        &self.signing_domain
    }

    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }
}
