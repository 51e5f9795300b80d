//! Default values for new emails.
//!
//! Defaults are read once, ahead of time, and handed to the builder factory
//! explicitly. A typical file looks like:
//!
//! ```toml
//! subject = "Status report"
//!
//! [from]
//! name = "Reporting"
//! address = "reports@example.com"
//!
//! [bcc]
//! address = "archive@example.com; audit@example.com"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// A configured name and address pair.
///
/// For `to`, `cc` and `bcc` the address may be a comma or semicolon
/// separated list, with the name applied to every entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultRecipient {
    #[serde(default)]
    pub name: Option<String>,
    pub address: String,
}

impl DefaultRecipient {
    #[must_use]
    pub fn new(name: Option<&str>, address: &str) -> Self {
        Self {
            name: name.map(str::to_string),
            address: address.to_string(),
        }
    }
}

/// Defaults applied to every builder created from them.
///
/// Every field is optional; an absent field means "no default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDefaults {
    #[serde(default)]
    pub from: Option<DefaultRecipient>,

    #[serde(default)]
    pub reply_to: Option<DefaultRecipient>,

    #[serde(default)]
    pub bounce_to: Option<DefaultRecipient>,

    #[serde(default)]
    pub to: Option<DefaultRecipient>,

    #[serde(default)]
    pub cc: Option<DefaultRecipient>,

    #[serde(default)]
    pub bcc: Option<DefaultRecipient>,

    #[serde(default)]
    pub subject: Option<String>,
}

impl EmailDefaults {
    /// Parses defaults from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the input is not valid for this type.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Reads and parses defaults from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let defaults = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded email defaults from {}: {defaults:?}", path.display());

        Ok(defaults)
    }

    /// Returns `true` if no default is configured at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.from.is_none()
            && self.reply_to.is_none()
            && self.bounce_to.is_none()
            && self.to.is_none()
            && self.cc.is_none()
            && self.bcc.is_none()
            && self.subject.is_none()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_empty_input() {
        let defaults = EmailDefaults::from_toml_str("").unwrap();
        assert!(defaults.is_empty());
    }

    #[test]
    fn test_parse_all_fields() {
        let defaults = EmailDefaults::from_toml_str(
            r#"
            subject = "Weekly"

            [from]
            name = "Reports"
            address = "reports@example.com"

            [reply_to]
            address = "noreply@example.com"

            [bounce_to]
            address = "bounces@example.com"

            [to]
            address = "a@example.com,b@example.com"

            [cc]
            name = "Team"
            address = "team@example.com"

            [bcc]
            address = "archive@example.com"
            "#,
        )
        .unwrap();

        assert_eq!(
            defaults,
            EmailDefaults {
                from: Some(DefaultRecipient::new(Some("Reports"), "reports@example.com")),
                reply_to: Some(DefaultRecipient::new(None, "noreply@example.com")),
                bounce_to: Some(DefaultRecipient::new(None, "bounces@example.com")),
                to: Some(DefaultRecipient::new(None, "a@example.com,b@example.com")),
                cc: Some(DefaultRecipient::new(Some("Team"), "team@example.com")),
                bcc: Some(DefaultRecipient::new(None, "archive@example.com")),
                subject: Some("Weekly".to_string()),
            }
        );
    }

    #[test]
    fn test_missing_address_rejected() {
        let err = EmailDefaults::from_toml_str("[from]\nname = \"Nobody\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "subject = \"Hello\"").unwrap();

        let defaults = EmailDefaults::load(file.path()).unwrap();
        assert_eq!(defaults.subject.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EmailDefaults::load(dir.path().join("defaults.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
