use std::{
    fmt::{self, Display},
    hash::{Hash, Hasher},
    ops::Deref,
};

use serde::{Deserialize, Serialize};

use crate::{
    encoding::{contains_control, escape_quoted},
    error::{EmailError, Result},
};

/// The delivery role of a recipient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientType {
    To,
    Cc,
    Bcc,
}

impl RecipientType {
    /// The header this role is rendered under.
    #[must_use]
    pub const fn header_name(self) -> &'static str {
        match self {
            Self::To => "To",
            Self::Cc => "Cc",
            Self::Bcc => "Bcc",
        }
    }
}

impl Display for RecipientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_name())
    }
}

/// A mail address with an optional display name and an optional role.
///
/// Two recipients are equal when they share address and role; the display
/// name does not take part in comparisons, so a [`RecipientList`] keeps the
/// first name it saw for a given address.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recipient {
    name: Option<String>,
    address: String,
    kind: Option<RecipientType>,
}

impl Recipient {
    /// Creates a recipient.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::MissingArgument`] when `address` is empty, or
    /// [`EmailError::InvalidArgument`] when the name or the address holds a
    /// control character.
    pub fn new(name: Option<&str>, address: &str, kind: Option<RecipientType>) -> Result<Self> {
        let address = address.trim();
        if address.is_empty() {
            return Err(EmailError::MissingArgument("address"));
        }
        if contains_control(address) {
            return Err(EmailError::InvalidArgument("address"));
        }
        if name.is_some_and(contains_control) {
            return Err(EmailError::InvalidArgument("name"));
        }

        Ok(Self {
            name: name.filter(|name| !name.is_empty()).map(str::to_string),
            address: address.to_string(),
            kind,
        })
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub const fn kind(&self) -> Option<RecipientType> {
        self.kind
    }

    /// Returns a copy of this recipient carrying `kind` instead of its own role.
    #[must_use]
    pub fn with_kind(&self, kind: Option<RecipientType>) -> Self {
        Self {
            name: self.name.clone(),
            address: self.address.clone(),
            kind,
        }
    }
}

impl PartialEq for Recipient {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.kind == other.kind
    }
}

impl Eq for Recipient {}

impl Hash for Recipient {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
        self.kind.hash(state);
    }
}

impl Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "\"{}\" <{}>", escape_quoted(name), self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// An insertion ordered set of recipients, keyed on address and role.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientList(Vec<Recipient>);

impl RecipientList {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds `recipient` unless an equal one is already present.
    ///
    /// Returns `true` when the recipient was added.
    pub fn insert(&mut self, recipient: Recipient) -> bool {
        if self.0.contains(&recipient) {
            false
        } else {
            self.0.push(recipient);
            true
        }
    }

    /// Iterates over the recipients carrying the given role.
    pub fn of_kind(&self, kind: RecipientType) -> impl Iterator<Item = &Recipient> {
        self.0
            .iter()
            .filter(move |recipient| recipient.kind == Some(kind))
    }
}

impl Display for RecipientList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, recipient) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            Display::fmt(recipient, f)?;
        }
        Ok(())
    }
}

impl Deref for RecipientList {
    type Target = [Recipient];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Extend<Recipient> for RecipientList {
    fn extend<T: IntoIterator<Item = Recipient>>(&mut self, iter: T) {
        for recipient in iter {
            self.insert(recipient);
        }
    }
}

impl FromIterator<Recipient> for RecipientList {
    fn from_iter<T: IntoIterator<Item = Recipient>>(iter: T) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl<'a> IntoIterator for &'a RecipientList {
    type Item = &'a Recipient;
    type IntoIter = std::slice::Iter<'a, Recipient>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
