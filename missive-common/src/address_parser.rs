//! Delimited address list handling.
//!
//! Recipient lists may be given as a single string separated by `,` or `;`.
//! Each entry is either a bare address (`user@example.com`) or a mailbox with
//! a display name (`"Doe, Jane" <jane@example.com>`). Separators inside a
//! quoted display name or inside angle brackets do not split the list.

use mailparse::MailAddr;

use crate::{
    address::{Recipient, RecipientType},
    error::{EmailError, Result},
};

/// Splits a comma or semicolon separated address list into trimmed,
/// non-empty entries.
pub fn split_address_list(input: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut prev_was_backslash = false;
    let mut start = 0;

    for (i, ch) in input.char_indices() {
        if ch == '"' && !prev_was_backslash {
            in_quotes = !in_quotes;
        } else if ch == '<' && !in_quotes {
            in_brackets = true;
        } else if ch == '>' && !in_quotes {
            in_brackets = false;
        } else if (ch == ',' || ch == ';') && !in_quotes && !in_brackets {
            entries.push(&input[start..i]);
            start = i + ch.len_utf8();
        }

        prev_was_backslash = ch == '\\' && !prev_was_backslash;
    }
    entries.push(&input[start..]);

    entries
        .into_iter()
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Turns a single list entry into a recipient.
///
/// An explicit `name` takes precedence over a display name found in the
/// entry. Entries that are not valid RFC 5322 mailboxes are kept verbatim as
/// the address.
///
/// # Errors
///
/// Returns [`EmailError::MissingArgument`] when the entry holds no address.
pub fn interpret_recipient(
    name: Option<&str>,
    entry: &str,
    kind: Option<RecipientType>,
) -> Result<Recipient> {
    let entry = entry.trim();
    if entry.is_empty() {
        return Err(EmailError::MissingArgument("emailAddress"));
    }

    match mailparse::addrparse(entry) {
        Ok(list) => match list.first() {
            Some(MailAddr::Single(single)) => Recipient::new(
                name.or(single.display_name.as_deref()),
                &single.addr,
                kind,
            ),
            _ => {
                tracing::trace!("Address entry {entry:?} is not a single mailbox, keeping verbatim");
                Recipient::new(name, entry, kind)
            }
        },
        Err(err) => {
            tracing::trace!("Unable to parse address entry {entry:?}: {err}");
            Recipient::new(name, entry, kind)
        }
    }
}

/// Parses a delimited address list into recipients carrying `kind`.
///
/// # Errors
///
/// Returns [`EmailError::MissingArgument`] when the list holds no entries.
pub fn parse_address_list(
    name: Option<&str>,
    list: &str,
    kind: Option<RecipientType>,
) -> Result<Vec<Recipient>> {
    let entries = split_address_list(list);
    if entries.is_empty() {
        return Err(EmailError::MissingArgument("emailAddressList"));
    }

    entries
        .into_iter()
        .map(|entry| interpret_recipient(name, entry, kind))
        .collect()
}
