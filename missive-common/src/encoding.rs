//! Transfer encodings shared by the builder and the message renderer.

use base64::{Engine, engine::general_purpose::STANDARD};

/// Maximum line length for base64 encoded content, excluding CRLF.
pub const BASE64_LINE_LENGTH: usize = 76;

/// Longest encoded word allowed by RFC 2047, delimiters included.
pub const MAX_ENCODED_WORD_LENGTH: usize = 75;

/// Bytes of text that fit one `=?UTF-8?B?...?=` word: 12 delimiter
/// characters leave 63, and base64 needs whole groups of four.
const ENCODED_WORD_PAYLOAD: usize = (MAX_ENCODED_WORD_LENGTH - 12) / 4 * 3;

/// Encodes `text` as RFC 2047 encoded words when it is not plain ASCII.
///
/// ASCII text without control characters is returned untouched so that file
/// names and subjects stay readable on the wire. Longer text is split on
/// character boundaries into several words separated by a space, each
/// within [`MAX_ENCODED_WORD_LENGTH`].
#[must_use]
pub fn encode_text(text: &str) -> String {
    if text.chars().all(|ch| ch.is_ascii() && !ch.is_ascii_control()) {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut start = 0;
    let mut end = 0;

    for (i, ch) in text.char_indices() {
        let next = i + ch.len_utf8();
        if next - start > ENCODED_WORD_PAYLOAD {
            words.push(&text[start..end]);
            start = end;
        }
        end = next;
    }
    words.push(&text[start..end]);

    words
        .into_iter()
        .map(|word| format!("=?UTF-8?B?{}?=", STANDARD.encode(word.as_bytes())))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns `true` if `text` holds a control character such as CR or LF.
#[must_use]
pub fn contains_control(text: &str) -> bool {
    text.chars().any(char::is_control)
}

/// Whether `name` is a valid RFC 5322 field name: printable ASCII other than
/// space and `:`.
#[must_use]
pub fn is_header_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| (33..=126).contains(&b) && b != b':')
}

/// Escapes `\` and `"` for use inside a quoted string.
#[must_use]
pub fn escape_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Encodes data as base64 with line wrapping at 76 characters.
#[must_use]
pub fn base64_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_LENGTH * 2 + 2);

    for line in encoded.as_bytes().chunks(BASE64_LINE_LENGTH) {
        // base64 output is always ASCII
        result.push_str(&String::from_utf8_lossy(line));
        result.push_str("\r\n");
    }

    result
}
