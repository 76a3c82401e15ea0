use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use lettre::Address;

// RFC 5322 specials that force a display name into a quoted string.
const NAME_SPECIALS: &[char] = &['(', ')', '[', ']', ':', ';', '@', '\\', ',', '.'];

// 45 bytes encode to 60 base64 characters, 72 with the `=?utf-8?B?` frame.
const WORD_BYTES: usize = 45;

/// Encode a header value as RFC 2047 words when it is not plain ASCII.
///
/// Each word stays within 75 characters and never splits a character. Words are
/// folded onto continuation lines.
pub fn encode_header_word(value: &str) -> String {
    if value.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        return value.to_string();
    }

    let mut words = Vec::new();
    let mut start = 0;
    for (index, c) in value.char_indices() {
        if index + c.len_utf8() - start > WORD_BYTES {
            words.push(&value[start..index]);
            start = index;
        }
    }
    words.push(&value[start..]);

    words
        .iter()
        .map(|word| format!("=?utf-8?B?{}?=", STANDARD.encode(word.as_bytes())))
        .collect::<Vec<_>>()
        .join("\r\n ")
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\r' | '\n' | '<' | '>' | '"'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Render `Name <email>` when a usable name is known, else the bare address.
pub fn bundle_address(email: &Address, name: Option<&str>) -> String {
    let name = name.map(sanitize_name).unwrap_or_default();
    if name.is_empty() {
        return email.to_string();
    }

    let name = if !name.is_ascii() {
        encode_header_word(&name)
    } else if name.contains(NAME_SPECIALS) {
        format!("\"{}\"", name.replace('\\', "\\\\"))
    } else {
        name
    };

    format!("{} <{}>", name, email)
}

/// Assemble the raw message for one recipient.
///
/// `subject` must already be header-encoded and `header` holds every other header
/// line, CRLF separated and without a trailing line break.
pub fn build_raw(
    to: &Address,
    to_name: Option<&str>,
    subject: &str,
    header: &str,
    body: &str,
) -> String {
    let to = bundle_address(to, to_name);
    if header.is_empty() {
        format!("To: {}\r\nSubject: {}\r\n\r\n{}", to, subject, body)
    } else {
        format!("To: {}\r\nSubject: {}\r\n{}\r\n\r\n{}", to, subject, header, body)
    }
}

/// Build the raw message and apply Gmail's wire encoding, URL-safe base64 without padding.
pub fn encode(
    to: &Address,
    to_name: Option<&str>,
    subject: &str,
    header: &str,
    body: &str,
) -> String {
    URL_SAFE_NO_PAD.encode(build_raw(to, to_name, subject, header, body).as_bytes())
}

#[cfg(test)]
pub(crate) fn decode(raw: &str) -> String {
    let bytes = URL_SAFE_NO_PAD.decode(raw).unwrap();
    String::from_utf8(bytes).unwrap()
}
