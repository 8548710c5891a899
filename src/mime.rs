//! Composing outgoing messages and pulling text bodies out of raw ones

use crate::error::{MailError, Result};
use crate::types::OutgoingMessage;
use base64::Engine;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD, URL_SAFE};
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};
use tracing::debug;

/// URL-safe alphabet that accepts input with or without padding
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Longest UTF-8 slice placed in one RFC 2047 encoded-word
const ENCODED_WORD_BYTES: usize = 45;

/// Build a plain-text message and wrap it for the send/draft endpoints
pub fn create_message(sender: &str, to: &str, subject: &str, text: &str) -> Result<OutgoingMessage> {
    let message = compose_plain_text(sender, to, subject, text)?;
    Ok(OutgoingMessage {
        raw: URL_SAFE.encode(message.as_bytes()),
    })
}

/// Render a single-part `text/plain` RFC 5322 message with CRLF line endings
pub fn compose_plain_text(sender: &str, to: &str, subject: &str, text: &str) -> Result<String> {
    let to = header_value("To", to)?;
    let from = header_value("From", sender)?;
    let subject = encode_header_text(header_value("Subject", subject)?);
    let body = text.replace("\r\n", "\n").replace('\n', "\r\n");

    Ok(format!(
        "Content-Type: text/plain; charset=\"utf-8\"\r\n\
         MIME-Version: 1.0\r\n\
         Content-Transfer-Encoding: 8bit\r\n\
         To: {to}\r\n\
         From: {from}\r\n\
         Subject: {subject}\r\n\
         \r\n\
         {body}"
    ))
}

fn header_value<'a>(header: &str, value: &'a str) -> Result<&'a str> {
    if value.contains(['\r', '\n']) {
        return Err(MailError::InvalidHeader {
            header: header.into(),
            details: "line breaks are not allowed".into(),
        });
    }
    Ok(value)
}

/// RFC 2047 `B`-encode non-ASCII header text, split on char boundaries
fn encode_header_text(value: &str) -> String {
    if value.is_ascii() {
        return value.to_string();
    }

    let mut words = Vec::new();
    let mut start = 0;
    for (idx, ch) in value.char_indices() {
        if idx + ch.len_utf8() - start > ENCODED_WORD_BYTES {
            words.push(&value[start..idx]);
            start = idx;
        }
    }
    words.push(&value[start..]);

    words
        .iter()
        .map(|word| format!("=?utf-8?b?{}?=", STANDARD.encode(word)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode the URL-safe base64 `raw` field of a message
pub fn decode_raw(raw: &str) -> Result<Vec<u8>> {
    URL_SAFE_LENIENT
        .decode(raw.trim())
        .map_err(|e| MailError::Decode(e.to_string()))
}

/// Pick the readable body of a parsed message.
///
/// Multipart messages are searched depth-first, skipping attachments; the
/// first `text/plain` part wins, then the first `text/html` part. A
/// single-part message is returned only when it is text or HTML.
pub fn email_content(parsed: &ParsedMail) -> Result<Option<String>> {
    if parsed.subparts.is_empty() {
        let content_type = parsed.ctype.mimetype.to_lowercase();
        if content_type == "text/plain" || content_type == "text/html" {
            return decode_body(parsed).map(Some);
        }
        return Ok(None);
    }

    let part = find_part(parsed, "text/plain").or_else(|| find_part(parsed, "text/html"));

    match part {
        Some(part) => {
            debug!("Selected {} body part", part.ctype.mimetype);
            decode_body(part).map(Some)
        }
        None => Ok(None),
    }
}

fn find_part<'p, 'a>(parsed: &'p ParsedMail<'a>, mimetype: &str) -> Option<&'p ParsedMail<'a>> {
    for part in &parsed.subparts {
        if is_attachment(part) {
            continue;
        }

        if part.subparts.is_empty() {
            if part.ctype.mimetype.eq_ignore_ascii_case(mimetype) {
                return Some(part);
            }
        } else if let Some(found) = find_part(part, mimetype) {
            return Some(found);
        }
    }

    None
}

fn is_attachment(part: &ParsedMail) -> bool {
    part.get_content_disposition().disposition == DispositionType::Attachment
}

fn decode_body(part: &ParsedMail) -> Result<String> {
    part.get_body().map_err(|e| MailError::Decode(e.to_string()))
}

/// A raw RFC 5322 message fetched from the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeMessage {
    bytes: Vec<u8>,
}

impl MimeMessage {
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Decode the service's URL-safe base64 `raw` field
    pub fn from_raw(raw: &str) -> Result<Self> {
        decode_raw(raw).map(Self::new)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn parse(&self) -> Result<ParsedMail<'_>> {
        mailparse::parse_mail(&self.bytes).map_err(|e| MailError::Structure(e.to_string()))
    }

    /// Readable body, see [`email_content`]
    pub fn content(&self) -> Result<Option<String>> {
        let parsed = self.parse()?;
        email_content(&parsed)
    }

    pub fn subject(&self) -> Result<Option<String>> {
        let parsed = self.parse()?;
        Ok(parsed.headers.get_first_value("Subject"))
    }
}
