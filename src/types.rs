//! Mail-service resource models
//!
//! Field names follow the service's camelCase JSON so responses deserialize
//! directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a message as returned by a listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// One page of a message listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    /// Absent from the response when the mailbox is empty
    #[serde(default)]
    pub messages: Vec<MessageRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_size_estimate: Option<u32>,
}

impl MessageList {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// More pages are available
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.next_page_token.is_some()
    }
}

/// A message resource; which fields are populated depends on the
/// requested [`MessageFormat`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    #[serde(default)]
    pub label_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,

    /// Milliseconds since the Unix epoch, as a decimal string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_estimate: Option<u64>,

    /// Header tree (metadata and full formats)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePart>,

    /// URL-safe base64 of the full RFC 5322 message (raw format)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl Message {
    /// Look up a top-level header value, ignoring case
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// When the service received the message
    #[must_use]
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        let millis = self.internal_date.as_deref()?.trim().parse::<i64>().ok()?;
        DateTime::from_timestamp_millis(millis)
    }
}

/// A MIME part as described by the service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(default)]
    pub headers: Vec<Header>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// A saved draft and the message it wraps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub id: String,
    pub message: Message,
}

/// Request body for sending a message or creating a draft
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// URL-safe base64 of the RFC 5322 message
    pub raw: String,
}

/// How much of a message the service should return
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    Minimal,
    #[default]
    Full,
    Raw,
    Metadata,
}

impl MessageFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Full => "full",
            Self::Raw => "raw",
            Self::Metadata => "metadata",
        }
    }
}

impl fmt::Display for MessageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
