//! Narrow interface over the remote mail service
//!
//! Authentication, transport and pagination live behind [`MailService`];
//! [`MailClient`] only shapes requests and types the responses.

use crate::error::{MailError, Result};
use crate::mime::MimeMessage;
use crate::normalize::{Preprocessor, TruncationReporter};
use crate::types::{Draft, Message, MessageFormat, MessageList, OutgoingMessage};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

/// A call against the mail service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    ListMessages {
        user_id: String,
    },
    GetMessage {
        user_id: String,
        id: String,
        format: MessageFormat,
    },
    SendMessage {
        user_id: String,
        message: OutgoingMessage,
    },
    CreateDraft {
        user_id: String,
        message: OutgoingMessage,
    },
}

impl ApiRequest {
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::ListMessages { .. } | Self::GetMessage { .. } => "GET",
            Self::SendMessage { .. } | Self::CreateDraft { .. } => "POST",
        }
    }

    /// Resource path relative to the service root
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::ListMessages { user_id } => format!("users/{user_id}/messages"),
            Self::GetMessage { user_id, id, .. } => format!("users/{user_id}/messages/{id}"),
            Self::SendMessage { user_id, .. } => format!("users/{user_id}/messages/send"),
            Self::CreateDraft { user_id, .. } => format!("users/{user_id}/drafts"),
        }
    }

    #[must_use]
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::GetMessage { format, .. } => vec![("format", format.as_str().to_string())],
            _ => Vec::new(),
        }
    }

    /// JSON request body, if the call has one
    #[must_use]
    pub fn body(&self) -> Option<Value> {
        match self {
            Self::SendMessage { message, .. } => Some(json!({ "raw": message.raw })),
            Self::CreateDraft { message, .. } => Some(json!({ "message": { "raw": message.raw } })),
            _ => None,
        }
    }
}

/// Executes requests against the remote service and returns the decoded
/// JSON response
pub trait MailService {
    fn execute(&self, request: &ApiRequest) -> Result<Value>;
}

impl<S: MailService + ?Sized> MailService for &S {
    fn execute(&self, request: &ApiRequest) -> Result<Value> {
        (**self).execute(request)
    }
}

/// Typed access to one user's mailbox
#[derive(Debug, Clone)]
pub struct MailClient<S> {
    service: S,
    user_id: String,
}

impl<S: MailService> MailClient<S> {
    #[must_use]
    pub fn new(service: S, user_id: impl Into<String>) -> Self {
        Self {
            service,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub const fn service(&self) -> &S {
        &self.service
    }

    /// First page of the mailbox listing
    pub fn list_messages(&self) -> Result<MessageList> {
        self.call(&ApiRequest::ListMessages {
            user_id: self.user_id.clone(),
        })
    }

    /// Message headers and labels, without the body
    pub fn get_message(&self, id: &str) -> Result<Message> {
        self.fetch(id, MessageFormat::Metadata)
    }

    /// Fetch the full RFC 5322 source of a message
    pub fn get_mime_message(&self, id: &str) -> Result<MimeMessage> {
        let message = self.fetch(id, MessageFormat::Raw)?;

        if let Some(snippet) = &message.snippet {
            info!("Message snippet: {snippet}");
        }

        let raw = message
            .raw
            .ok_or_else(|| MailError::Decode(format!("message {id} has no raw payload")))?;
        MimeMessage::from_raw(&raw)
    }

    pub fn send_message(&self, message: &OutgoingMessage) -> Result<Message> {
        let sent: Message = self.call(&ApiRequest::SendMessage {
            user_id: self.user_id.clone(),
            message: message.clone(),
        })?;
        info!("Message Id: {}", sent.id);
        Ok(sent)
    }

    pub fn create_draft(&self, message: &OutgoingMessage) -> Result<Draft> {
        let draft: Draft = self.call(&ApiRequest::CreateDraft {
            user_id: self.user_id.clone(),
            message: message.clone(),
        })?;
        info!("Draft id: {}", draft.id);
        Ok(draft)
    }

    /// Fetch a message, select its readable body and run it through
    /// `preprocessor`. `None` when the message has no text or HTML body.
    pub fn fetch_email_content<R: TruncationReporter>(
        &self,
        id: &str,
        preprocessor: &Preprocessor<R>,
    ) -> Result<Option<String>> {
        let mime = self.get_mime_message(id)?;
        Ok(mime.content()?.map(|body| preprocessor.preprocess(&body)))
    }

    fn fetch(&self, id: &str, format: MessageFormat) -> Result<Message> {
        self.call(&ApiRequest::GetMessage {
            user_id: self.user_id.clone(),
            id: id.to_string(),
            format,
        })
    }

    fn call<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        debug!("{} {}", request.method(), request.path());

        let value = self
            .service
            .execute(request)
            .inspect_err(|e| warn!("{} {} failed: {e}", request.method(), request.path()))?;

        Ok(serde_json::from_value(value)?)
    }
}
