//! Error types for the mail-service helpers

use thiserror::Error;

/// Errors that can occur while talking to the mail service or decoding
/// what it returns
#[derive(Error, Debug)]
pub enum MailError {
    /// The remote call itself failed
    #[error("Mail service request failed: {0}")]
    Service(String),

    /// The service answered with a body we could not interpret
    #[error("Malformed service response: {0}")]
    Response(#[from] serde_json::Error),

    /// Failed to decode message content
    #[error("Failed to decode content: {0}")]
    Decode(String),

    /// Failed to parse the MIME structure
    #[error("Failed to parse email structure: {0}")]
    Structure(String),

    /// Header value that cannot be written into a message
    #[error("Invalid header value for {header}: {details}")]
    InvalidHeader { header: String, details: String },
}

/// Result type for mail-service operations
pub type Result<T> = std::result::Result<T, MailError>;
