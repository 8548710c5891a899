// Enforce at crate level
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Email Preprocessing
//!
//! Prepares email bodies for a downstream text analysis call with a fixed
//! input budget, plus thin helpers over a remote mail service.
//!
//! # Features
//!
//! - Quoted reply/forward stripping
//! - Whitespace normalization
//! - Token-budget truncation with a pluggable reporter
//! - Paragraph-aware chunking
//! - Plain-text message composition and raw MIME body selection
//! - Typed mail-service client over an opaque transport
//!
//! # Example
//!
//! ```rust
//! use email_prep::{preprocess_email, split_email_content, TracingReporter};
//!
//! let raw = "Thanks,   see below.\n\nOn Monday Bob wrote:\n> hi\n\nCheers";
//! let text = preprocess_email(raw, 5000, &TracingReporter);
//!
//! assert_eq!(text, "Thanks, see below.\n\nCheers");
//! assert_eq!(split_email_content(&text, 4000).len(), 1);
//! ```

mod client;
mod error;
mod mime;
mod normalize;
mod types;

pub use client::{ApiRequest, MailClient, MailService};
pub use error::{MailError, Result};
pub use mime::{MimeMessage, compose_plain_text, create_message, decode_raw, email_content};
pub use normalize::*;
pub use types::*;
