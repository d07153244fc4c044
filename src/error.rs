//! # Error Types
//!
//! This module defines error types used throughout the sitecore-layout library.
//!
//! Caller misuse ([`LayoutError::Argument`]) is returned immediately. Runtime
//! failures of the editing flow ([`LayoutError::ItemNotFound`],
//! [`LayoutError::Transport`]) are collected into
//! [`EditingResponse::errors`](crate::editing::EditingResponse) instead.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for sitecore-layout operations
#[derive(Debug, Error)]
pub enum LayoutError {
    /// Invalid call-time input (empty JSON text, empty handler name)
    #[error("Invalid argument '{name}': {message}")]
    Argument { name: &'static str, message: String },

    /// A field could not be decoded into the requested shape
    #[error(transparent)]
    FieldDecode(#[from] FieldDecodeError),

    /// The editing request could not address an item
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Upstream HTTP/GraphQL failure, timeout or non-success status
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Layout JSON that is not syntactically valid
    #[error("Malformed layout JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LayoutError {
    pub fn argument(name: &'static str, message: impl Into<String>) -> Self {
        LayoutError::Argument {
            name,
            message: message.into(),
        }
    }

    /// Transport failure with no underlying cause (status codes, GraphQL errors).
    pub fn transport(message: impl Into<String>) -> Self {
        LayoutError::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Transport failure wrapping the error that caused it.
    pub fn transport_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        LayoutError::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn is_item_not_found(&self) -> bool {
        matches!(self, LayoutError::ItemNotFound(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, LayoutError::Transport { .. })
    }
}

/// A field's raw JSON could not satisfy the requested type.
#[derive(Debug, Error)]
#[error("cannot decode field as {type_name}: {message}")]
pub struct FieldDecodeError {
    /// Rust type name that was requested.
    pub type_name: &'static str,
    pub message: String,
}
