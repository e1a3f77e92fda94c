use serde::{Deserialize, Serialize};

pub mod events;
pub mod node;
pub mod paging;

// Re-export event types
pub use events::{DeliveryQueue, DomainEvent, EventKind, MoveKind};

// Re-export node types
pub use node::{Node, NodeKind, SyncStatus};

// Re-export paging types
pub use paging::{ListQuery, Page, PageRequest};

/// Structured error types for page fetches.
///
/// A fetch failure never mutates list state; the variant tells the
/// presentation layer how to react.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Authentication expired")]
    AuthenticationExpired,

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        ApiError::NetworkError {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        ApiError::MalformedResponse {
            message: message.into(),
        }
    }

    /// Transient failures the user may retry by paging or refreshing again
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::NetworkError { .. })
    }

    /// The session is gone; the caller must re-authenticate before retrying
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, ApiError::AuthenticationExpired)
    }
}
