//! Error types for the work-order services.

use thiserror::Error;

/// Error classification shown to the user.
///
/// Every [`WorkOrderError`] maps onto exactly one code; callers decide how to
/// present a failure from the code alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Bad, missing or unselected input. The user corrects and retries.
    Validation,
    /// A customer with the same name already exists.
    DuplicateName,
    /// A product with the same code already exists.
    DuplicateCode,
    /// Stale id or code reference.
    NotFound,
    /// Quantity outside the accepted bounds.
    Range,
    /// The record store refused a write.
    StorageFull,
    /// Neither document path produced output.
    RenderingFailed,
    /// Underlying I/O or serialization failure.
    Internal,
}

/// Main error type for the work-order services.
#[derive(Debug, Error)]
pub enum WorkOrderError {
    #[error("{message}")]
    Validation { message: String },

    #[error("customer required")]
    CustomerRequired,

    #[error("must select from list: '{input}'")]
    UnselectedProduct { input: String },

    #[error("A customer named '{name}' already exists")]
    DuplicateName { name: String },

    #[error("Product code '{code}' already exists")]
    DuplicateCode { code: String },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Quantity must be between {min} and {max}, got {quantity}")]
    QuantityOutOfRange { quantity: i64, min: u32, max: u32 },

    #[error("Storage is full while writing '{key}'; export and prune old records")]
    StorageFull { key: String },

    #[error("Document rendering failed (primary: {primary}; fallback: {fallback})")]
    RenderingFailed { primary: String, fallback: String },

    #[error("Rendering engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkOrderError {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        WorkOrderError::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a missing record.
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        WorkOrderError::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Get the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            WorkOrderError::Validation { .. } => ErrorCode::Validation,
            WorkOrderError::CustomerRequired => ErrorCode::Validation,
            WorkOrderError::UnselectedProduct { .. } => ErrorCode::Validation,
            WorkOrderError::DuplicateName { .. } => ErrorCode::DuplicateName,
            WorkOrderError::DuplicateCode { .. } => ErrorCode::DuplicateCode,
            WorkOrderError::NotFound { .. } => ErrorCode::NotFound,
            WorkOrderError::QuantityOutOfRange { .. } => ErrorCode::Range,
            WorkOrderError::StorageFull { .. } => ErrorCode::StorageFull,
            WorkOrderError::RenderingFailed { .. } => ErrorCode::RenderingFailed,
            WorkOrderError::Engine(_) => ErrorCode::RenderingFailed,
            WorkOrderError::Io(_) => ErrorCode::Internal,
            WorkOrderError::Json(_) => ErrorCode::Internal,
        }
    }

    /// Whether the user can fix the input and retry the same operation.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self.code(),
            ErrorCode::RenderingFailed | ErrorCode::Internal
        )
    }
}

/// Result type alias for work-order operations.
pub type Result<T> = std::result::Result<T, WorkOrderError>;
