use thiserror::Error;

use stockroom_auth::{PasswordError, SessionError};
use stockroom_core::{DomainError, ItemId};

use crate::store::StoreError;

pub type ServiceResult<T> = Result<T, StockroomError>;

/// Flat error taxonomy surfaced to the UI layer.
///
/// Every failure is reported once; nothing is retried automatically.
#[derive(Debug, Error)]
pub enum StockroomError {
    /// Input rejected before anything was written.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("an item with code '{0}' already exists")]
    DuplicateCode(String),

    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Delete refused because movements still reference the item.
    #[error("item {item_id} is still referenced by {movements} movement(s)")]
    ItemReferenced { item_id: ItemId, movements: u64 },

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("session is not valid: {0}")]
    InvalidSession(String),

    /// Opaque storage or infrastructure failure.
    #[error("operation failed: {0}")]
    Storage(String),
}

impl From<StoreError> for StockroomError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateCode(code) => StockroomError::DuplicateCode(code),
            StoreError::DuplicateUsername(name) => StockroomError::DuplicateUsername(name),
            StoreError::NotFound { entity, id } => StockroomError::NotFound { entity, id },
            StoreError::ItemReferenced { item_id, movements } => {
                StockroomError::ItemReferenced { item_id, movements }
            }
            StoreError::Validation(msg) => StockroomError::Validation(msg),
            StoreError::Storage(msg) => StockroomError::Storage(msg),
        }
    }
}

impl From<DomainError> for StockroomError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                StockroomError::Validation(msg)
            }
        }
    }
}

impl From<PasswordError> for StockroomError {
    fn from(value: PasswordError) -> Self {
        StockroomError::Storage(value.to_string())
    }
}

impl From<SessionError> for StockroomError {
    fn from(value: SessionError) -> Self {
        StockroomError::InvalidSession(value.to_string())
    }
}

impl StockroomError {
    /// True for uniqueness violations ("already exists" in the UI).
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            StockroomError::DuplicateCode(_) | StockroomError::DuplicateUsername(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StockroomError::NotFound { .. })
    }
}
