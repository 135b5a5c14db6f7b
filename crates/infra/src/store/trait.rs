use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_auth::User;
use stockroom_core::{DomainError, ItemId, MovementId, UserId};
use stockroom_inventory::{BalanceUpdate, Item, Movement, MovementRequest};

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operation error.
///
/// Constraint violations are reported distinctly from generic failures so
/// callers can tell "already exists" apart from "storage broke".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("an item with code '{0}' already exists")]
    DuplicateCode(String),

    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("item {item_id} is still referenced by {movements} movement(s)")]
    ItemReferenced { item_id: ItemId, movements: u64 },

    /// Rejected by a domain rule checked inside the atomic scope.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                StoreError::Validation(msg)
            }
        }
    }
}

impl StoreError {
    pub fn item_not_found(id: ItemId) -> Self {
        Self::NotFound {
            entity: "item",
            id: id.to_string(),
        }
    }
}

/// What happens to ledger records when their item is deleted.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// Delete the item; its movements stay as historical orphans.
    #[default]
    Retain,
    /// Refuse to delete an item while any movement references it.
    Block,
}

/// Single-row user preferences.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub dark_mode: bool,
}

/// Item table. `code` is unique across all items.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Insert a new item. Fails with `DuplicateCode` if the code is taken.
    async fn insert_item(&self, item: &Item) -> StoreResult<()>;

    async fn get_item(&self, id: ItemId) -> StoreResult<Option<Item>>;

    async fn find_item_by_code(&self, code: &str) -> StoreResult<Option<Item>>;

    /// Replace the whole record with the same id.
    ///
    /// Fails with `NotFound` for unknown ids and `DuplicateCode` when the new
    /// code belongs to another item.
    async fn replace_item(&self, item: &Item) -> StoreResult<()>;

    /// Delete an item. Movements are never cascaded; `policy` decides whether
    /// referenced items may be deleted at all.
    async fn delete_item(&self, id: ItemId, policy: OrphanPolicy) -> StoreResult<()>;

    /// All items, in no particular order.
    async fn list_items(&self) -> StoreResult<Vec<Item>>;
}

/// Append-only movement ledger.
#[async_trait]
pub trait MovementLedger: Send + Sync {
    /// Run the balance-update procedure for `item_id` and persist both the
    /// movement and the item's new quantity as one atomic unit.
    ///
    /// Nothing is written if the item does not exist or either write fails.
    async fn record_movement(
        &self,
        item_id: ItemId,
        request: &MovementRequest,
        movement_id: MovementId,
        at: DateTime<Utc>,
    ) -> StoreResult<BalanceUpdate>;

    /// All movements, in no particular order.
    async fn list_movements(&self) -> StoreResult<Vec<Movement>>;

    /// Movements referencing `item_id`, in no particular order.
    async fn movements_for_item(&self, item_id: ItemId) -> StoreResult<Vec<Movement>>;
}

/// Registered users. `username` is unique.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Stored settings, or defaults if none were saved yet.
    async fn load_settings(&self) -> StoreResult<Settings>;

    async fn save_settings(&self, settings: &Settings) -> StoreResult<()>;
}

/// Everything the application needs from one backend.
pub trait StockStore: ItemStore + MovementLedger + UserStore + SettingsStore {}

impl<S> StockStore for S where S: ItemStore + MovementLedger + UserStore + SettingsStore {}
