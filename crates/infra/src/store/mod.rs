//! Persistence boundary for items, the movement ledger, users and settings.
//!
//! The traits make no storage assumptions. Two backends ship with the crate:
//! [`InMemoryStore`] for tests/dev and [`SqliteStore`] for durable local data.

pub mod in_memory;
pub mod sqlite;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use r#trait::{
    ItemStore, MovementLedger, OrphanPolicy, Settings, SettingsStore, StockStore, StoreError,
    StoreResult, UserStore,
};
pub use sqlite::SqliteStore;
