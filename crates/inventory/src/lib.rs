//! Inventory domain module.
//!
//! Business rules for stock items and the movement ledger, implemented purely
//! as deterministic domain logic (no IO, no storage). Storage adapters live in
//! `stockroom-infra`.

pub mod balance;
pub mod item;
pub mod movement;
pub mod stats;

pub use balance::{BalanceUpdate, next_quantity, record, replay};
pub use item::{DEFAULT_CATEGORY, DEFAULT_MIN_STOCK, Item, ItemUpdate, NewItem};
pub use movement::{Movement, MovementKind, MovementRequest};
pub use stats::{DashboardStats, categories, low_stock, sort_recent_first};
