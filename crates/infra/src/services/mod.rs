//! Application services: the layer the UI talks to.
//!
//! Services validate input, stamp ids and timestamps, delegate persistence to
//! a store backend and log the outcome. They hold no domain rules themselves.

pub mod error;
pub mod gatekeeper;
pub mod inventory;
pub mod ledger;

pub use error::{ServiceResult, StockroomError};
pub use gatekeeper::Gatekeeper;
pub use inventory::InventoryService;
pub use ledger::{BalanceCheck, Ledger};
