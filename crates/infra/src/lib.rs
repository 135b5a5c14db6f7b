//! Infrastructure layer: storage backends, configuration and the application
//! services built on them.

pub mod app;
pub mod config;
pub mod services;
pub mod store;


pub use app::Stockroom;
pub use config::StockroomConfig;
pub use services::{
    BalanceCheck, Gatekeeper, InventoryService, Ledger, ServiceResult, StockroomError,
};
pub use store::{InMemoryStore, OrphanPolicy, Settings, SqliteStore, StockStore, StoreError};
