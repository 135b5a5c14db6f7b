//! `stockroom-core`: shared domain building blocks.
//!
//! Identifiers and the domain error model. No storage or IO.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{ItemId, MovementId, UserId};
