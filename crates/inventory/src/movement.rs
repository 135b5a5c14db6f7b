use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, ItemId, MovementId};

/// Kind of stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Increases the balance by the movement quantity.
    Entry,
    /// Decreases the balance by the movement quantity, floored at zero.
    Exit,
    /// Sets the balance to the movement quantity.
    Adjustment,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Entry => "entry",
            MovementKind::Exit => "exit",
            MovementKind::Adjustment => "adjustment",
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entry" => Ok(MovementKind::Entry),
            "exit" => Ok(MovementKind::Exit),
            "adjustment" => Ok(MovementKind::Adjustment),
            other => Err(DomainError::validation(format!(
                "unknown movement kind '{other}' (expected entry, exit or adjustment)"
            ))),
        }
    }
}

/// A request to move stock for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRequest {
    pub kind: MovementKind,
    /// Magnitude for entries/exits, target balance for adjustments.
    pub quantity: u32,
    pub reason: String,
    #[serde(default)]
    pub user: String,
}

impl MovementRequest {
    pub fn new(kind: MovementKind, quantity: u32, reason: impl Into<String>) -> Self {
        Self {
            kind,
            quantity,
            reason: reason.into(),
            user: String::new(),
        }
    }

    pub fn entry(quantity: u32, reason: impl Into<String>) -> Self {
        Self::new(MovementKind::Entry, quantity, reason)
    }

    pub fn exit(quantity: u32, reason: impl Into<String>) -> Self {
        Self::new(MovementKind::Exit, quantity, reason)
    }

    pub fn adjustment(quantity: u32, reason: impl Into<String>) -> Self {
        Self::new(MovementKind::Adjustment, quantity, reason)
    }

    /// Attribute the movement to `user`.
    pub fn by(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Caller-side preconditions: quantity of at least one and a reason.
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity == 0 {
            return Err(DomainError::validation("movement quantity must be at least 1"));
        }
        if self.reason.trim().is_empty() {
            return Err(DomainError::validation("movement reason is required"));
        }
        Ok(())
    }
}

/// An appended ledger record. Never edited or deleted once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    /// Weak reference; the item may have been deleted since.
    pub item_id: ItemId,
    /// Item name at the time of the movement. Not kept in sync with renames.
    pub item_name: String,
    pub kind: MovementKind,
    pub quantity: u32,
    pub reason: String,
    pub user: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_its_text_form() {
        for kind in [MovementKind::Entry, MovementKind::Exit, MovementKind::Adjustment] {
            assert_eq!(kind.as_str().parse::<MovementKind>().unwrap(), kind);
        }
        assert!("transfer".parse::<MovementKind>().is_err());
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&MovementKind::Adjustment).unwrap(),
            "\"adjustment\""
        );
    }

    #[test]
    fn validate_requires_positive_quantity_and_reason() {
        assert!(MovementRequest::entry(1, "restock").validate().is_ok());

        match MovementRequest::entry(0, "restock").validate() {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("at least 1")),
            other => panic!("Expected Validation error, got {other:?}"),
        }

        match MovementRequest::exit(3, "  ").validate() {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("reason")),
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }
}
