//! Derived views over the item table and the ledger.
//!
//! Everything here is recomputed from the records passed in; nothing is cached.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::item::Item;
use crate::movement::Movement;

/// Dashboard summary of the item table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_items: usize,
    pub total_quantity: u64,
    pub total_value: Decimal,
    pub low_stock_items: usize,
    pub categories: usize,
}

impl DashboardStats {
    pub fn compute(items: &[Item]) -> Self {
        Self {
            total_items: items.len(),
            total_quantity: items.iter().map(|i| u64::from(i.quantity)).sum(),
            total_value: items.iter().map(Item::stock_value).sum(),
            low_stock_items: items.iter().filter(|i| i.is_low_stock()).count(),
            categories: categories(items).len(),
        }
    }
}

/// Distinct categories, with blank ones counted as the default category.
pub fn categories(items: &[Item]) -> BTreeSet<String> {
    items
        .iter()
        .map(|i| i.category_or_default().to_string())
        .collect()
}

/// Items at or below their minimum threshold.
pub fn low_stock(items: &[Item]) -> Vec<&Item> {
    items.iter().filter(|i| i.is_low_stock()).collect()
}

/// Sort movements newest first. Equal timestamps fall back to the
/// time-ordered movement id.
pub fn sort_recent_first(movements: &mut [Movement]) {
    movements.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
}
