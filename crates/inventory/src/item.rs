use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, ItemId};

/// Category assigned to items created without one.
pub const DEFAULT_CATEGORY: &str = "General";

/// Low-stock threshold used when an item carries no `min_stock`.
pub const DEFAULT_MIN_STOCK: u32 = 10;

/// A stock item as persisted by the item store.
///
/// `quantity` is a cached balance: it is changed by edits and by the balance
/// update procedure (see [`crate::balance::record`]), never derived on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub code: String,
    pub name: String,
    pub location: String,
    pub category: String,
    pub quantity: u32,
    pub price: Decimal,
    pub min_stock: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub code: String,
    pub quantity: u32,
    pub price: Decimal,
    pub location: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub min_stock: Option<u32>,
}

/// Partial edit of an item. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub quantity: Option<u32>,
    pub price: Option<Decimal>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub min_stock: Option<u32>,
}

impl Item {
    /// Build a new item record from validated input.
    pub fn create(id: ItemId, input: NewItem, created_at: DateTime<Utc>) -> DomainResult<Self> {
        let code = normalize_code(&input.code)?;
        ensure_name(&input.name)?;
        ensure_price(input.price)?;

        Ok(Self {
            id,
            code,
            name: input.name.trim().to_string(),
            location: input.location.trim().to_string(),
            category: normalize_category(input.category.as_deref()),
            quantity: input.quantity,
            price: input.price,
            min_stock: input.min_stock,
            created_at,
            updated_at: created_at,
        })
    }

    /// Produce the full replacement record for a partial edit.
    ///
    /// `id` and `created_at` never change. `updated_at` moves to `at` but never
    /// backwards, since movements check their time against it.
    pub fn apply_update(&self, update: ItemUpdate, at: DateTime<Utc>) -> DomainResult<Self> {
        let mut next = self.clone();

        if let Some(name) = update.name {
            ensure_name(&name)?;
            next.name = name.trim().to_string();
        }
        if let Some(code) = update.code {
            next.code = normalize_code(&code)?;
        }
        if let Some(quantity) = update.quantity {
            next.quantity = quantity;
        }
        if let Some(price) = update.price {
            ensure_price(price)?;
            next.price = price;
        }
        if let Some(location) = update.location {
            next.location = location.trim().to_string();
        }
        if let Some(category) = update.category {
            next.category = normalize_category(Some(&category));
        }
        if let Some(min_stock) = update.min_stock {
            next.min_stock = Some(min_stock);
        }

        next.updated_at = at.max(self.updated_at);
        Ok(next)
    }

    /// Threshold at or below which the item counts as low stock.
    pub fn effective_min_stock(&self) -> u32 {
        self.min_stock.unwrap_or(DEFAULT_MIN_STOCK)
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.effective_min_stock()
    }

    /// Category for grouping, with blank categories folded into the default.
    pub fn category_or_default(&self) -> &str {
        let trimmed = self.category.trim();
        if trimmed.is_empty() { DEFAULT_CATEGORY } else { trimmed }
    }

    /// On-hand value of the item (`quantity * price`).
    pub fn stock_value(&self) -> Decimal {
        Decimal::from(self.quantity) * self.price
    }
}

fn normalize_code(code: &str) -> DomainResult<String> {
    let code = code.trim();
    if code.is_empty() {
        return Err(DomainError::validation("code cannot be empty"));
    }
    Ok(code.to_string())
}

fn ensure_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(())
}

fn ensure_price(price: Decimal) -> DomainResult<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(DomainError::validation("price cannot be negative"));
    }
    Ok(())
}

fn normalize_category(category: Option<&str>) -> String {
    match category.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => DEFAULT_CATEGORY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn laptop() -> NewItem {
        NewItem {
            name: "Laptop".to_string(),
            code: "LPT-001".to_string(),
            quantity: 50,
            price: Decimal::new(120000, 2),
            location: "Warehouse A".to_string(),
            category: Some("Electronics".to_string()),
            min_stock: Some(10),
        }
    }

    #[test]
    fn create_keeps_all_fields_and_stamps_both_timestamps() {
        let id = ItemId::new();
        let item = Item::create(id, laptop(), t0()).unwrap();

        assert_eq!(item.id, id);
        assert_eq!(item.code, "LPT-001");
        assert_eq!(item.quantity, 50);
        assert_eq!(item.price, Decimal::new(120000, 2));
        assert_eq!(item.category, "Electronics");
        assert_eq!(item.created_at, t0());
        assert_eq!(item.updated_at, t0());
    }

    #[test]
    fn create_defaults_blank_category_to_general() {
        let mut input = laptop();
        input.category = Some("   ".to_string());
        let item = Item::create(ItemId::new(), input, t0()).unwrap();
        assert_eq!(item.category, DEFAULT_CATEGORY);

        let mut input = laptop();
        input.category = None;
        let item = Item::create(ItemId::new(), input, t0()).unwrap();
        assert_eq!(item.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn create_rejects_blank_code() {
        let mut input = laptop();
        input.code = "  ".to_string();
        let err = Item::create(ItemId::new(), input, t0()).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for blank code"),
        }
    }

    #[test]
    fn create_rejects_negative_price() {
        let mut input = laptop();
        input.price = Decimal::new(-1, 2);
        assert!(matches!(
            Item::create(ItemId::new(), input, t0()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn update_only_touches_provided_fields() {
        let item = Item::create(ItemId::new(), laptop(), t0()).unwrap();
        let later = t0() + chrono::Duration::minutes(5);

        let updated = item
            .apply_update(
                ItemUpdate {
                    name: Some("Updated Laptop".to_string()),
                    quantity: Some(75),
                    price: Some(Decimal::new(129999, 2)),
                    ..Default::default()
                },
                later,
            )
            .unwrap();

        assert_eq!(updated.name, "Updated Laptop");
        assert_eq!(updated.quantity, 75);
        assert_eq!(updated.price, Decimal::new(129999, 2));
        assert_eq!(updated.code, item.code);
        assert_eq!(updated.location, item.location);
        assert_eq!(updated.created_at, item.created_at);
        assert_eq!(updated.updated_at, later);
    }

    #[test]
    fn update_never_moves_updated_at_backwards() {
        let item = Item::create(ItemId::new(), laptop(), t0()).unwrap();
        let earlier = t0() - chrono::Duration::hours(1);

        let updated = item
            .apply_update(
                ItemUpdate {
                    location: Some("Warehouse B".to_string()),
                    ..Default::default()
                },
                earlier,
            )
            .unwrap();

        assert_eq!(updated.location, "Warehouse B");
        assert_eq!(updated.updated_at, t0());
    }

    #[test]
    fn missing_min_stock_falls_back_to_ten() {
        let mut input = laptop();
        input.min_stock = None;
        input.quantity = 10;
        let item = Item::create(ItemId::new(), input, t0()).unwrap();
        assert_eq!(item.effective_min_stock(), DEFAULT_MIN_STOCK);
        assert!(item.is_low_stock());
    }

    #[test]
    fn low_stock_boundary_is_inclusive() {
        let mut input = laptop();
        input.min_stock = Some(7);

        input.quantity = 7;
        assert!(Item::create(ItemId::new(), input.clone(), t0()).unwrap().is_low_stock());

        input.quantity = 8;
        assert!(!Item::create(ItemId::new(), input, t0()).unwrap().is_low_stock());
    }

    #[test]
    fn new_item_deserializes_without_optional_fields() {
        let input: NewItem = serde_json::from_str(
            r#"{"name":"Cable","code":"CB-1","quantity":3,"price":"2.50","location":"Shelf 2"}"#,
        )
        .unwrap();
        assert_eq!(input.category, None);
        assert_eq!(input.min_stock, None);
        assert_eq!(input.price, Decimal::new(250, 2));
    }
}
