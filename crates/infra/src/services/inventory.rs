//! Item CRUD and the derived dashboard views.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use stockroom_core::ItemId;
use stockroom_inventory::{DashboardStats, Item, ItemUpdate, NewItem, stats};

use crate::services::error::{ServiceResult, StockroomError};
use crate::store::{ItemStore, OrphanPolicy, StoreError};

#[derive(Debug)]
pub struct InventoryService<S> {
    store: Arc<S>,
    orphan_policy: OrphanPolicy,
}

impl<S> InventoryService<S> {
    pub fn new(store: Arc<S>, orphan_policy: OrphanPolicy) -> Self {
        Self { store, orphan_policy }
    }

    pub fn orphan_policy(&self) -> OrphanPolicy {
        self.orphan_policy
    }
}

impl<S> InventoryService<S>
where
    S: ItemStore,
{
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_item(&self, input: NewItem) -> ServiceResult<Item> {
        let item = Item::create(ItemId::new(), input, Utc::now())?;

        match self.store.insert_item(&item).await {
            Ok(()) => {
                info!(item_id = %item.id, "item created");
                Ok(item)
            }
            Err(e @ StoreError::DuplicateCode(_)) => {
                warn!(code = %item.code, "rejected duplicate item code");
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_item(&self, id: ItemId) -> ServiceResult<Item> {
        self.store
            .get_item(id)
            .await?
            .ok_or_else(|| StoreError::item_not_found(id).into())
    }

    pub async fn find_by_code(&self, code: &str) -> ServiceResult<Option<Item>> {
        Ok(self.store.find_item_by_code(code.trim()).await?)
    }

    /// Apply a partial edit and persist the full resulting record.
    #[instrument(skip(self, update), fields(item_id = %id))]
    pub async fn update_item(&self, id: ItemId, update: ItemUpdate) -> ServiceResult<Item> {
        let current = self.get_item(id).await?;
        let next = current.apply_update(update, Utc::now())?;
        self.store.replace_item(&next).await?;
        info!("item updated");
        Ok(next)
    }

    #[instrument(skip(self), fields(item_id = %id, policy = ?self.orphan_policy))]
    pub async fn delete_item(&self, id: ItemId) -> ServiceResult<()> {
        match self.store.delete_item(id, self.orphan_policy).await {
            Ok(()) => {
                info!("item deleted");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "item delete rejected");
                Err(StockroomError::from(e))
            }
        }
    }

    pub async fn list_items(&self) -> ServiceResult<Vec<Item>> {
        Ok(self.store.list_items().await?)
    }

    pub async fn low_stock_items(&self) -> ServiceResult<Vec<Item>> {
        let items = self.store.list_items().await?;
        Ok(stats::low_stock(&items).into_iter().cloned().collect())
    }

    pub async fn categories(&self) -> ServiceResult<BTreeSet<String>> {
        let items = self.store.list_items().await?;
        Ok(stats::categories(&items))
    }

    pub async fn dashboard(&self) -> ServiceResult<DashboardStats> {
        let items = self.store.list_items().await?;
        Ok(DashboardStats::compute(&items))
    }
}
