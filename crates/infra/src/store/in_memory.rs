use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stockroom_auth::User;
use stockroom_core::{ItemId, MovementId, UserId};
use stockroom_inventory::{BalanceUpdate, Item, Movement, MovementRequest, balance};

use super::r#trait::{
    ItemStore, MovementLedger, OrphanPolicy, Settings, SettingsStore, StoreError, StoreResult,
    UserStore,
};

#[derive(Debug, Default)]
struct Tables {
    items: HashMap<ItemId, Item>,
    movements: HashMap<MovementId, Movement>,
    users: HashMap<UserId, User>,
    settings: Option<Settings>,
}

impl Tables {
    fn code_taken_by_other(&self, code: &str, id: ItemId) -> bool {
        self.items.values().any(|i| i.code == code && i.id != id)
    }

    fn references_to(&self, item_id: ItemId) -> u64 {
        self.movements.values().filter(|m| m.item_id == item_id).count() as u64
    }
}

/// In-memory store.
///
/// Intended for tests/dev. All four tables sit behind one lock, so the
/// balance-update procedure is atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))
    }
}

#[async_trait]
impl ItemStore for InMemoryStore {
    async fn insert_item(&self, item: &Item) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.code_taken_by_other(&item.code, item.id) {
            return Err(StoreError::DuplicateCode(item.code.clone()));
        }
        if tables.items.contains_key(&item.id) {
            return Err(StoreError::Storage(format!("item id {} already exists", item.id)));
        }
        tables.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    async fn find_item_by_code(&self, code: &str) -> StoreResult<Option<Item>> {
        Ok(self.read()?.items.values().find(|i| i.code == code).cloned())
    }

    async fn replace_item(&self, item: &Item) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.items.contains_key(&item.id) {
            return Err(StoreError::item_not_found(item.id));
        }
        if tables.code_taken_by_other(&item.code, item.id) {
            return Err(StoreError::DuplicateCode(item.code.clone()));
        }
        tables.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn delete_item(&self, id: ItemId, policy: OrphanPolicy) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.items.contains_key(&id) {
            return Err(StoreError::item_not_found(id));
        }
        if policy == OrphanPolicy::Block {
            let movements = tables.references_to(id);
            if movements > 0 {
                return Err(StoreError::ItemReferenced { item_id: id, movements });
            }
        }
        tables.items.remove(&id);
        Ok(())
    }

    async fn list_items(&self) -> StoreResult<Vec<Item>> {
        Ok(self.read()?.items.values().cloned().collect())
    }
}

#[async_trait]
impl MovementLedger for InMemoryStore {
    async fn record_movement(
        &self,
        item_id: ItemId,
        request: &MovementRequest,
        movement_id: MovementId,
        at: DateTime<Utc>,
    ) -> StoreResult<BalanceUpdate> {
        let mut tables = self.write()?;

        let item = tables
            .items
            .get(&item_id)
            .ok_or_else(|| StoreError::item_not_found(item_id))?;

        if tables.movements.contains_key(&movement_id) {
            let msg = format!("movement id {movement_id} already exists");
            return Err(StoreError::Storage(msg));
        }

        let update = balance::record(item, request, movement_id, at)?;

        // Movement first, then the balance; both under the same guard.
        tables.movements.insert(movement_id, update.movement.clone());
        tables.items.insert(item_id, update.item.clone());

        Ok(update)
    }

    async fn list_movements(&self) -> StoreResult<Vec<Movement>> {
        Ok(self.read()?.movements.values().cloned().collect())
    }

    async fn movements_for_item(&self, item_id: ItemId) -> StoreResult<Vec<Movement>> {
        Ok(self
            .read()?
            .movements
            .values()
            .filter(|m| m.item_id == item_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::DuplicateUsername(user.username.clone()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[async_trait]
impl SettingsStore for InMemoryStore {
    async fn load_settings(&self) -> StoreResult<Settings> {
        Ok(self.read()?.settings.unwrap_or_default())
    }

    async fn save_settings(&self, settings: &Settings) -> StoreResult<()> {
        self.write()?.settings = Some(*settings);
        Ok(())
    }
}
