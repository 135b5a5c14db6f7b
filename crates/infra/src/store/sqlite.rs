//! SQLite-backed store for durable local data.
//!
//! Ids and prices are stored as TEXT (uuid / decimal string form), timestamps
//! as RFC 3339 TEXT. The schema is created on connect.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use stockroom_auth::User;
use stockroom_core::{ItemId, MovementId, UserId};
use stockroom_inventory::{BalanceUpdate, Item, Movement, MovementKind, MovementRequest, balance};

use super::r#trait::{
    ItemStore, MovementLedger, OrphanPolicy, Settings, SettingsStore, StoreError, StoreResult,
    UserStore,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS items (
        id          TEXT PRIMARY KEY NOT NULL,
        code        TEXT NOT NULL UNIQUE,
        name        TEXT NOT NULL,
        location    TEXT NOT NULL,
        category    TEXT NOT NULL,
        quantity    INTEGER NOT NULL CHECK (quantity >= 0),
        price       TEXT NOT NULL,
        min_stock   INTEGER NULL,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS movements (
        id            TEXT PRIMARY KEY NOT NULL,
        item_id       TEXT NOT NULL,
        item_name     TEXT NOT NULL,
        kind          TEXT NOT NULL,
        quantity      INTEGER NOT NULL,
        reason        TEXT NOT NULL,
        performed_by  TEXT NOT NULL,
        timestamp     TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_movements_timestamp ON movements (timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_movements_item_id ON movements (item_id)",
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id             TEXT PRIMARY KEY NOT NULL,
        username       TEXT NOT NULL UNIQUE,
        email          TEXT NOT NULL,
        password_hash  TEXT NOT NULL,
        created_at     TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS settings (
        id         INTEGER PRIMARY KEY CHECK (id = 1),
        dark_mode  INTEGER NOT NULL
    )
    "#,
];

const ITEM_COLUMNS: &str =
    "id, code, name, location, category, quantity, price, min_stock, created_at, updated_at";

const MOVEMENT_COLUMNS: &str =
    "id, item_id, item_name, kind, quantity, reason, performed_by, timestamp";

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        StoreError::Storage(value.to_string())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn corrupt(column: &str, detail: impl core::fmt::Display) -> StoreError {
    StoreError::Storage(format!("corrupt value in column '{column}': {detail}"))
}

fn parse_column<T>(row: &SqliteRow, column: &str) -> StoreResult<T>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>().map_err(|e| corrupt(column, e))
}

fn u32_column(row: &SqliteRow, column: &str) -> StoreResult<u32> {
    let raw: i64 = row.try_get(column)?;
    u32::try_from(raw).map_err(|e| corrupt(column, e))
}

fn item_from_row(row: &SqliteRow) -> StoreResult<Item> {
    let min_stock: Option<i64> = row.try_get("min_stock")?;
    Ok(Item {
        id: parse_column::<ItemId>(row, "id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        location: row.try_get("location")?,
        category: row.try_get("category")?,
        quantity: u32_column(row, "quantity")?,
        price: parse_column::<Decimal>(row, "price")?,
        min_stock: min_stock
            .map(u32::try_from)
            .transpose()
            .map_err(|e| corrupt("min_stock", e))?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn movement_from_row(row: &SqliteRow) -> StoreResult<Movement> {
    Ok(Movement {
        id: parse_column::<MovementId>(row, "id")?,
        item_id: parse_column::<ItemId>(row, "item_id")?,
        item_name: row.try_get("item_name")?,
        kind: parse_column::<MovementKind>(row, "kind")?,
        quantity: u32_column(row, "quantity")?,
        reason: row.try_get("reason")?,
        user: row.try_get("performed_by")?,
        timestamp: row.try_get::<DateTime<Utc>, _>("timestamp")?,
    })
}

fn user_from_row(row: &SqliteRow) -> StoreResult<User> {
    Ok(User {
        id: parse_column::<UserId>(row, "id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

/// SQLite-backed store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and ensure the schema.
    ///
    /// In-memory URLs get a single, never-recycled connection so every query
    /// sees the same database.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options.connect_with(options).await?;
        Self::from_pool(pool).await
    }

    /// Private in-memory database, mostly for tests.
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        tracing::debug!("sqlite schema ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ItemStore for SqliteStore {
    async fn insert_item(&self, item: &Item) -> StoreResult<()> {
        let result = sqlx::query(&format!(
            "INSERT INTO items ({ITEM_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ))
        .bind(item.id.to_string())
        .bind(&item.code)
        .bind(&item.name)
        .bind(&item.location)
        .bind(&item.category)
        .bind(i64::from(item.quantity))
        .bind(item.price.to_string())
        .bind(item.min_stock.map(i64::from))
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateCode(item.code.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn find_item_by_code(&self, code: &str) -> StoreResult<Option<Item>> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE code = ?1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn replace_item(&self, item: &Item) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET code = ?2, name = ?3, location = ?4, category = ?5, quantity = ?6,
                price = ?7, min_stock = ?8, created_at = ?9, updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(item.id.to_string())
        .bind(&item.code)
        .bind(&item.name)
        .bind(&item.location)
        .bind(&item.category)
        .bind(i64::from(item.quantity))
        .bind(item.price.to_string())
        .bind(item.min_stock.map(i64::from))
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(StoreError::item_not_found(item.id)),
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateCode(item.code.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_item(&self, id: ItemId, policy: OrphanPolicy) -> StoreResult<()> {
        let key = id.to_string();
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM items WHERE id = ?1")
            .bind(&key)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !exists {
            return Err(StoreError::item_not_found(id));
        }

        if policy == OrphanPolicy::Block {
            let movements: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM movements WHERE item_id = ?1")
                    .bind(&key)
                    .fetch_one(&mut *tx)
                    .await?;
            if movements > 0 {
                return Err(StoreError::ItemReferenced {
                    item_id: id,
                    movements: movements as u64,
                });
            }
        }

        sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(&key)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_items(&self) -> StoreResult<Vec<Item>> {
        let rows = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(item_from_row).collect()
    }
}

#[async_trait]
impl MovementLedger for SqliteStore {
    async fn record_movement(
        &self,
        item_id: ItemId,
        request: &MovementRequest,
        movement_id: MovementId,
        at: DateTime<Utc>,
    ) -> StoreResult<BalanceUpdate> {
        // Dropping `tx` on any early return rolls both writes back.
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"))
            .bind(item_id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        let item = match row {
            Some(row) => item_from_row(&row)?,
            None => return Err(StoreError::item_not_found(item_id)),
        };

        let update = balance::record(&item, request, movement_id, at)?;
        let m = &update.movement;

        sqlx::query(&format!(
            "INSERT INTO movements ({MOVEMENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        ))
        .bind(m.id.to_string())
        .bind(m.item_id.to_string())
        .bind(&m.item_name)
        .bind(m.kind.as_str())
        .bind(i64::from(m.quantity))
        .bind(&m.reason)
        .bind(&m.user)
        .bind(m.timestamp)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE items SET quantity = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(item_id.to_string())
            .bind(i64::from(update.item.quantity))
            .bind(update.item.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(update)
    }

    async fn list_movements(&self) -> StoreResult<Vec<Movement>> {
        let rows = sqlx::query(&format!("SELECT {MOVEMENT_COLUMNS} FROM movements"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(movement_from_row).collect()
    }

    async fn movements_for_item(&self, item_id: ItemId) -> StoreResult<Vec<Movement>> {
        let sql = format!("SELECT {MOVEMENT_COLUMNS} FROM movements WHERE item_id = ?1");
        let rows = sqlx::query(&sql)
            .bind(item_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(movement_from_row).collect()
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::DuplicateUsername(user.username.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = ?1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }
}

#[async_trait]
impl SettingsStore for SqliteStore {
    async fn load_settings(&self) -> StoreResult<Settings> {
        let dark_mode: Option<bool> =
            sqlx::query_scalar("SELECT dark_mode FROM settings WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(dark_mode.map(|dark_mode| Settings { dark_mode }).unwrap_or_default())
    }

    async fn save_settings(&self, settings: &Settings) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (id, dark_mode) VALUES (1, ?1)
            ON CONFLICT (id) DO UPDATE SET dark_mode = excluded.dark_mode
            "#,
        )
        .bind(settings.dark_mode)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
