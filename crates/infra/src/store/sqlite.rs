//! SQLite-backed record store.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | Constraint | StoreError |
//! |------------|------------|------------|
//! | Database (unique violation) | `locations.name` | `DuplicateName` |
//! | Database (unique violation) | `inventory_items.position` | `DuplicatePosition` |
//! | Any other, inside the batch transaction | | `BatchCreateFailed` |
//! | Any other | | `Persistence` |
//!
//! ## Position allocation
//!
//! `create_items_batch` runs in one transaction whose first statement writes
//! the `position_watermark` row. That takes SQLite's write lock before the
//! high-water mark is read, so concurrent batches serialize instead of
//! computing overlapping ranges. The unique index on `position` stays as the
//! last line of defense against writers that bypass the watermark.
//!
//! ## Partial updates
//!
//! Template and item updates write only the columns the patch sets, and read
//! the row back inside the same transaction. Two patches touching different
//! fields of one row therefore both survive, whatever order they commit in.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Executor, QueryBuilder, Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, error, instrument, warn};

use curator_core::{DomainError, ItemId, LocationId, TemplateId};
use curator_inventory::{
    BatchRequest, ConservationState, InventoryItem, InventoryItemPatch, ItemTemplate,
    ItemTemplatePatch, Location, NewItemTemplate, NewLocation, Position, PositionAllocator,
};

use super::{InventoryStore, StoreError};

const SCHEMA: [&str; 5] = [
    r#"
    CREATE TABLE IF NOT EXISTS item_templates (
        id          TEXT PRIMARY KEY,
        asset_code  TEXT NOT NULL,
        name        TEXT NOT NULL,
        brand       TEXT NULL,
        model       TEXT NULL,
        item_type   TEXT NULL,
        color       TEXT NULL,
        dimensions  TEXT NULL,
        other       TEXT NULL,
        origin      TEXT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS locations (
        id    TEXT PRIMARY KEY,
        name  TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS inventory_items (
        id                  TEXT PRIMARY KEY,
        position            INTEGER NOT NULL UNIQUE,
        template_id         TEXT NOT NULL,
        location_id         TEXT NULL,
        serial              TEXT NULL,
        situation           TEXT NULL,
        conservation_state  TEXT NOT NULL,
        observations        TEXT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS position_watermark (
        id             INTEGER PRIMARY KEY CHECK (id = 1),
        last_position  INTEGER NOT NULL
    )
    "#,
    r#"
    INSERT OR IGNORE INTO position_watermark (id, last_position) VALUES (1, 0)
    "#,
];

/// Rows per multi-row INSERT; keeps bind parameters well under SQLite's limit.
const INSERT_CHUNK: usize = 500;

/// SQLite-backed record store.
///
/// Cheap to clone: `SqlitePool` is reference-counted. Open once at process
/// start, share the handle, call [`SqliteInventoryStore::close`] on shutdown.
#[derive(Debug, Clone)]
pub struct SqliteInventoryStore {
    pool: SqlitePool,
}

impl SqliteInventoryStore {
    /// Connect to `url` and create the schema if missing.
    ///
    /// In-memory databases are private to a connection, so they are pinned to
    /// a single connection that is never recycled.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| map_sqlx_error("parse_database_url", e))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        debug!(url, in_memory, "sqlite store ready");
        Ok(store)
    }

    /// Fresh private in-memory database (tests/dev).
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:", 1).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    /// Allocate and insert inside an already-open transaction.
    async fn write_batch(
        tx: &mut Transaction<'_, Sqlite>,
        request: &BatchRequest,
    ) -> Result<Vec<InventoryItem>, StoreError> {
        // Take the write lock before reading the mark.
        sqlx::query("UPDATE position_watermark SET last_position = last_position WHERE id = 1")
            .execute(&mut **tx)
            .await
            .map_err(|e| map_batch_error("lock_watermark", e))?;

        let high_water = read_high_water(tx).await?;
        let mut allocator = PositionAllocator::starting_after(high_water);
        let rows = request.plan(&mut allocator)?;

        insert_rows(tx, &rows).await?;
        advance_watermark(tx, allocator.last()).await?;

        Ok(rows)
    }
}

#[async_trait]
impl InventoryStore for SqliteInventoryStore {
    #[instrument(skip(self), err)]
    async fn list_item_templates(&self) -> Result<Vec<ItemTemplate>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, asset_code, name, brand, model, item_type, color, dimensions, other, origin
            FROM item_templates
            ORDER BY name ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_item_templates", e))?;

        rows.iter().map(template_from_row).collect()
    }

    async fn get_item_template(&self, id: TemplateId) -> Result<Option<ItemTemplate>, StoreError> {
        select_template(&self.pool, id).await
    }

    #[instrument(skip(self, fields), fields(asset_code = %fields.asset_code), err)]
    async fn create_item_template(&self, fields: NewItemTemplate) -> Result<ItemTemplate, StoreError> {
        let template = fields.into_template(TemplateId::new())?;

        sqlx::query(
            r#"
            INSERT INTO item_templates (
                id, asset_code, name, brand, model, item_type, color, dimensions, other, origin
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(template.id.to_string())
        .bind(&template.asset_code)
        .bind(&template.name)
        .bind(&template.brand)
        .bind(&template.model)
        .bind(&template.item_type)
        .bind(&template.color)
        .bind(&template.dimensions)
        .bind(&template.other)
        .bind(&template.origin)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_item_template", e))?;

        Ok(template)
    }

    #[instrument(skip(self, patch), fields(template_id = %id), err)]
    async fn update_item_template(
        &self,
        id: TemplateId,
        patch: &ItemTemplatePatch,
    ) -> Result<ItemTemplate, StoreError> {
        let changes = patch.changes()?;
        if changes.is_empty() {
            return select_template(&self.pool, id).await?.ok_or(StoreError::NotFound);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_update_item_template", e))?;

        let affected = update_columns(&mut tx, "item_templates", id.to_string(), changes).await?;
        if affected == 0 {
            rollback(tx, "update_item_template").await;
            return Err(StoreError::NotFound);
        }
        let updated = select_template(&mut *tx, id).await?.ok_or(StoreError::NotFound)?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_update_item_template", e))?;
        Ok(updated)
    }

    #[instrument(skip(self), fields(template_id = %id), err)]
    async fn delete_item_template(&self, id: TemplateId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM item_templates WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_item_template", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_locations(&self) -> Result<Vec<Location>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM locations ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_locations", e))?;

        rows.iter().map(location_from_row).collect()
    }

    async fn get_location(&self, id: LocationId) -> Result<Option<Location>, StoreError> {
        let row = sqlx::query("SELECT id, name FROM locations WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_location", e))?;

        row.as_ref().map(location_from_row).transpose()
    }

    #[instrument(skip(self, fields), fields(name = %fields.name), err)]
    async fn create_location(&self, fields: NewLocation) -> Result<Location, StoreError> {
        let location = fields.into_location(LocationId::new())?;

        sqlx::query("INSERT INTO locations (id, name) VALUES (?1, ?2)")
            .bind(location.id.to_string())
            .bind(&location.name)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_location", e))?;

        Ok(location)
    }

    #[instrument(skip(self), fields(location_id = %id), err)]
    async fn update_location(&self, id: LocationId, name: &str) -> Result<Location, StoreError> {
        let name = Location::validate_name(name)?;

        let result = sqlx::query("UPDATE locations SET name = ?2 WHERE id = ?1")
            .bind(id.to_string())
            .bind(&name)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_location", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(Location { id, name })
    }

    #[instrument(skip(self), fields(location_id = %id), err)]
    async fn delete_location(&self, id: LocationId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM locations WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_location", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_inventory_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, position, template_id, location_id, serial, situation,
                   conservation_state, observations
            FROM inventory_items
            ORDER BY position ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_inventory_items", e))?;

        rows.iter().map(item_from_row).collect()
    }

    async fn get_inventory_item(&self, id: ItemId) -> Result<Option<InventoryItem>, StoreError> {
        select_item(&self.pool, id).await
    }

    #[instrument(
        skip(self, request),
        fields(
            template_id = %request.template_id,
            units = request.quantities.total(),
        ),
        err
    )]
    async fn create_items_batch(&self, request: &BatchRequest) -> Result<Vec<InventoryItem>, StoreError> {
        request.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_batch_error("begin_transaction", e))?;

        match Self::write_batch(&mut tx, request).await {
            Ok(rows) => {
                tx.commit()
                    .await
                    .map_err(|e| map_batch_error("commit_transaction", e))?;
                debug!(
                    first = rows.first().map(|r| r.position.value()),
                    last = rows.last().map(|r| r.position.value()),
                    "batch committed"
                );
                Ok(rows)
            }
            Err(err) => {
                rollback(tx, "batch").await;
                error!("batch insert failed: {err}");
                Err(err)
            }
        }
    }

    #[instrument(skip(self, patch), fields(item_id = %id), err)]
    async fn update_inventory_item(
        &self,
        id: ItemId,
        patch: &InventoryItemPatch,
    ) -> Result<InventoryItem, StoreError> {
        // Position is never among the changes: it is fixed at creation.
        let changes = patch.changes();
        if changes.is_empty() {
            return select_item(&self.pool, id).await?.ok_or(StoreError::NotFound);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_update_inventory_item", e))?;

        let affected = update_columns(&mut tx, "inventory_items", id.to_string(), changes).await?;
        if affected == 0 {
            rollback(tx, "update_inventory_item").await;
            return Err(StoreError::NotFound);
        }
        let updated = select_item(&mut *tx, id).await?.ok_or(StoreError::NotFound)?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_update_inventory_item", e))?;
        Ok(updated)
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn delete_inventory_item(&self, id: ItemId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM inventory_items WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_inventory_item", e))?;
        Ok(())
    }
}

async fn select_template<'e, E>(executor: E, id: TemplateId) -> Result<Option<ItemTemplate>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT id, asset_code, name, brand, model, item_type, color, dimensions, other, origin
        FROM item_templates
        WHERE id = ?1
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(executor)
    .await
    .map_err(|e| map_sqlx_error("get_item_template", e))?;

    row.as_ref().map(template_from_row).transpose()
}

async fn select_item<'e, E>(executor: E, id: ItemId) -> Result<Option<InventoryItem>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT id, position, template_id, location_id, serial, situation,
               conservation_state, observations
        FROM inventory_items
        WHERE id = ?1
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(executor)
    .await
    .map_err(|e| map_sqlx_error("get_inventory_item", e))?;

    row.as_ref().map(item_from_row).transpose()
}

/// `UPDATE <table> SET <column> = ?, ... WHERE id = ?` for just the given
/// columns. Being a write, it takes SQLite's write lock when it is the first
/// statement of `tx`. Returns the number of rows matched.
async fn update_columns(
    tx: &mut Transaction<'_, Sqlite>,
    table: &'static str,
    id: String,
    changes: Vec<(&'static str, Option<String>)>,
) -> Result<u64, StoreError> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!("UPDATE {table} SET "));
    let mut assignments = qb.separated(", ");
    for (column, value) in changes {
        assignments.push(format!("{column} = "));
        assignments.push_bind_unseparated(value);
    }
    qb.push(" WHERE id = ");
    qb.push_bind(id);

    let result = qb
        .build()
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error(&format!("update_{table}"), e))?;
    Ok(result.rows_affected())
}

async fn rollback(tx: Transaction<'_, Sqlite>, operation: &str) {
    if let Err(e) = tx.rollback().await {
        warn!("{operation} rollback failed: {e}");
    }
}

async fn read_high_water(tx: &mut Transaction<'_, Sqlite>) -> Result<Position, StoreError> {
    let row = sqlx::query(
        r#"
        SELECT MAX(
            COALESCE((SELECT MAX(position) FROM inventory_items), 0),
            COALESCE((SELECT last_position FROM position_watermark WHERE id = 1), 0)
        ) AS high_water
        "#,
    )
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_batch_error("read_high_water", e))?;

    let value: i64 = row
        .try_get("high_water")
        .map_err(|e| map_batch_error("read_high_water", e))?;
    Ok(Position::new(value)?)
}

async fn advance_watermark(
    tx: &mut Transaction<'_, Sqlite>,
    last: Position,
) -> Result<(), StoreError> {
    sqlx::query("UPDATE position_watermark SET last_position = MAX(last_position, ?1) WHERE id = 1")
        .bind(last.value())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_batch_error("advance_watermark", e))?;
    Ok(())
}

/// Stage planned rows as multi-row INSERTs inside `tx`.
async fn insert_rows(
    tx: &mut Transaction<'_, Sqlite>,
    rows: &[InventoryItem],
) -> Result<(), StoreError> {
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO inventory_items (id, position, template_id, location_id, serial, \
             situation, conservation_state, observations) ",
        );
        qb.push_values(chunk, |mut b, row| {
            b.push_bind(row.id.to_string())
                .push_bind(row.position.value())
                .push_bind(row.template_id.to_string())
                .push_bind(row.location_id.map(|l| l.to_string()))
                .push_bind(row.serial.clone())
                .push_bind(row.situation.clone())
                .push_bind(row.conservation_state.as_str())
                .push_bind(row.observations.clone());
        });

        qb.build()
            .execute(&mut **tx)
            .await
            .map_err(|e| map_batch_error("insert_items", e))?;
    }
    Ok(())
}

fn parse_column<T>(row: &SqliteRow, column: &str) -> Result<T, StoreError>
where
    T: FromStr<Err = DomainError>,
{
    let raw: String = row
        .try_get(column)
        .map_err(|e| map_sqlx_error("decode_row", e))?;
    raw.parse()
        .map_err(|e: DomainError| StoreError::Persistence(format!("column {column}: {e}")))
}

fn template_from_row(row: &SqliteRow) -> Result<ItemTemplate, StoreError> {
    let text = |column: &str| -> Result<Option<String>, StoreError> {
        row.try_get(column).map_err(|e| map_sqlx_error("decode_row", e))
    };

    Ok(ItemTemplate {
        id: parse_column(row, "id")?,
        asset_code: row
            .try_get("asset_code")
            .map_err(|e| map_sqlx_error("decode_row", e))?,
        name: row.try_get("name").map_err(|e| map_sqlx_error("decode_row", e))?,
        brand: text("brand")?,
        model: text("model")?,
        item_type: text("item_type")?,
        color: text("color")?,
        dimensions: text("dimensions")?,
        other: text("other")?,
        origin: text("origin")?,
    })
}

fn location_from_row(row: &SqliteRow) -> Result<Location, StoreError> {
    Ok(Location {
        id: parse_column(row, "id")?,
        name: row.try_get("name").map_err(|e| map_sqlx_error("decode_row", e))?,
    })
}

fn item_from_row(row: &SqliteRow) -> Result<InventoryItem, StoreError> {
    let text = |column: &str| -> Result<Option<String>, StoreError> {
        row.try_get(column).map_err(|e| map_sqlx_error("decode_row", e))
    };
    let location_id = text("location_id")?
        .map(|raw| raw.parse::<LocationId>())
        .transpose()
        .map_err(|e| StoreError::Persistence(format!("column location_id: {e}")))?;
    let position: i64 = row
        .try_get("position")
        .map_err(|e| map_sqlx_error("decode_row", e))?;

    Ok(InventoryItem {
        id: parse_column(row, "id")?,
        position: Position::new(position)?,
        template_id: parse_column(row, "template_id")?,
        location_id,
        serial: text("serial")?,
        situation: text("situation")?,
        conservation_state: parse_column::<ConservationState>(row, "conservation_state")?,
        observations: text("observations")?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = db_err.message().to_string();
            if db_err.is_unique_violation() {
                if msg.contains("locations.name") {
                    return StoreError::DuplicateName(msg);
                }
                if msg.contains("inventory_items.position") {
                    return StoreError::DuplicatePosition(msg);
                }
            }
            StoreError::Persistence(format!("database error in {operation}: {msg}"))
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::PoolClosed => {
            StoreError::Persistence(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Persistence(format!("{operation}: {other}")),
    }
}

/// Inside the batch transaction every failure except a position collision
/// is reported as a batch failure.
fn map_batch_error(operation: &str, err: sqlx::Error) -> StoreError {
    match map_sqlx_error(operation, err) {
        StoreError::DuplicatePosition(msg) => StoreError::DuplicatePosition(msg),
        other => StoreError::BatchCreateFailed(other.to_string()),
    }
}
