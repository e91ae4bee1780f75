//! [`SqliteStore`], the embedded backend used for local runs and tests.

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::db::DbQueryError;
use crate::model::{ClothingRow, NewClothingItem, NewOutfit, OutfitRow};
use crate::store::{
    build_search_sql, unique_item_ids, ClosetStore, OptionColumn, SearchQuery,
    DELETE_CLOTHING_SQL, DELETE_OUTFIT_ITEMS_SQL, DELETE_OUTFIT_SQL, INSERT_CLOTHING_SQL,
    INSERT_OUTFIT_ITEMS_PREFIX, INSERT_OUTFIT_SQL, LIST_CLOTHES_SQL, LIST_OUTFIT_ROWS_SQL,
};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations/sqlite");

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// SQLite is single writer only, having more in the pool just results in locking and other issues.
// So instead just queue it on our side until SQLite is free again.
const WRITE_POOL_MAX_CONNECTIONS: u32 = 1;
const READ_POOL_MAX_CONNECTIONS: u32 = 10;

#[derive(Clone)]
pub struct SqliteStore {
    read: SqlitePool,
    write: SqlitePool,
}

fn build_connection_options(database_url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
    Ok(SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT))
}

impl SqliteStore {
    /// Opens (or creates) the database at `database_url` and creates the
    /// closet tables if they are missing.
    pub async fn open(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = build_connection_options(database_url)?;

        let write = SqlitePoolOptions::new()
            .max_connections(WRITE_POOL_MAX_CONNECTIONS)
            .connect_with(options.clone())
            .await?;

        MIGRATOR.run(&write).await?;
        info!("SQLite schema ready at {}", database_url);

        let read = SqlitePoolOptions::new()
            .max_connections(READ_POOL_MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        info!(
            "DB pools initialised (read: {}, write: {})",
            READ_POOL_MAX_CONNECTIONS, WRITE_POOL_MAX_CONNECTIONS
        );

        Ok(Self { read, write })
    }
}

impl ClosetStore for SqliteStore {
    async fn list_clothes(&self) -> Result<Vec<ClothingRow>, DbQueryError> {
        Ok(sqlx::query_as::<_, ClothingRow>(LIST_CLOTHES_SQL)
            .fetch_all(&self.read)
            .await?)
    }

    async fn search_clothes(&self, query: SearchQuery) -> Result<Vec<ClothingRow>, DbQueryError> {
        let search = build_search_sql(&query);
        let mut db_query = sqlx::query_as::<_, ClothingRow>(search.sql());
        for param in search.params() {
            db_query = db_query.bind(param);
        }
        Ok(db_query.fetch_all(&self.read).await?)
    }

    async fn list_outfit_rows(&self) -> Result<Vec<OutfitRow>, DbQueryError> {
        Ok(sqlx::query_as::<_, OutfitRow>(LIST_OUTFIT_ROWS_SQL)
            .fetch_all(&self.read)
            .await?)
    }

    async fn distinct_values(&self, column: OptionColumn) -> Result<Vec<String>, DbQueryError> {
        let sql = column.distinct_sql();
        Ok(sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(&self.read)
            .await?)
    }

    async fn add_clothing(&self, item: NewClothingItem) -> Result<i64, DbQueryError> {
        let result = sqlx::query(INSERT_CLOTHING_SQL)
            .bind(&item.kind)
            .bind(&item.color)
            .bind(&item.style)
            .bind(&item.occasion)
            .bind(item.image.as_ref())
            .execute(&self.write)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn create_outfit(&self, outfit: NewOutfit) -> Result<i64, DbQueryError> {
        let mut tx = self.write.begin().await?;

        let result = sqlx::query(INSERT_OUTFIT_SQL)
            .bind(&outfit.name)
            .bind(&outfit.description)
            .execute(&mut *tx)
            .await?;
        let outfit_id = result.last_insert_rowid();

        let items = unique_item_ids(&outfit.items);
        if !items.is_empty() {
            let mut builder = QueryBuilder::<Sqlite>::new(INSERT_OUTFIT_ITEMS_PREFIX);
            builder.push_values(items, |mut row, clothes_id| {
                row.push_bind(outfit_id).push_bind(clothes_id);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(outfit_id)
    }

    async fn delete_clothing(&self, id: i64) -> Result<bool, DbQueryError> {
        let result = sqlx::query(DELETE_CLOTHING_SQL)
            .bind(id)
            .execute(&self.write)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_outfit(&self, id: i64) -> Result<bool, DbQueryError> {
        let mut tx = self.write.begin().await?;
        sqlx::query(DELETE_OUTFIT_ITEMS_SQL)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query(DELETE_OUTFIT_SQL)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
