//! [`MySqlStore`], the production backend.

use sqlx::migrate::Migrator;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{Connection, MySql, MySqlConnection, MySqlPool, QueryBuilder};
use tracing::info;

use crate::config::MySqlSettings;
use crate::db::{self, DbQueryError};
use crate::model::{ClothingRow, NewClothingItem, NewOutfit, OutfitRow};
use crate::store::{
    build_search_sql, unique_item_ids, ClosetStore, OptionColumn, SearchQuery,
    DELETE_CLOTHING_SQL, DELETE_OUTFIT_ITEMS_SQL, DELETE_OUTFIT_SQL, INSERT_CLOTHING_SQL,
    INSERT_OUTFIT_ITEMS_PREFIX, INSERT_OUTFIT_SQL, LIST_CLOTHES_SQL, LIST_OUTFIT_ROWS_SQL,
};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations/mysql");

/// Live connections are capped here; further acquisitions wait in the pool's queue
/// under the pool's default acquire settings.
const MAX_CONNECTIONS: u32 = 10;

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

fn server_options(settings: &MySqlSettings) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .password(&settings.password)
}

/// Creates the database named in `settings` and its tables if missing. Runs
/// on a connection that has no database selected, so it works against a
/// fresh server.
pub async fn initialize_schema(settings: &MySqlSettings) -> Result<(), sqlx::Error> {
    info!("Initializing database...");
    let mut conn = MySqlConnection::connect_with(&server_options(settings)).await?;
    info!("Connected to MySQL at {}:{}", settings.host, settings.port);

    // Identifiers cannot be bound; the name is restricted to [A-Za-z0-9_] by config.
    let create = format!("CREATE DATABASE IF NOT EXISTS `{}`", settings.database);
    sqlx::raw_sql(&create).execute(&mut conn).await?;
    info!("Database '{}' created or already exists", settings.database);

    let use_database = format!("USE `{}`", settings.database);
    sqlx::raw_sql(&use_database).execute(&mut conn).await?;

    MIGRATOR.run(&mut conn).await?;
    info!("Tables 'clothes', 'outfits' and 'outfit_items' are set up");

    conn.close().await
}

impl MySqlStore {
    /// Initialises the schema, then opens the shared pool. The pool connects
    /// eagerly so a bad host or credentials fail here rather than on the first
    /// request.
    pub async fn connect(settings: &MySqlSettings) -> Result<Self, sqlx::Error> {
        initialize_schema(settings).await?;

        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(server_options(settings).database(&settings.database))
            .await?;

        info!("Connected to MySQL database (max connections: {})", MAX_CONNECTIONS);
        Ok(Self { pool })
    }
}

impl ClosetStore for MySqlStore {
    async fn list_clothes(&self) -> Result<Vec<ClothingRow>, DbQueryError> {
        Ok(sqlx::query_as::<_, ClothingRow>(LIST_CLOTHES_SQL)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn search_clothes(&self, query: SearchQuery) -> Result<Vec<ClothingRow>, DbQueryError> {
        let search = build_search_sql(&query);
        let mut db_query = sqlx::query_as::<_, ClothingRow>(search.sql());
        for param in search.params() {
            db_query = db_query.bind(param);
        }
        Ok(db_query.fetch_all(&self.pool).await?)
    }

    async fn list_outfit_rows(&self) -> Result<Vec<OutfitRow>, DbQueryError> {
        Ok(sqlx::query_as::<_, OutfitRow>(LIST_OUTFIT_ROWS_SQL)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn distinct_values(&self, column: OptionColumn) -> Result<Vec<String>, DbQueryError> {
        let sql = column.distinct_sql();
        Ok(sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn add_clothing(&self, item: NewClothingItem) -> Result<i64, DbQueryError> {
        let result = sqlx::query(INSERT_CLOTHING_SQL)
            .bind(&item.kind)
            .bind(&item.color)
            .bind(&item.style)
            .bind(&item.occasion)
            .bind(item.image.as_ref())
            .execute(&self.pool)
            .await?;
        db::insert_id(result.last_insert_id())
    }

    async fn create_outfit(&self, outfit: NewOutfit) -> Result<i64, DbQueryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(INSERT_OUTFIT_SQL)
            .bind(&outfit.name)
            .bind(&outfit.description)
            .execute(&mut *tx)
            .await?;
        let outfit_id = db::insert_id(result.last_insert_id())?;

        let items = unique_item_ids(&outfit.items);
        if !items.is_empty() {
            let mut builder = QueryBuilder::<MySql>::new(INSERT_OUTFIT_ITEMS_PREFIX);
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
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_outfit(&self, id: i64) -> Result<bool, DbQueryError> {
        let mut tx = self.pool.begin().await?;
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
