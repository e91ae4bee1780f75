//! The [`ClosetStore`] trait and the SQL shared by its backends.
//!
//! Handlers only see the trait; [`crate::mysql::MySqlStore`] serves
//! production and [`crate::sqlite::SqliteStore`] serves local runs and tests.

use std::future::Future;

use serde::Deserialize;

use crate::db::DbQueryError;
use crate::error::ApiError;
use crate::model::{ClothingRow, NewClothingItem, NewOutfit, OutfitRow};

pub(crate) const LIST_CLOTHES_SQL: &str =
    "SELECT id, type, color, style, occasion, image FROM clothes WHERE image IS NOT NULL ORDER BY id";

pub(crate) const SEARCH_CLOTHES_BASE_SQL: &str =
    "SELECT id, type, color, style, occasion, image FROM clothes WHERE 1=1";

pub(crate) const LIST_OUTFIT_ROWS_SQL: &str = "SELECT o.id AS outfit_id, o.name, o.description, o.created_at, o.updated_at, \
     c.id AS clothes_id, c.type, c.color, c.style, c.occasion, c.image \
     FROM outfits o \
     LEFT JOIN outfit_items oi ON o.id = oi.outfit_id \
     LEFT JOIN clothes c ON oi.clothes_id = c.id \
     ORDER BY o.id, c.id";

pub(crate) const INSERT_CLOTHING_SQL: &str =
    "INSERT INTO clothes (type, color, style, occasion, image) VALUES (?, ?, ?, ?, ?)";
pub(crate) const INSERT_OUTFIT_SQL: &str = "INSERT INTO outfits (name, description) VALUES (?, ?)";
pub(crate) const INSERT_OUTFIT_ITEMS_PREFIX: &str = "INSERT INTO outfit_items (outfit_id, clothes_id) ";
pub(crate) const DELETE_CLOTHING_SQL: &str = "DELETE FROM clothes WHERE id = ?";
pub(crate) const DELETE_OUTFIT_ITEMS_SQL: &str = "DELETE FROM outfit_items WHERE outfit_id = ?";
pub(crate) const DELETE_OUTFIT_SQL: &str = "DELETE FROM outfits WHERE id = ?";

/// Query string of `GET /search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}

/// Columns whose distinct values `GET /options` may list. Parsing a client
/// string into this enum is the only way a column name reaches SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionColumn {
    Type,
    Color,
    Style,
    Occasion,
}

impl OptionColumn {
    pub const ALL: [Self; 4] = [Self::Type, Self::Color, Self::Style, Self::Occasion];

    pub const fn as_sql_column(&self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Color => "color",
            Self::Style => "style",
            Self::Occasion => "occasion",
        }
    }

    pub fn parse(category: &str) -> Result<Self, ApiError> {
        Self::ALL
            .into_iter()
            .find(|column| column.as_sql_column() == category)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid category: {category}")))
    }

    pub(crate) fn distinct_sql(&self) -> String {
        let column = self.as_sql_column();
        format!("SELECT DISTINCT {column} AS value FROM clothes WHERE {column} IS NOT NULL ORDER BY {column}")
    }
}

/// A search statement and the values to bind to its placeholders, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSql {
    sql: String,
    params: Vec<String>,
}

impl SearchSql {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }
}

/// Substring match over the four text columns when `search` is present, plus
/// an exact style match when `category` is `style`. An empty `search` counts
/// as absent.
pub fn build_search_sql(query: &SearchQuery) -> SearchSql {
    let mut sql = String::from(SEARCH_CLOTHES_BASE_SQL);
    let mut params = Vec::new();

    let search = query.search.as_deref().filter(|s| !s.is_empty());

    if let Some(term) = search {
        sql.push_str(" AND (type LIKE ? OR style LIKE ? OR occasion LIKE ? OR color LIKE ?)");
        let pattern = format!("%{term}%");
        params.extend(std::iter::repeat_n(pattern, 4));

        if query.category.as_deref() == Some(OptionColumn::Style.as_sql_column()) {
            sql.push_str(" AND style = ?");
            params.push(term.to_string());
        }
    }

    sql.push_str(" ORDER BY id");
    SearchSql { sql, params }
}

/// Storage operations behind the closet routes.
///
/// Calls wait in the pool's queue when every connection is busy. Multi-statement
/// writes run in a single transaction.
pub trait ClosetStore: Send + Sync + 'static {
    /// All clothes that have an image, by id.
    fn list_clothes(&self) -> impl Future<Output = Result<Vec<ClothingRow>, DbQueryError>> + Send + '_;

    fn search_clothes(
        &self,
        query: SearchQuery,
    ) -> impl Future<Output = Result<Vec<ClothingRow>, DbQueryError>> + Send + '_;

    /// Flat rows of the outfit join, ordered by outfit id.
    fn list_outfit_rows(&self) -> impl Future<Output = Result<Vec<OutfitRow>, DbQueryError>> + Send + '_;

    fn distinct_values(
        &self,
        column: OptionColumn,
    ) -> impl Future<Output = Result<Vec<String>, DbQueryError>> + Send + '_;

    /// Inserts a clothing item and returns its generated id.
    fn add_clothing(
        &self,
        item: NewClothingItem,
    ) -> impl Future<Output = Result<i64, DbQueryError>> + Send + '_;

    /// Inserts an outfit with its junction rows and returns the outfit id.
    fn create_outfit(
        &self,
        outfit: NewOutfit,
    ) -> impl Future<Output = Result<i64, DbQueryError>> + Send + '_;

    /// Returns `false` when no clothing item had this id.
    fn delete_clothing(&self, id: i64) -> impl Future<Output = Result<bool, DbQueryError>> + Send + '_;

    /// Returns `false` when no outfit had this id.
    fn delete_outfit(&self, id: i64) -> impl Future<Output = Result<bool, DbQueryError>> + Send + '_;
}

/// Drops repeated ids, keeping first occurrences, so the junction primary key
/// is never violated by the request itself.
pub(crate) fn unique_item_ids(items: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::with_capacity(items.len());
    items.iter().copied().filter(|id| seen.insert(*id)).collect()
}
