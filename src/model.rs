//! Row types shared by both storage backends and the JSON shapes handlers
//! send back.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::api_constants::IMAGE_MEDIA_TYPE;

const UNNAMED_OUTFIT: &str = "Unnamed Outfit";
const NO_DESCRIPTION: &str = "No description";
const UNKNOWN_ATTRIBUTE: &str = "Unknown";

#[derive(Debug, Clone, FromRow)]
pub struct ClothingRow {
    pub id: i64,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub color: String,
    pub style: String,
    pub occasion: String,
    pub image: Vec<u8>,
}

/// One row of the outfits -> outfit_items -> clothes left join. Every clothes
/// column is null for an outfit with no items.
#[derive(Debug, Clone, FromRow)]
pub struct OutfitRow {
    pub outfit_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub clothes_id: Option<i64>,
    #[sqlx(rename = "type")]
    pub kind: Option<String>,
    pub color: Option<String>,
    pub style: Option<String>,
    pub occasion: Option<String>,
    pub image: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct NewClothingItem {
    pub kind: String,
    pub color: String,
    pub style: String,
    pub occasion: String,
    pub image: Bytes,
}

#[derive(Debug, Clone)]
pub struct NewOutfit {
    pub name: String,
    pub description: Option<String>,
    pub items: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClothingView {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub color: String,
    pub style: String,
    pub occasion: String,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
}

impl From<ClothingRow> for ClothingView {
    fn from(row: ClothingRow) -> Self {
        Self {
            id: row.id,
            kind: row.kind,
            color: row.color,
            style: row.style,
            occasion: row.occasion,
            image_url: Some(image_data_uri(&row.image)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutfitView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub items: Vec<ClothingView>,
}

pub fn image_data_uri(image: &[u8]) -> String {
    format!("data:{IMAGE_MEDIA_TYPE};base64,{}", B64.encode(image))
}

fn or_placeholder(value: Option<String>, placeholder: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| placeholder.to_string())
}

/// Folds flat join rows into one object per outfit, ordered by outfit id.
/// Rows without a clothes id only register the outfit itself.
pub fn group_outfit_rows(rows: Vec<OutfitRow>) -> Vec<OutfitView> {
    let mut outfits: BTreeMap<i64, OutfitView> = BTreeMap::new();

    for row in rows {
        let outfit = outfits.entry(row.outfit_id).or_insert_with(|| OutfitView {
            id: row.outfit_id,
            name: or_placeholder(Some(row.name.clone()), UNNAMED_OUTFIT),
            description: or_placeholder(row.description.clone(), NO_DESCRIPTION),
            created_at: row.created_at,
            updated_at: row.updated_at,
            items: Vec::new(),
        });

        let Some(clothes_id) = row.clothes_id else {
            continue;
        };

        outfit.items.push(ClothingView {
            id: clothes_id,
            kind: or_placeholder(row.kind, UNKNOWN_ATTRIBUTE),
            color: or_placeholder(row.color, UNKNOWN_ATTRIBUTE),
            style: or_placeholder(row.style, UNKNOWN_ATTRIBUTE),
            occasion: or_placeholder(row.occasion, UNKNOWN_ATTRIBUTE),
            image_url: row.image.as_deref().map(image_data_uri),
        });
    }

    outfits.into_values().collect()
}
