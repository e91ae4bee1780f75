use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::extract::{ClothingUpload, NumericId, OutfitPayload};
use crate::model::{group_outfit_rows, ClothingView, NewClothingItem, NewOutfit, OutfitView};
use crate::store::{ClosetStore, OptionColumn, SearchQuery};

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub message: String,
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct OptionsQuery {
    pub category: Option<String>,
}

/// `GET /closet/`
pub async fn list_clothes<S: ClosetStore>(
    State(store): State<Arc<S>>,
) -> Result<Json<Vec<ClothingView>>, ApiError> {
    let rows = store
        .list_clothes()
        .await
        .map_err(|e| e.into_api_error("listing clothes", "Couldn't get clothes"))?;
    Ok(Json(rows.into_iter().map(ClothingView::from).collect()))
}

/// `GET /closet/search?search=..&category=..`
pub async fn search_clothes<S: ClosetStore>(
    State(store): State<Arc<S>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ClothingView>>, ApiError> {
    let rows = store
        .search_clothes(query)
        .await
        .map_err(|e| e.into_api_error("searching clothes", "Error fetching clothes"))?;
    Ok(Json(rows.into_iter().map(ClothingView::from).collect()))
}

/// `GET /closet/outfits`
pub async fn list_outfits<S: ClosetStore>(
    State(store): State<Arc<S>>,
) -> Result<Json<Vec<OutfitView>>, ApiError> {
    let rows = store
        .list_outfit_rows()
        .await
        .map_err(|e| e.into_api_error("fetching outfits", "Failed to fetch outfits"))?;
    Ok(Json(group_outfit_rows(rows)))
}

/// `GET /closet/options?category=..`
pub async fn list_options<S: ClosetStore>(
    State(store): State<Arc<S>>,
    Query(query): Query<OptionsQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let Some(category) = query.category.filter(|c| !c.is_empty()) else {
        return Err(ApiError::bad_request("Category is required"));
    };
    let column = OptionColumn::parse(&category)?;

    let values = store
        .distinct_values(column)
        .await
        .map_err(|e| e.into_api_error("fetching options", "Failed to fetch options"))?;
    debug!("Options for {}: returning {} values", category, values.len());
    Ok(Json(values))
}

/// `POST /closet/add`, multipart with `type`, `color`, `style`, `occasion`
/// and an `image` file.
pub async fn add_clothing<S: ClosetStore>(
    State(store): State<Arc<S>>,
    upload: ClothingUpload,
) -> Result<Json<CreatedResponse>, ApiError> {
    let Some(image) = upload.image.filter(|bytes| !bytes.is_empty()) else {
        return Err(ApiError::bad_request("Image is required."));
    };

    let fields = upload.fields;
    let image_len = image.len();
    let id = store
        .add_clothing(NewClothingItem {
            kind: fields.kind,
            color: fields.color,
            style: fields.style,
            occasion: fields.occasion,
            image,
        })
        .await
        .map_err(|e| e.into_api_error("adding clothing item", "Couldn't add item"))?;

    info!("Added clothing item {} ({} image bytes)", id, image_len);
    Ok(Json(CreatedResponse {
        message: "Item added successfully".to_string(),
        id,
    }))
}

/// `POST /closet/outfits`, `{name, description, items}` as JSON or a
/// URL-encoded form.
pub async fn create_outfit<S: ClosetStore>(
    State(store): State<Arc<S>>,
    OutfitPayload(body): OutfitPayload,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let Some(name) = body.name.filter(|n| !n.is_empty()) else {
        return Err(ApiError::bad_request("Outfit name is required"));
    };
    let item_count = body.items.len();

    let id = store
        .create_outfit(NewOutfit {
            name,
            description: body.description,
            items: body.items,
        })
        .await
        .map_err(|e| e.into_api_error("saving outfit", "Failed to save outfit"))?;

    info!("Created outfit {} with {} items", id, item_count);
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Outfit created successfully!".to_string(),
            id,
        }),
    ))
}

/// `DELETE /closet/delete/{id}`. Outfit memberships go with the item through
/// the foreign key cascade.
pub async fn delete_clothing<S: ClosetStore>(
    State(store): State<Arc<S>>,
    NumericId(id): NumericId,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = store
        .delete_clothing(id)
        .await
        .map_err(|e| e.into_api_error("deleting clothing item", "Failed to delete item"))?;

    if !deleted {
        return Err(ApiError::not_found("Item not found"));
    }

    info!("Deleted clothing item {}", id);
    Ok(MessageResponse::new(format!(
        "Item with id {id} deleted successfully"
    )))
}

/// `DELETE /closet/outfits/{id}`. Succeeds whether or not the outfit existed.
pub async fn delete_outfit<S: ClosetStore>(
    State(store): State<Arc<S>>,
    NumericId(id): NumericId,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = store
        .delete_outfit(id)
        .await
        .map_err(|e| e.into_api_error("deleting outfit", "Failed to delete outfit"))?;

    debug!("Deleted outfit with id: {} (existed: {})", id, deleted);
    Ok(MessageResponse::new("Outfit deleted successfully"))
}
