//! Request validation that must finish before a handler runs. Each extractor
//! rejects with an [`ApiError`], so a failed check never reaches the store.

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{Form, FromRequest, FromRequestParts, Multipart, Path, Request};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::Json;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ApiError;

pub const IMAGE_FIELD: &str = "image";

/// Text fields of the clothing upload form as received.
#[derive(Debug, Clone, Default)]
pub struct ClothingFields {
    pub kind: Option<String>,
    pub color: Option<String>,
    pub style: Option<String>,
    pub occasion: Option<String>,
}

/// The four fields after the presence check.
#[derive(Debug, Clone)]
pub struct RequiredClothingFields {
    pub kind: String,
    pub color: String,
    pub style: String,
    pub occasion: String,
}

impl ClothingFields {
    /// Succeeds only when `type`, `color`, `style` and `occasion` are all
    /// present and non-empty.
    pub fn require_all(self) -> Result<RequiredClothingFields, ApiError> {
        let present = |value: Option<String>| value.filter(|v| !v.is_empty());
        match (
            present(self.kind),
            present(self.color),
            present(self.style),
            present(self.occasion),
        ) {
            (Some(kind), Some(color), Some(style), Some(occasion)) => Ok(RequiredClothingFields {
                kind,
                color,
                style,
                occasion,
            }),
            _ => {
                info!("Invalid query detected: Missing required parameters.");
                Err(ApiError::bad_request("Invalid query: Missing required parameters."))
            }
        }
    }
}

/// A parsed `multipart/form-data` clothing upload. The image stays optional
/// here; the handler decides what a missing image means.
#[derive(Debug)]
pub struct ClothingUpload {
    pub fields: RequiredClothingFields,
    pub image: Option<Bytes>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::new(err.status(), err.body_text())
}

impl<S> FromRequest<S> for ClothingUpload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::new(rejection.status(), rejection.body_text()))?;

        let mut fields = ClothingFields::default();
        let mut image = None;

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                IMAGE_FIELD => image = Some(field.bytes().await.map_err(multipart_error)?),
                "type" => fields.kind = Some(field.text().await.map_err(multipart_error)?),
                "color" => fields.color = Some(field.text().await.map_err(multipart_error)?),
                "style" => fields.style = Some(field.text().await.map_err(multipart_error)?),
                "occasion" => fields.occasion = Some(field.text().await.map_err(multipart_error)?),
                other => debug!("Ignoring unexpected upload field '{}'", other),
            }
        }

        let fields = fields.require_all()?;
        debug!("Valid upload form, proceeding to handler");
        Ok(Self { fields, image })
    }
}

const FORM_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";

/// Fields of a new outfit, from either body encoding.
#[derive(Debug, Default, Deserialize)]
pub struct CreateOutfitBody {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<i64>,
}

/// Accepts `items`, `items[]` and `items[3]`, the spellings form encoders use
/// for arrays.
fn is_items_key(key: &str) -> bool {
    if key == "items" {
        return true;
    }
    key.strip_prefix("items[")
        .and_then(|rest| rest.strip_suffix(']'))
        .is_some_and(|index| index.chars().all(|c| c.is_ascii_digit()))
}

impl CreateOutfitBody {
    pub fn from_form_pairs(pairs: Vec<(String, String)>) -> Result<Self, ApiError> {
        let mut body = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "name" => body.name = Some(value),
                "description" => body.description = Some(value),
                items if is_items_key(items) => {
                    let id = value
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| ApiError::bad_request("Item ids must be numbers"))?;
                    body.items.push(id);
                }
                other => debug!("Ignoring unexpected outfit field '{}'", other),
            }
        }
        Ok(body)
    }
}

/// Oversized bodies keep their 413; every other body failure is the client's
/// malformed input.
fn body_rejection(status: StatusCode, text: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(status, text)
    } else {
        ApiError::bad_request(text)
    }
}

/// An outfit body sent as JSON or as `application/x-www-form-urlencoded`.
/// Anything that is not a form is read as JSON.
#[derive(Debug)]
pub struct OutfitPayload(pub CreateOutfitBody);

impl<S> FromRequest<S> for OutfitPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with(FORM_MEDIA_TYPE));

        if is_form {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|rejection| body_rejection(rejection.status(), rejection.body_text()))?;
            return CreateOutfitBody::from_form_pairs(pairs).map(Self);
        }

        let Json(body) = Json::<CreateOutfitBody>::from_request(req, state)
            .await
            .map_err(|rejection| body_rejection(rejection.status(), rejection.body_text()))?;
        Ok(Self(body))
    }
}

/// A numeric `{id}` path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericId(pub i64);

pub fn parse_numeric_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>().map_err(|_| {
        debug!("Rejecting non-numeric id '{}'", raw);
        ApiError::bad_request("ID must be a number")
    })
}

impl<S> FromRequestParts<S> for NumericId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::new(rejection.status(), rejection.body_text()))?;
        parse_numeric_id(&raw).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(kind: &str, color: &str, style: &str, occasion: &str) -> ClothingFields {
        let value = |v: &str| Some(v.to_string());
        ClothingFields {
            kind: value(kind),
            color: value(color),
            style: value(style),
            occasion: value(occasion),
        }
    }

    #[test]
    fn all_fields_present_passes() {
        let required = fields("shirt", "red", "casual", "party").require_all().unwrap();
        assert_eq!(required.kind, "shirt");
        assert_eq!(required.occasion, "party");
    }

    #[test]
    fn empty_field_is_missing() {
        let err = fields("shirt", "", "casual", "party").require_all().unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Invalid query: Missing required parameters.");
    }

    #[test]
    fn absent_field_is_missing() {
        let mut partial = fields("shirt", "red", "casual", "party");
        partial.style = None;
        assert!(partial.require_all().is_err());
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn form_pairs_collect_item_spellings() {
        let body = CreateOutfitBody::from_form_pairs(pairs(&[
            ("name", "Picnic"),
            ("items", "3"),
            ("items[]", "5"),
            ("items[2]", " 8 "),
            ("colour", "ignored"),
        ]))
        .unwrap();
        assert_eq!(body.name.as_deref(), Some("Picnic"));
        assert_eq!(body.description, None);
        assert_eq!(body.items, vec![3, 5, 8]);
    }

    #[test]
    fn form_items_must_be_numbers() {
        let err = CreateOutfitBody::from_form_pairs(pairs(&[("name", "x"), ("items", "shirt")]))
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(!is_items_key("items[a]"));
        assert!(!is_items_key("itemsx"));
    }

    #[test]
    fn numeric_ids_parse() {
        assert_eq!(parse_numeric_id("42").unwrap(), 42);
        assert_eq!(parse_numeric_id("-3").unwrap(), -3);
    }

    #[test]
    fn non_numeric_ids_are_rejected() {
        for raw in ["abc", "", "12abc", "1.5", "99999999999999999999"] {
            let err = parse_numeric_id(raw).unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST, "{raw}");
            assert_eq!(err.message(), "ID must be a number");
        }
    }
}
