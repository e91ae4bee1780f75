use crate::error::ApiError;
use thiserror::Error;
use tracing::error;

/// Failure of a store operation. Waiting for a pooled connection is left to
/// the pool's own acquire behaviour; nothing here adds a deadline on top.
#[derive(Debug, Error)]
pub enum DbQueryError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("generated id {0} does not fit in a signed 64-bit integer")]
    IdOutOfRange(u64),
}

impl DbQueryError {
    /// Logs the failure with `context` and hides the driver error from the
    /// client behind `client_message`.
    pub fn into_api_error(self, context: &'static str, client_message: &'static str) -> ApiError {
        error!("Database error while {}: {}", context, self);
        ApiError::internal(client_message)
    }
}

/// Converts a driver's generated id, which MySQL reports unsigned.
pub(crate) fn insert_id(raw: u64) -> Result<i64, DbQueryError> {
    i64::try_from(raw).map_err(|_| DbQueryError::IdOutOfRange(raw))
}
