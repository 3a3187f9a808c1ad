use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{bool_or_flag, validate_email};
use crate::error::ApiError;

/// One user's like state for one meal; unique per `(email, post_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub post_id: Uuid,
    pub liked: bool,
    pub updated_at: DateTime<Utc>,
}

/// Body of `PUT /like-count`: bump the meal counter by `count` and record
/// the caller's like flag.
#[derive(Debug, Clone, Deserialize)]
pub struct LikeUpdate {
    /// Meal id
    pub id: Uuid,
    pub count: i64,
    #[serde(deserialize_with = "bool_or_flag")]
    pub liked: bool,
    pub email: String,
}

impl LikeUpdate {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_email("email", &self.email)?;
        if !(-1..=1).contains(&self.count) {
            return Err(ApiError::invalid_field("count", "Count must be -1, 0 or 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    /// Meals whose counter was adjusted (0 when the meal is gone).
    pub matched_count: u64,
    pub modified_count: u64,
    /// True when the like record was created rather than overwritten.
    pub upserted: bool,
}
