use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{reject_reserved, validate_email};
use crate::error::ApiError;

/// A user asking for a meal; unique per `(rec_email, rec_meal_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealRequest {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub rec_email: String,
    pub rec_meal_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /meals-request`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMealRequest {
    pub rec_email: String,
    pub rec_meal_id: Uuid,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewMealRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        reject_reserved(&self.extra, &[])?;
        validate_email("recEmail", &self.rec_email)
    }

    pub fn into_request(self, id: Uuid, created_at: DateTime<Utc>) -> MealRequest {
        MealRequest {
            id,
            rec_email: self.rec_email,
            rec_meal_id: self.rec_meal_id,
            created_at,
            extra: self.extra,
        }
    }
}
