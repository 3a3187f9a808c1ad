use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{reject_reserved, validate_email};
use crate::error::ApiError;

pub const ADMIN_ROLE: &str = "admin";
pub const DEFAULT_ROLE: &str = "user";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_email: String,
    pub user_name: Option<String>,
    pub photo_url: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Body of `POST /new-user`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub user_email: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ApiError> {
        // Roles are granted through /change-user-role only
        reject_reserved(&self.extra, &["role"])?;
        validate_email("userEmail", &self.user_email)
    }

    pub fn into_user(self, id: Uuid, created_at: DateTime<Utc>) -> User {
        User {
            id,
            user_email: self.user_email,
            user_name: self.user_name,
            photo_url: self.photo_url,
            role: DEFAULT_ROLE.to_string(),
            created_at,
            extra: self.extra,
        }
    }
}
