// handlers/mod.rs - Route handlers grouped by resource
//
// Public routes take no session. `/logout`, `/users` and `/change-user-role`
// are wrapped in `require_session` by the router.

pub mod likes;
pub mod meals;
pub mod requests;
pub mod reviews;
pub mod session;
pub mod users;

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::database::MealStore;
use crate::error::ApiError;
use crate::join::{join, lookup_by_id, to_objects};

/// `{insertedId}` on success, `{message, insertedId: null}` for a duplicate.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub inserted_id: Option<Uuid>,
}

impl InsertResult {
    pub fn inserted(id: Uuid) -> Self {
        Self {
            message: None,
            inserted_id: Some(id),
        }
    }

    pub fn duplicate(message: &'static str) -> Self {
        Self {
            message: Some(message),
            inserted_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// Parse an identifier from the path or query string.
pub(crate) fn parse_id(field: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::invalid_field(field, format!("Invalid id: {}", raw)))
}

/// Attach each record's meal, looked up through `reference_key`.
pub(crate) async fn join_with_meals<T: Serialize>(
    store: &dyn MealStore,
    records: &[T],
    meal_ids: impl IntoIterator<Item = Uuid>,
    reference_key: &str,
) -> Result<Vec<Map<String, Value>>, ApiError> {
    let ids: Vec<Uuid> = meal_ids.into_iter().collect::<HashSet<_>>().into_iter().collect();
    let meals = store.find_meals(&ids).await?;
    let lookup = lookup_by_id(to_objects(&meals)?);
    Ok(join(to_objects(records)?, reference_key, &lookup))
}
