pub mod like;
pub mod meal;
pub mod request;
pub mod review;
pub mod user;

pub use like::{Like, LikeOutcome, LikeUpdate};
pub use meal::{Meal, MealType, NewMeal};
pub use request::{MealRequest, NewMealRequest};
pub use review::{NewReview, RatingSummary, Review, ReviewUpdate};
pub use user::{NewUser, User};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Fields every stored record owns and clients may never set.
pub const SYSTEM_FIELDS: &[&str] = &["_id", "createdAt"];

/// Result of an update, mirroring matched/modified counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// Reject free-form keys that collide with system or server-managed fields.
pub(crate) fn reject_reserved(extra: &Map<String, Value>, reserved: &[&str]) -> Result<(), ApiError> {
    for key in SYSTEM_FIELDS.iter().chain(reserved) {
        if extra.contains_key(*key) {
            return Err(ApiError::bad_request(format!(
                "System field '{}' cannot be set via API",
                key
            )));
        }
    }
    Ok(())
}

/// Minimal shape check for an email address.
pub(crate) fn validate_email(field: &str, value: &str) -> Result<(), ApiError> {
    let trimmed = value.trim();
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !trimmed.contains(' ')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ApiError::invalid_field(field, format!("Invalid email address: {}", value)))
    }
}

/// Accepts `true`/`false` as well as the `1`/`0` flags older clients send.
pub(crate) fn bool_or_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Number(n) => n == 1,
    })
}
