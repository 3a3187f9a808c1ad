use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{reject_reserved, validate_email};
use crate::error::ApiError;

pub const MAX_RATING: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub review_user_email: String,
    pub post_id: Uuid,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /post-review`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub review_user_email: String,
    pub post_id: Uuid,
    pub rating: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewReview {
    pub fn validate(&self) -> Result<(), ApiError> {
        reject_reserved(&self.extra, &[])?;
        validate_email("reviewUserEmail", &self.review_user_email)?;
        validate_rating(self.rating)
    }

    pub fn into_review(self, id: Uuid, created_at: DateTime<Utc>) -> Review {
        Review {
            id,
            review_user_email: self.review_user_email,
            post_id: self.post_id,
            rating: self.rating,
            created_at,
            extra: self.extra,
        }
    }
}

/// Body of `PUT /review-update/:id`; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUpdate {
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReviewUpdate {
    pub fn validate(&self) -> Result<(), ApiError> {
        // Author and meal are fixed once posted
        reject_reserved(&self.extra, &["postId", "reviewUserEmail"])?;
        match self.rating {
            Some(rating) => validate_rating(rating),
            None => Ok(()),
        }
    }

    pub fn apply(self, review: &mut Review) {
        if let Some(rating) = self.rating {
            review.rating = rating;
        }
        review.extra.extend(self.extra);
    }
}

fn validate_rating(rating: f64) -> Result<(), ApiError> {
    if rating.is_finite() && (0.0..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(ApiError::invalid_field("rating", "Rating must be between 0 and 5"))
    }
}

/// Sum, count and mean of the ratings posted for one meal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub total_rating: f64,
    pub total_count: i64,
    pub average_rating: f64,
}

impl RatingSummary {
    pub fn new(total_rating: f64, total_count: i64) -> Self {
        let average_rating = if total_count > 0 {
            total_rating / total_count as f64
        } else {
            0.0
        };
        Self {
            total_rating,
            total_count,
            average_rating,
        }
    }

    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let (total, count) = ratings
            .into_iter()
            .fold((0.0, 0i64), |(total, count), rating| (total + rating, count + 1));
        Self::new(total, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summarizes_ratings() {
        let summary = RatingSummary::from_ratings([3.0, 5.0]);
        assert_eq!(summary.total_rating, 8.0);
        assert_eq!(summary.total_count, 2);
        assert_eq!(summary.average_rating, 4.0);
    }

    #[test]
    fn empty_summary_is_zero() {
        let summary = RatingSummary::from_ratings(std::iter::empty());
        assert_eq!(summary, RatingSummary::new(0.0, 0));
        assert_eq!(
            serde_json::to_value(summary).unwrap(),
            json!({ "totalRating": 0.0, "totalCount": 0, "averageRating": 0.0 })
        );
    }

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(0.0).is_ok());
        assert!(validate_rating(5.0).is_ok());
        assert!(validate_rating(5.5).is_err());
        assert!(validate_rating(-1.0).is_err());
        assert!(validate_rating(f64::NAN).is_err());
    }

    #[test]
    fn update_merges_free_form_fields() {
        let mut review: Review = NewReview {
            review_user_email: "a@x.com".into(),
            post_id: Uuid::new_v4(),
            rating: 3.0,
            extra: json!({ "comment": "ok" }).as_object().cloned().unwrap(),
        }
        .into_review(Uuid::new_v4(), Utc::now());

        let update: ReviewUpdate =
            serde_json::from_value(json!({ "comment": "great", "rating": 5 })).unwrap();
        assert!(update.validate().is_ok());
        update.apply(&mut review);

        assert_eq!(review.rating, 5.0);
        assert_eq!(review.extra["comment"], json!("great"));
    }

    #[test]
    fn update_cannot_move_review() {
        let update: ReviewUpdate =
            serde_json::from_value(json!({ "postId": Uuid::new_v4() })).unwrap();
        assert!(update.validate().is_err());
    }
}
