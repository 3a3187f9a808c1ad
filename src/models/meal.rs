use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::reject_reserved;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    pub const ALL: [MealType; 3] = [MealType::Breakfast, MealType::Lunch, MealType::Dinner];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MealType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown meal type: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub meal_type: MealType,
    pub price: f64,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /post-meal`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMeal {
    pub title: String,
    pub meal_type: MealType,
    pub price: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewMeal {
    pub fn validate(&self) -> Result<(), ApiError> {
        reject_reserved(&self.extra, &["likes"])?;

        if self.title.trim().is_empty() {
            return Err(ApiError::invalid_field("title", "Title cannot be empty"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ApiError::invalid_field("price", "Price must be a non-negative number"));
        }
        Ok(())
    }

    /// Materialise the stored record.
    pub fn into_meal(self, id: Uuid, created_at: DateTime<Utc>) -> Meal {
        Meal {
            id,
            title: self.title,
            meal_type: self.meal_type,
            price: self.price,
            likes: 0,
            created_at,
            extra: self.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_wire_format_with_free_form_fields() {
        let meal: NewMeal = serde_json::from_value(json!({
            "title": "Pancakes",
            "mealType": "breakfast",
            "price": 4.5,
            "image": "https://img/p.png",
            "ingredients": ["flour", "milk"]
        }))
        .unwrap();

        assert_eq!(meal.meal_type, MealType::Breakfast);
        assert_eq!(meal.extra.len(), 2);
        assert!(meal.validate().is_ok());

        let stored = meal.into_meal(Uuid::new_v4(), Utc::now());
        let out = serde_json::to_value(&stored).unwrap();
        assert_eq!(out["mealType"], json!("breakfast"));
        assert_eq!(out["image"], json!("https://img/p.png"));
        assert_eq!(out["likes"], json!(0));
        assert!(out.get("_id").is_some());
    }

    #[test]
    fn rejects_unknown_meal_type() {
        let result: Result<NewMeal, _> = serde_json::from_value(json!({
            "title": "Tea", "mealType": "snack", "price": 1
        }));
        assert!(result.is_err());
    }

    #[test]
    fn rejects_negative_price_and_preset_likes() {
        let meal: NewMeal = serde_json::from_value(json!({
            "title": "Soup", "mealType": "lunch", "price": -1
        }))
        .unwrap();
        assert!(meal.validate().is_err());

        let meal: NewMeal = serde_json::from_value(json!({
            "title": "Soup", "mealType": "lunch", "price": 3, "likes": 99
        }))
        .unwrap();
        assert!(meal.validate().is_err());
    }

    #[test]
    fn meal_type_round_trips_through_str() {
        for t in MealType::ALL {
            assert_eq!(t.as_str().parse::<MealType>().unwrap(), t);
        }
        assert!("brunch".parse::<MealType>().is_err());
    }
}
