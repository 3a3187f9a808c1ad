//! Canonical meal list query.
//!
//! Every meal listing (`/meals`, `/meals-six`, `/breakfast` ...) goes through
//! [`MealQuery`]. Option effects:
//!
//! - `meal_type`: exact match on the meal type.
//! - `price_min`/`price_max`: inclusive price range.
//! - `search`: case-insensitive substring match on the title. Combines (AND)
//!   with the type or price filter rather than replacing it.
//! - `page`: always applied; newest meals first.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::pagination::Page;
use super::types::FilterData;
use crate::models::{Meal, MealType};

/// Price buckets the frontend offers, as `"low,high"` tags.
pub const PRICE_BUCKETS: [&str; 4] = ["0,5", "5,10", "10,15", "15,20"];

/// Query string of `GET /meals`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MealListParams {
    pub offset: Option<String>,
    pub limit: Option<String>,
    pub filter: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MealQuery {
    pub meal_type: Option<MealType>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub search: Option<String>,
    pub page: Page,
}

impl MealQuery {
    /// Newest `limit` meals, unfiltered.
    pub fn latest(limit: i64) -> Self {
        Self {
            meal_type: None,
            price_min: None,
            price_max: None,
            search: None,
            page: Page::first(limit),
        }
    }

    pub fn with_type(mut self, meal_type: MealType) -> Self {
        self.meal_type = Some(meal_type);
        self
    }

    /// Interpret the `/meals` query string. Unknown filter tags and malformed
    /// paging values are ignored.
    pub fn from_params(params: &MealListParams, max_limit: i64) -> Self {
        let page = Page::from_params(params.limit.as_deref(), params.offset.as_deref(), max_limit);
        let mut query = Self {
            page,
            ..Self::latest(max_limit)
        };

        if let Some(tag) = params.filter.as_deref().map(str::trim) {
            if let Ok(meal_type) = tag.parse::<MealType>() {
                query.meal_type = Some(meal_type);
            } else if let Some((low, high)) = parse_price_bucket(tag) {
                query.price_min = Some(low);
                query.price_max = Some(high);
            } else if !tag.is_empty() {
                tracing::debug!("Ignoring unknown meal filter tag: {}", tag);
            }
        }

        query.search = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        query
    }

    /// Evaluate the filters against one meal (paging excluded).
    pub fn matches(&self, meal: &Meal) -> bool {
        if let Some(meal_type) = self.meal_type {
            if meal.meal_type != meal_type {
                return false;
            }
        }
        if let Some(min) = self.price_min {
            if meal.price < min {
                return false;
            }
        }
        if let Some(max) = self.price_max {
            if meal.price > max {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !meal.title.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        true
    }

    /// Translate into the document filter rendered by [`super::Filter`]
    /// against the `meals` table.
    pub fn to_filter_data(&self) -> FilterData {
        let mut conditions = Map::new();

        if let Some(meal_type) = self.meal_type {
            conditions.insert("meal_type".to_string(), json!(meal_type.as_str()));
        }

        let mut price = Map::new();
        if let Some(min) = self.price_min {
            price.insert("$gte".to_string(), json!(min));
        }
        if let Some(max) = self.price_max {
            price.insert("$lte".to_string(), json!(max));
        }
        if !price.is_empty() {
            conditions.insert("price".to_string(), Value::Object(price));
        }

        if let Some(search) = &self.search {
            conditions.insert(
                "title".to_string(),
                json!({ "$ilike": format!("%{}%", escape_like(search)) }),
            );
        }

        FilterData {
            where_clause: if conditions.is_empty() { None } else { Some(Value::Object(conditions)) },
            order: Some(json!("created_at desc")),
            limit: Some(self.page.limit),
            offset: Some(self.page.skip),
        }
    }
}

/// Only the enumerated bucket tags are accepted.
fn parse_price_bucket(tag: &str) -> Option<(f64, f64)> {
    if !PRICE_BUCKETS.contains(&tag) {
        return None;
    }
    let (low, high) = tag.split_once(',')?;
    Some((low.parse().ok()?, high.parse().ok()?))
}

/// Escape LIKE wildcards so user text matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
