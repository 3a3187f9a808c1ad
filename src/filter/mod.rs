pub mod error;
pub mod filter;
pub mod filter_order;
pub mod filter_where;
pub mod meal_query;
pub mod pagination;
pub mod types;

pub use error::FilterError;
pub use filter::Filter;
pub use meal_query::{MealListParams, MealQuery, PRICE_BUCKETS};
pub use pagination::{Page, PageParams};
pub use types::*;
