pub mod memory;
pub mod postgres;
pub mod query_builder;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::filter::{FilterError, MealQuery, Page};
use crate::models::{
    Like, LikeOutcome, LikeUpdate, Meal, MealRequest, RatingSummary, Review, ReviewUpdate,
    UpdateOutcome, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use query_builder::QueryBuilder;

/// Errors raised by a [`MealStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Corrupt record in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },

    #[error("Store offline")]
    Offline,

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    /// Connection-level failures worth one retry on reads.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Sqlx(sqlx::Error::Io(_))
                | StoreError::Sqlx(sqlx::Error::PoolTimedOut)
                | StoreError::Sqlx(sqlx::Error::PoolClosed)
        )
    }

    /// The store cannot be reached at all (503 rather than 500).
    pub fn is_unavailable(&self) -> bool {
        self.is_transient()
            || matches!(self, StoreError::Offline | StoreError::Sqlx(sqlx::Error::Tls(_)))
    }
}

impl From<FilterError> for StoreError {
    fn from(err: FilterError) -> Self {
        StoreError::QueryError(err.to_string())
    }
}

/// Persistence for every collection the service exposes.
///
/// Lists come back newest first. Inserts that hit a uniqueness rule return
/// `Ok(None)` instead of an error.
#[async_trait]
pub trait MealStore: Send + Sync {
    async fn health_check(&self) -> Result<(), StoreError>;

    // Users
    async fn insert_user(&self, user: User) -> Result<Option<Uuid>, StoreError>;
    async fn list_users(&self, page: Page) -> Result<Vec<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn set_user_role(&self, id: Uuid, role: &str) -> Result<UpdateOutcome, StoreError>;

    // Meals
    async fn insert_meal(&self, meal: Meal) -> Result<Uuid, StoreError>;
    async fn list_meals(&self, query: &MealQuery) -> Result<Vec<Meal>, StoreError>;
    async fn count_meals(&self) -> Result<i64, StoreError>;
    async fn find_meal(&self, id: Uuid) -> Result<Option<Meal>, StoreError>;
    async fn find_meals(&self, ids: &[Uuid]) -> Result<Vec<Meal>, StoreError>;

    // Likes
    /// Adjust the meal counter and upsert the caller's like as one unit.
    async fn apply_like(&self, update: &LikeUpdate) -> Result<LikeOutcome, StoreError>;
    async fn find_like(&self, email: &str, post_id: Uuid) -> Result<Option<Like>, StoreError>;

    // Reviews
    async fn insert_review(&self, review: Review) -> Result<Uuid, StoreError>;
    async fn update_review(&self, id: Uuid, update: ReviewUpdate) -> Result<UpdateOutcome, StoreError>;
    async fn reviews_by_author(&self, email: &str, page: Page) -> Result<Vec<Review>, StoreError>;
    async fn reviews_for_meal(&self, post_id: Uuid, page: Page) -> Result<Vec<Review>, StoreError>;
    async fn delete_review(&self, id: Uuid) -> Result<u64, StoreError>;
    async fn rating_summary(&self, post_id: Uuid) -> Result<RatingSummary, StoreError>;

    // Meal requests
    async fn insert_request(&self, request: MealRequest) -> Result<Option<Uuid>, StoreError>;
    async fn requests_by_email(&self, email: &str, page: Page) -> Result<Vec<MealRequest>, StoreError>;
    async fn delete_request(&self, id: Uuid) -> Result<u64, StoreError>;
}
