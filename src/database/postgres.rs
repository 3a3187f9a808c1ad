use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use super::{MealStore, QueryBuilder, StoreError};
use crate::config::DatabaseConfig;
use crate::filter::{FilterData, MealQuery, Page};
use crate::models::{
    Like, LikeOutcome, LikeUpdate, Meal, MealRequest, RatingSummary, Review, ReviewUpdate,
    UpdateOutcome, User,
};

/// Postgres-backed store sharing one connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .url
            .as_deref()
            .ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;
        let parsed = url::Url::parse(url).map_err(|_| StoreError::InvalidDatabaseUrl)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Connected to database {}", redact(&parsed));
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Run a read, retrying once on a transient connection error.
    async fn read<T, F, Fut>(&self, operation: &'static str, attempt: F) -> Result<T, StoreError>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, StoreError>> + Send,
        T: Send,
    {
        match attempt().await {
            Err(err) if err.is_transient() => {
                warn!("Retrying {} after transient error: {}", operation, err);
                attempt().await
            }
            result => result,
        }
    }
}

/// Hide the password before a URL reaches the logs.
fn redact(url: &url::Url) -> String {
    let mut url = url.clone();
    if url.password().is_some() {
        let _ = url.set_password(Some("****"));
    }
    url.to_string()
}

fn newest_first(page: Page) -> FilterData {
    FilterData {
        where_clause: None,
        order: Some(json!("created_at desc")),
        limit: Some(page.limit),
        offset: Some(page.skip),
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    user_email: String,
    user_name: Option<String>,
    photo_url: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    extra: Json<Map<String, Value>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            user_email: row.user_email,
            user_name: row.user_name,
            photo_url: row.photo_url,
            role: row.role,
            created_at: row.created_at,
            extra: row.extra.0,
        }
    }
}

#[derive(FromRow)]
struct MealRow {
    id: Uuid,
    title: String,
    meal_type: String,
    price: f64,
    likes: i64,
    created_at: DateTime<Utc>,
    extra: Json<Map<String, Value>>,
}

impl TryFrom<MealRow> for Meal {
    type Error = StoreError;

    fn try_from(row: MealRow) -> Result<Self, Self::Error> {
        let meal_type = row.meal_type.parse().map_err(|reason| StoreError::Corrupt {
            table: "meals",
            reason,
        })?;
        Ok(Meal {
            id: row.id,
            title: row.title,
            meal_type,
            price: row.price,
            likes: row.likes,
            created_at: row.created_at,
            extra: row.extra.0,
        })
    }
}

fn into_meals(rows: Vec<MealRow>) -> Result<Vec<Meal>, StoreError> {
    rows.into_iter().map(Meal::try_from).collect()
}

#[derive(FromRow)]
struct LikeRow {
    id: Uuid,
    email: String,
    post_id: Uuid,
    liked: bool,
    updated_at: DateTime<Utc>,
}

impl From<LikeRow> for Like {
    fn from(row: LikeRow) -> Self {
        Like {
            id: row.id,
            email: row.email,
            post_id: row.post_id,
            liked: row.liked,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ReviewRow {
    id: Uuid,
    review_user_email: String,
    post_id: Uuid,
    rating: f64,
    created_at: DateTime<Utc>,
    extra: Json<Map<String, Value>>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id,
            review_user_email: row.review_user_email,
            post_id: row.post_id,
            rating: row.rating,
            created_at: row.created_at,
            extra: row.extra.0,
        }
    }
}

#[derive(FromRow)]
struct RequestRow {
    id: Uuid,
    rec_email: String,
    rec_meal_id: Uuid,
    created_at: DateTime<Utc>,
    extra: Json<Map<String, Value>>,
}

impl From<RequestRow> for MealRequest {
    fn from(row: RequestRow) -> Self {
        MealRequest {
            id: row.id,
            rec_email: row.rec_email,
            rec_meal_id: row.rec_meal_id,
            created_at: row.created_at,
            extra: row.extra.0,
        }
    }
}

fn outcome((matched, modified): (i64, i64)) -> UpdateOutcome {
    UpdateOutcome {
        matched_count: matched.max(0) as u64,
        modified_count: modified.max(0) as u64,
    }
}

const SET_ROLE_SQL: &str = r#"
    WITH target AS (SELECT id FROM users WHERE id = $1),
    updated AS (
        UPDATE users SET role = $2
        WHERE id = $1 AND role IS DISTINCT FROM $2
        RETURNING id
    )
    SELECT (SELECT COUNT(*) FROM target), (SELECT COUNT(*) FROM updated)
"#;

const UPDATE_REVIEW_SQL: &str = r#"
    WITH target AS (SELECT id FROM reviews WHERE id = $1),
    updated AS (
        UPDATE reviews SET rating = COALESCE($2, rating), extra = extra || $3
        WHERE id = $1
          AND (rating IS DISTINCT FROM COALESCE($2, rating) OR (extra || $3) IS DISTINCT FROM extra)
        RETURNING id
    )
    SELECT (SELECT COUNT(*) FROM target), (SELECT COUNT(*) FROM updated)
"#;

const UPSERT_LIKE_SQL: &str = r#"
    INSERT INTO likes (id, email, post_id, liked, updated_at)
    VALUES ($1, $2, $3, $4, now())
    ON CONFLICT (email, post_id)
    DO UPDATE SET liked = EXCLUDED.liked, updated_at = EXCLUDED.updated_at
    RETURNING (xmax = 0)
"#;

#[async_trait]
impl MealStore for PgStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_user(&self, user: User) -> Result<Option<Uuid>, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO users (id, user_email, user_name, photo_url, role, created_at, extra) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (user_email) DO NOTHING RETURNING id",
        )
        .bind(user.id)
        .bind(&user.user_email)
        .bind(&user.user_name)
        .bind(&user.photo_url)
        .bind(&user.role)
        .bind(user.created_at)
        .bind(Json(&user.extra))
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn list_users(&self, page: Page) -> Result<Vec<User>, StoreError> {
        let pool = &self.pool;
        let rows = self
            .read("list_users", move || async move {
                QueryBuilder::<UserRow>::new("users")?
                    .filter(newest_first(page))?
                    .select_all(pool)
                    .await
            })
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let pool = &self.pool;
        let row = self
            .read("find_user_by_email", move || async move {
                sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE user_email = $1")
                    .bind(email)
                    .fetch_optional(pool)
                    .await
                    .map_err(StoreError::from)
            })
            .await?;
        Ok(row.map(User::from))
    }

    async fn set_user_role(&self, id: Uuid, role: &str) -> Result<UpdateOutcome, StoreError> {
        let counts = sqlx::query_as::<_, (i64, i64)>(SET_ROLE_SQL)
            .bind(id)
            .bind(role)
            .fetch_one(&self.pool)
            .await?;
        Ok(outcome(counts))
    }

    async fn insert_meal(&self, meal: Meal) -> Result<Uuid, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO meals (id, title, meal_type, price, likes, created_at, extra) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(meal.id)
        .bind(&meal.title)
        .bind(meal.meal_type.as_str())
        .bind(meal.price)
        .bind(meal.likes)
        .bind(meal.created_at)
        .bind(Json(&meal.extra))
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn list_meals(&self, query: &MealQuery) -> Result<Vec<Meal>, StoreError> {
        let pool = &self.pool;
        let data = query.to_filter_data();
        let data = &data;
        let rows = self
            .read("list_meals", move || async move {
                QueryBuilder::<MealRow>::new("meals")?
                    .filter(data.clone())?
                    .select_all(pool)
                    .await
            })
            .await?;
        into_meals(rows)
    }

    async fn count_meals(&self) -> Result<i64, StoreError> {
        let pool = &self.pool;
        self.read("count_meals", move || async move {
            QueryBuilder::<MealRow>::new("meals")?.count(pool).await
        })
        .await
    }

    async fn find_meal(&self, id: Uuid) -> Result<Option<Meal>, StoreError> {
        let pool = &self.pool;
        let row = self
            .read("find_meal", move || async move {
                sqlx::query_as::<_, MealRow>("SELECT * FROM meals WHERE id = $1")
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .map_err(StoreError::from)
            })
            .await?;
        row.map(Meal::try_from).transpose()
    }

    async fn find_meals(&self, ids: &[Uuid]) -> Result<Vec<Meal>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let pool = &self.pool;
        let rows = self
            .read("find_meals", move || async move {
                sqlx::query_as::<_, MealRow>("SELECT * FROM meals WHERE id = ANY($1)")
                    .bind(ids)
                    .fetch_all(pool)
                    .await
                    .map_err(StoreError::from)
            })
            .await?;
        into_meals(rows)
    }

    async fn apply_like(&self, update: &LikeUpdate) -> Result<LikeOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT likes FROM meals WHERE id = $1 FOR UPDATE")
                .bind(update.id)
                .fetch_optional(&mut *tx)
                .await?;

        let (matched_count, modified_count) = match current {
            Some(likes) => {
                // The counter never drops below zero
                let next = (likes + update.count).max(0);
                if next != likes {
                    sqlx::query("UPDATE meals SET likes = $2 WHERE id = $1")
                        .bind(update.id)
                        .bind(next)
                        .execute(&mut *tx)
                        .await?;
                    (1, 1)
                } else {
                    (1, 0)
                }
            }
            None => (0, 0),
        };

        let upserted: bool = sqlx::query_scalar(UPSERT_LIKE_SQL)
            .bind(Uuid::new_v4())
            .bind(&update.email)
            .bind(update.id)
            .bind(update.liked)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(LikeOutcome {
            matched_count,
            modified_count,
            upserted,
        })
    }

    async fn find_like(&self, email: &str, post_id: Uuid) -> Result<Option<Like>, StoreError> {
        let pool = &self.pool;
        let row = self
            .read("find_like", move || async move {
                sqlx::query_as::<_, LikeRow>("SELECT * FROM likes WHERE email = $1 AND post_id = $2")
                    .bind(email)
                    .bind(post_id)
                    .fetch_optional(pool)
                    .await
                    .map_err(StoreError::from)
            })
            .await?;
        Ok(row.map(Like::from))
    }

    async fn insert_review(&self, review: Review) -> Result<Uuid, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO reviews (id, review_user_email, post_id, rating, created_at, extra) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(review.id)
        .bind(&review.review_user_email)
        .bind(review.post_id)
        .bind(review.rating)
        .bind(review.created_at)
        .bind(Json(&review.extra))
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update_review(&self, id: Uuid, update: ReviewUpdate) -> Result<UpdateOutcome, StoreError> {
        let counts = sqlx::query_as::<_, (i64, i64)>(UPDATE_REVIEW_SQL)
            .bind(id)
            .bind(update.rating)
            .bind(Json(&update.extra))
            .fetch_one(&self.pool)
            .await?;
        Ok(outcome(counts))
    }

    async fn reviews_by_author(&self, email: &str, page: Page) -> Result<Vec<Review>, StoreError> {
        let pool = &self.pool;
        let rows = self
            .read("reviews_by_author", move || async move {
                sqlx::query_as::<_, ReviewRow>(
                    "SELECT * FROM reviews WHERE review_user_email = $1 \
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                )
                .bind(email)
                .bind(page.limit)
                .bind(page.skip)
                .fetch_all(pool)
                .await
                .map_err(StoreError::from)
            })
            .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn reviews_for_meal(&self, post_id: Uuid, page: Page) -> Result<Vec<Review>, StoreError> {
        let pool = &self.pool;
        let rows = self
            .read("reviews_for_meal", move || async move {
                sqlx::query_as::<_, ReviewRow>(
                    "SELECT * FROM reviews WHERE post_id = $1 \
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                )
                .bind(post_id)
                .bind(page.limit)
                .bind(page.skip)
                .fetch_all(pool)
                .await
                .map_err(StoreError::from)
            })
            .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn delete_review(&self, id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn rating_summary(&self, post_id: Uuid) -> Result<RatingSummary, StoreError> {
        let pool = &self.pool;
        let (total, count) = self
            .read("rating_summary", move || async move {
                sqlx::query_as::<_, (f64, i64)>(
                    "SELECT COALESCE(SUM(rating), 0)::float8, COUNT(*) FROM reviews WHERE post_id = $1",
                )
                .bind(post_id)
                .fetch_one(pool)
                .await
                .map_err(StoreError::from)
            })
            .await?;
        Ok(RatingSummary::new(total, count))
    }

    async fn insert_request(&self, request: MealRequest) -> Result<Option<Uuid>, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO meal_requests (id, rec_email, rec_meal_id, created_at, extra) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (rec_email, rec_meal_id) DO NOTHING RETURNING id",
        )
        .bind(request.id)
        .bind(&request.rec_email)
        .bind(request.rec_meal_id)
        .bind(request.created_at)
        .bind(Json(&request.extra))
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn requests_by_email(&self, email: &str, page: Page) -> Result<Vec<MealRequest>, StoreError> {
        let pool = &self.pool;
        let rows = self
            .read("requests_by_email", move || async move {
                sqlx::query_as::<_, RequestRow>(
                    "SELECT * FROM meal_requests WHERE rec_email = $1 \
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                )
                .bind(email)
                .bind(page.limit)
                .bind(page.skip)
                .fetch_all(pool)
                .await
                .map_err(StoreError::from)
            })
            .await?;
        Ok(rows.into_iter().map(MealRequest::from).collect())
    }

    async fn delete_request(&self, id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM meal_requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
