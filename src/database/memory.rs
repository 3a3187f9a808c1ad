use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MealStore, StoreError};
use crate::filter::{MealQuery, Page};
use crate::models::{
    Like, LikeOutcome, LikeUpdate, Meal, MealRequest, RatingSummary, Review, ReviewUpdate,
    UpdateOutcome, User,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    meals: Vec<Meal>,
    likes: Vec<Like>,
    reviews: Vec<Review>,
    requests: Vec<MealRequest>,
}

/// In-process store for tests and `serve --memory`.
///
/// Rows are kept in insertion order; listings walk them backwards so the
/// newest record comes first, like `ORDER BY created_at DESC`. One write lock
/// covers every table, which gives the same atomicity the Postgres store
/// gets from unique indexes and transactions.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the database were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Offline)
        } else {
            Ok(())
        }
    }
}

fn newest_page<'a, T: 'a, I>(rows: I, page: Page) -> Vec<T>
where
    I: DoubleEndedIterator<Item = &'a T>,
    T: Clone,
{
    page.apply(rows.rev()).cloned().collect()
}

#[async_trait]
impl MealStore for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        self.ensure_online()
    }

    async fn insert_user(&self, user: User) -> Result<Option<Uuid>, StoreError> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.user_email == user.user_email) {
            return Ok(None);
        }
        let id = user.id;
        tables.users.push(user);
        Ok(Some(id))
    }

    async fn list_users(&self, page: Page) -> Result<Vec<User>, StoreError> {
        self.ensure_online()?;
        let tables = self.tables.read().await;
        Ok(newest_page(tables.users.iter(), page))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.ensure_online()?;
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.user_email == email).cloned())
    }

    async fn set_user_role(&self, id: Uuid, role: &str) -> Result<UpdateOutcome, StoreError> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(UpdateOutcome::default());
        };
        let modified = user.role != role;
        user.role = role.to_string();
        Ok(UpdateOutcome {
            matched_count: 1,
            modified_count: modified as u64,
        })
    }

    async fn insert_meal(&self, meal: Meal) -> Result<Uuid, StoreError> {
        self.ensure_online()?;
        let id = meal.id;
        self.tables.write().await.meals.push(meal);
        Ok(id)
    }

    async fn list_meals(&self, query: &MealQuery) -> Result<Vec<Meal>, StoreError> {
        self.ensure_online()?;
        let tables = self.tables.read().await;
        let matching = tables.meals.iter().rev().filter(|meal| query.matches(meal));
        Ok(query.page.apply(matching).cloned().collect())
    }

    async fn count_meals(&self) -> Result<i64, StoreError> {
        self.ensure_online()?;
        Ok(self.tables.read().await.meals.len() as i64)
    }

    async fn find_meal(&self, id: Uuid) -> Result<Option<Meal>, StoreError> {
        self.ensure_online()?;
        let tables = self.tables.read().await;
        Ok(tables.meals.iter().find(|m| m.id == id).cloned())
    }

    async fn find_meals(&self, ids: &[Uuid]) -> Result<Vec<Meal>, StoreError> {
        self.ensure_online()?;
        let tables = self.tables.read().await;
        Ok(tables
            .meals
            .iter()
            .filter(|m| ids.contains(&m.id))
            .cloned()
            .collect())
    }

    async fn apply_like(&self, update: &LikeUpdate) -> Result<LikeOutcome, StoreError> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;

        let (matched_count, modified_count) = match tables.meals.iter_mut().find(|m| m.id == update.id) {
            Some(meal) => {
                let next = (meal.likes + update.count).max(0);
                let modified = next != meal.likes;
                meal.likes = next;
                (1, modified as u64)
            }
            None => (0, 0),
        };

        let now = Utc::now();
        let existing = tables
            .likes
            .iter_mut()
            .find(|l| l.email == update.email && l.post_id == update.id);
        let upserted = match existing {
            Some(like) => {
                like.liked = update.liked;
                like.updated_at = now;
                false
            }
            None => {
                tables.likes.push(Like {
                    id: Uuid::new_v4(),
                    email: update.email.clone(),
                    post_id: update.id,
                    liked: update.liked,
                    updated_at: now,
                });
                true
            }
        };

        Ok(LikeOutcome {
            matched_count,
            modified_count,
            upserted,
        })
    }

    async fn find_like(&self, email: &str, post_id: Uuid) -> Result<Option<Like>, StoreError> {
        self.ensure_online()?;
        let tables = self.tables.read().await;
        Ok(tables
            .likes
            .iter()
            .find(|l| l.email == email && l.post_id == post_id)
            .cloned())
    }

    async fn insert_review(&self, review: Review) -> Result<Uuid, StoreError> {
        self.ensure_online()?;
        let id = review.id;
        self.tables.write().await.reviews.push(review);
        Ok(id)
    }

    async fn update_review(&self, id: Uuid, update: ReviewUpdate) -> Result<UpdateOutcome, StoreError> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;
        let Some(review) = tables.reviews.iter_mut().find(|r| r.id == id) else {
            return Ok(UpdateOutcome::default());
        };
        let before = review.clone();
        update.apply(review);
        Ok(UpdateOutcome {
            matched_count: 1,
            modified_count: (*review != before) as u64,
        })
    }

    async fn reviews_by_author(&self, email: &str, page: Page) -> Result<Vec<Review>, StoreError> {
        self.ensure_online()?;
        let tables = self.tables.read().await;
        let matching = tables.reviews.iter().rev().filter(|r| r.review_user_email == email);
        Ok(page.apply(matching).cloned().collect())
    }

    async fn reviews_for_meal(&self, post_id: Uuid, page: Page) -> Result<Vec<Review>, StoreError> {
        self.ensure_online()?;
        let tables = self.tables.read().await;
        let matching = tables.reviews.iter().rev().filter(|r| r.post_id == post_id);
        Ok(page.apply(matching).cloned().collect())
    }

    async fn delete_review(&self, id: Uuid) -> Result<u64, StoreError> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;
        let before = tables.reviews.len();
        tables.reviews.retain(|r| r.id != id);
        Ok((before - tables.reviews.len()) as u64)
    }

    async fn rating_summary(&self, post_id: Uuid) -> Result<RatingSummary, StoreError> {
        self.ensure_online()?;
        let tables = self.tables.read().await;
        Ok(RatingSummary::from_ratings(
            tables
                .reviews
                .iter()
                .filter(|r| r.post_id == post_id)
                .map(|r| r.rating),
        ))
    }

    async fn insert_request(&self, request: MealRequest) -> Result<Option<Uuid>, StoreError> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;
        let duplicate = tables
            .requests
            .iter()
            .any(|r| r.rec_email == request.rec_email && r.rec_meal_id == request.rec_meal_id);
        if duplicate {
            return Ok(None);
        }
        let id = request.id;
        tables.requests.push(request);
        Ok(Some(id))
    }

    async fn requests_by_email(&self, email: &str, page: Page) -> Result<Vec<MealRequest>, StoreError> {
        self.ensure_online()?;
        let tables = self.tables.read().await;
        let matching = tables.requests.iter().rev().filter(|r| r.rec_email == email);
        Ok(page.apply(matching).cloned().collect())
    }

    async fn delete_request(&self, id: Uuid) -> Result<u64, StoreError> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;
        let before = tables.requests.len();
        tables.requests.retain(|r| r.id != id);
        Ok((before - tables.requests.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MealType, NewMeal, NewMealRequest, NewUser};
    use serde_json::Map;
    use std::sync::Arc;

    fn user(email: &str) -> User {
        NewUser {
            user_email: email.to_string(),
            user_name: None,
            photo_url: None,
            extra: Map::new(),
        }
        .into_user(Uuid::new_v4(), Utc::now())
    }

    fn meal(title: &str, meal_type: MealType) -> Meal {
        NewMeal {
            title: title.to_string(),
            meal_type,
            price: 4.0,
            extra: Map::new(),
        }
        .into_meal(Uuid::new_v4(), Utc::now())
    }

    fn like(id: Uuid, count: i64, liked: bool) -> LikeUpdate {
        LikeUpdate {
            id,
            count,
            liked,
            email: "a@x.com".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_user_is_not_inserted() {
        let store = MemoryStore::new();
        assert!(store.insert_user(user("a@x.com")).await.unwrap().is_some());
        assert!(store.insert_user(user("a@x.com")).await.unwrap().is_none());
        assert_eq!(store.list_users(Page::first(10)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_registrations_store_one_user() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.insert_user(user("race@x.com")).await.unwrap() })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
    }

    #[tokio::test]
    async fn role_update_reports_matched_and_modified() {
        let store = MemoryStore::new();
        let id = store.insert_user(user("a@x.com")).await.unwrap().unwrap();

        let first = store.set_user_role(id, "admin").await.unwrap();
        assert_eq!((first.matched_count, first.modified_count), (1, 1));
        let again = store.set_user_role(id, "admin").await.unwrap();
        assert_eq!((again.matched_count, again.modified_count), (1, 0));
        let missing = store.set_user_role(Uuid::new_v4(), "admin").await.unwrap();
        assert_eq!(missing, UpdateOutcome::default());
    }

    #[tokio::test]
    async fn like_upserts_and_clamps_counter() {
        let store = MemoryStore::new();
        let id = store.insert_meal(meal("Soup", MealType::Lunch)).await.unwrap();

        let first = store.apply_like(&like(id, 1, true)).await.unwrap();
        assert!(first.upserted);
        assert_eq!(first.modified_count, 1);

        let second = store.apply_like(&like(id, -1, false)).await.unwrap();
        assert!(!second.upserted);

        // Already at zero
        let third = store.apply_like(&like(id, -1, false)).await.unwrap();
        assert_eq!((third.matched_count, third.modified_count), (1, 0));

        let meal = store.find_meal(id).await.unwrap().unwrap();
        assert_eq!(meal.likes, 0);
        let stored = store.find_like("a@x.com", id).await.unwrap().unwrap();
        assert!(!stored.liked);
        assert_eq!(store.tables.read().await.likes.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_request_is_rejected() {
        let store = MemoryStore::new();
        let meal_id = Uuid::new_v4();
        let request = || {
            NewMealRequest {
                rec_email: "a@x.com".to_string(),
                rec_meal_id: meal_id,
                extra: Map::new(),
            }
            .into_request(Uuid::new_v4(), Utc::now())
        };

        assert!(store.insert_request(request()).await.unwrap().is_some());
        assert!(store.insert_request(request()).await.unwrap().is_none());
        assert_eq!(
            store.requests_by_email("a@x.com", Page::first(10)).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn meals_listed_newest_first_with_paging() {
        let store = MemoryStore::new();
        for title in ["one", "two", "three", "four"] {
            store.insert_meal(meal(title, MealType::Dinner)).await.unwrap();
        }

        let mut query = MealQuery::latest(2);
        let titles: Vec<_> = store
            .list_meals(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["four", "three"]);

        query.page = Page { limit: 2, skip: 2 };
        let titles: Vec<_> = store
            .list_meals(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["two", "one"]);
    }

    #[tokio::test]
    async fn offline_store_is_unavailable() {
        let store = MemoryStore::new();
        store.set_offline(true);
        let err = store.count_meals().await.unwrap_err();
        assert!(err.is_unavailable());
        store.set_offline(false);
        assert_eq!(store.count_meals().await.unwrap(), 0);
    }
}
