use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::aggregate::RatingTotals;
use super::error::ReviewError;
use super::model::{AdminReview, DeveloperAggregate, DeveloperReview, NewReview, Page, Review, ReviewPatch};
use super::repository::{ReviewRepository, ReviewTransaction};

/// Store operations that can be told to fail once, for exercising rollback paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    InsertReview,
    UpdateReview,
    DeleteReview,
    RatingTotals,
    StoreAggregate,
    Commit,
}

#[derive(Debug, Clone)]
struct UserRow {
    full_name: String,
}

#[derive(Debug, Clone)]
struct DeveloperRow {
    user_id: i32,
    username: String,
    rating: Decimal,
    total_reviews: i32,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: BTreeMap<i32, UserRow>,
    developers: BTreeMap<i32, DeveloperRow>,
    reviews: BTreeMap<i32, Review>,
    next_user_id: i32,
    next_developer_id: i32,
    next_review_id: i32,
}

impl MemoryState {
    fn developer_aggregate(&self, developer_id: i32) -> Option<DeveloperAggregate> {
        self.developers.get(&developer_id).map(|d| DeveloperAggregate {
            developer_id,
            rating: d.rating,
            total_reviews: d.total_reviews,
        })
    }

    fn client_name(&self, client_id: i32) -> String {
        self.users
            .get(&client_id)
            .map(|u| u.full_name.clone())
            .unwrap_or_default()
    }

    fn newest_first(&self) -> Vec<&Review> {
        let mut reviews: Vec<&Review> = self.reviews.values().collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        reviews
    }
}

/// In-process review store with the same transactional contract as the Postgres one.
///
/// A transaction takes the single state lock and works on a private copy; commit swaps the
/// copy in, drop discards it. Transactions are therefore fully serialized.
#[derive(Clone, Default)]
pub struct MemoryReviewRepository {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<StdMutex<HashSet<FaultPoint>>>,
}

impl MemoryReviewRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, full_name: &str) -> i32 {
        let mut state = self.state.lock().await;
        state.next_user_id += 1;
        let id = state.next_user_id;
        state.users.insert(
            id,
            UserRow {
                full_name: full_name.to_string(),
            },
        );
        id
    }

    /// Create a developer profile (and its owning user) with an empty aggregate.
    pub async fn add_developer(&self, username: &str) -> i32 {
        let user_id = self.add_user(username).await;
        let mut state = self.state.lock().await;
        state.next_developer_id += 1;
        let id = state.next_developer_id;
        state.developers.insert(
            id,
            DeveloperRow {
                user_id,
                username: username.to_string(),
                rating: Decimal::new(0, 2),
                total_reviews: 0,
            },
        );
        id
    }

    pub async fn review_count(&self) -> usize {
        self.state.lock().await.reviews.len()
    }

    /// Overwrite a stored aggregate without touching reviews, as a legacy writer would.
    pub async fn force_aggregate(&self, aggregate: DeveloperAggregate) {
        let mut state = self.state.lock().await;
        if let Some(developer) = state.developers.get_mut(&aggregate.developer_id) {
            developer.rating = aggregate.rating;
            developer.total_reviews = aggregate.total_reviews;
        }
    }

    /// Make the next call to `point` fail with a transient storage error.
    pub fn fail_once(&self, point: FaultPoint) {
        self.faults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(point);
    }
}

fn trip(faults: &StdMutex<HashSet<FaultPoint>>, point: FaultPoint) -> Result<(), ReviewError> {
    let tripped = faults
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .remove(&point);
    if tripped {
        return Err(ReviewError::TransientStorageFailure(format!(
            "injected failure at {:?}",
            point
        )));
    }
    Ok(())
}

#[async_trait]
impl ReviewRepository for MemoryReviewRepository {
    async fn begin(&self) -> Result<Box<dyn ReviewTransaction>, ReviewError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryReviewTransaction {
            guard,
            working,
            faults: self.faults.clone(),
        }))
    }

    async fn list_for_developer(&self, developer_id: i32) -> Result<Vec<DeveloperReview>, ReviewError> {
        let state = self.state.lock().await;
        Ok(state
            .newest_first()
            .into_iter()
            .filter(|r| r.developer_id == developer_id)
            .map(|r| DeveloperReview {
                id: r.id,
                developer_id: r.developer_id,
                client_id: r.client_id,
                rating: r.rating,
                message: r.message.clone(),
                created_at: r.created_at,
                client_name: state.client_name(r.client_id),
            })
            .collect())
    }

    async fn list_all(&self, page: Page) -> Result<Vec<AdminReview>, ReviewError> {
        let state = self.state.lock().await;
        Ok(state
            .newest_first()
            .into_iter()
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .map(|r| AdminReview {
                id: r.id,
                developer_id: r.developer_id,
                client_id: r.client_id,
                rating: r.rating,
                message: r.message.clone(),
                created_at: r.created_at,
                developer_name: state
                    .developers
                    .get(&r.developer_id)
                    .map(|d| d.username.clone())
                    .unwrap_or_default(),
                client_name: state.client_name(r.client_id),
            })
            .collect())
    }

    async fn aggregate(&self, developer_id: i32) -> Result<Option<DeveloperAggregate>, ReviewError> {
        Ok(self.state.lock().await.developer_aggregate(developer_id))
    }

    async fn developer_ids(&self) -> Result<Vec<i32>, ReviewError> {
        Ok(self.state.lock().await.developers.keys().copied().collect())
    }

    async fn ping(&self) -> Result<(), ReviewError> {
        Ok(())
    }
}

pub struct MemoryReviewTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    faults: Arc<StdMutex<HashSet<FaultPoint>>>,
}

#[async_trait]
impl ReviewTransaction for MemoryReviewTransaction {
    async fn lock_developer(&mut self, developer_id: i32) -> Result<Option<DeveloperAggregate>, ReviewError> {
        Ok(self.working.developer_aggregate(developer_id))
    }

    async fn lock_developer_for_review(&mut self, review_id: i32) -> Result<Option<i32>, ReviewError> {
        Ok(self
            .working
            .reviews
            .get(&review_id)
            .map(|r| r.developer_id)
            .filter(|id| self.working.developers.contains_key(id)))
    }

    async fn lock_user(&mut self, user_id: i32) -> Result<bool, ReviewError> {
        Ok(self.working.users.contains_key(&user_id))
    }

    async fn find_review(&mut self, review_id: i32) -> Result<Option<Review>, ReviewError> {
        Ok(self.working.reviews.get(&review_id).cloned())
    }

    async fn find_review_by_author(
        &mut self,
        developer_id: i32,
        client_id: i32,
    ) -> Result<Option<Review>, ReviewError> {
        Ok(self
            .working
            .reviews
            .values()
            .find(|r| r.developer_id == developer_id && r.client_id == client_id)
            .cloned())
    }

    async fn insert_review(&mut self, review: &NewReview) -> Result<Review, ReviewError> {
        trip(&self.faults, FaultPoint::InsertReview)?;

        let duplicate = self
            .working
            .reviews
            .values()
            .any(|r| r.developer_id == review.developer_id && r.client_id == review.client_id);
        if duplicate {
            return Err(ReviewError::Conflict("You have already reviewed this developer".to_string()));
        }
        if !self.working.users.contains_key(&review.client_id) {
            return Err(ReviewError::Storage(format!(
                "client {} violates reviews_client_id_fkey",
                review.client_id
            )));
        }

        self.working.next_review_id += 1;
        let inserted = Review {
            id: self.working.next_review_id,
            developer_id: review.developer_id,
            client_id: review.client_id,
            rating: review.rating,
            message: review.message.clone(),
            created_at: Utc::now(),
        };
        self.working.reviews.insert(inserted.id, inserted.clone());
        Ok(inserted)
    }

    async fn update_review(&mut self, review_id: i32, patch: &ReviewPatch) -> Result<Option<Review>, ReviewError> {
        trip(&self.faults, FaultPoint::UpdateReview)?;

        Ok(self.working.reviews.get_mut(&review_id).map(|review| {
            if let Some(rating) = patch.rating {
                review.rating = rating;
            }
            if let Some(message) = &patch.message {
                review.message = message.clone();
            }
            review.clone()
        }))
    }

    async fn delete_review(&mut self, review_id: i32) -> Result<bool, ReviewError> {
        trip(&self.faults, FaultPoint::DeleteReview)?;
        Ok(self.working.reviews.remove(&review_id).is_some())
    }

    async fn developers_reviewed_by(&mut self, client_id: i32) -> Result<Vec<i32>, ReviewError> {
        let mut ids: Vec<i32> = self
            .working
            .reviews
            .values()
            .filter(|r| r.client_id == client_id)
            .map(|r| r.developer_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn delete_user(&mut self, user_id: i32) -> Result<bool, ReviewError> {
        if self.working.users.remove(&user_id).is_none() {
            return Ok(false);
        }

        // ON DELETE CASCADE: users -> developers -> reviews, users -> reviews
        let owned: Vec<i32> = self
            .working
            .developers
            .iter()
            .filter(|(_, d)| d.user_id == user_id)
            .map(|(id, _)| *id)
            .collect();
        for developer_id in &owned {
            self.working.developers.remove(developer_id);
        }
        self.working
            .reviews
            .retain(|_, r| r.client_id != user_id && !owned.contains(&r.developer_id));
        Ok(true)
    }

    async fn rating_totals(&mut self, developer_id: i32) -> Result<RatingTotals, ReviewError> {
        trip(&self.faults, FaultPoint::RatingTotals)?;

        Ok(self
            .working
            .reviews
            .values()
            .filter(|r| r.developer_id == developer_id)
            .fold(RatingTotals::default(), |acc, r| RatingTotals {
                count: acc.count + 1,
                sum: acc.sum + i64::from(r.rating),
            }))
    }

    async fn store_aggregate(&mut self, aggregate: &DeveloperAggregate) -> Result<(), ReviewError> {
        trip(&self.faults, FaultPoint::StoreAggregate)?;

        if let Some(developer) = self.working.developers.get_mut(&aggregate.developer_id) {
            developer.rating = aggregate.rating;
            developer.total_reviews = aggregate.total_reviews;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), ReviewError> {
        trip(&self.faults, FaultPoint::Commit)?;

        let MemoryReviewTransaction { mut guard, working, .. } = *self;
        *guard = working;
        Ok(())
    }
}
