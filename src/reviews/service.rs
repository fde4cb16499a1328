use std::sync::Arc;

use crate::auth::UserType;
use crate::config::config;

use super::aggregate::AggregateMaintainer;
use super::error::ReviewError;
use super::model::{
    AddReview, AdminReview, AggregateDrift, DeleteAuthority, DeveloperAggregate, DeveloperReview, Page,
    ReconcileReport, Requester, ReviewOutcome, UpdateReview, UserRemoval,
};
use super::repository::{ReviewRepository, ReviewTransaction};
use super::validate;

/// Review lifecycle operations.
///
/// Every mutation runs as lock developer, mutate, recompute, commit inside one
/// [`ReviewTransaction`]. An error at any step drops the transaction, which rolls back the
/// mutation and the aggregate together.
#[derive(Clone)]
pub struct ReviewService {
    repo: Arc<dyn ReviewRepository>,
}

impl ReviewService {
    pub fn new(repo: Arc<dyn ReviewRepository>) -> Self {
        Self { repo }
    }

    pub async fn add_review(&self, requester: &Requester, input: AddReview) -> Result<ReviewOutcome, ReviewError> {
        self.try_add_review(requester, input)
            .await
            .map_err(|e| report("add_review", e))
    }

    async fn try_add_review(&self, requester: &Requester, input: AddReview) -> Result<ReviewOutcome, ReviewError> {
        if requester.user_type != UserType::Client {
            return Err(ReviewError::PermissionDenied(
                "Only clients can leave reviews".to_string(),
            ));
        }
        let new_review = validate::new_review(input, requester.user_id)?;

        let mut tx = self.repo.begin().await?;
        if tx.lock_developer(new_review.developer_id).await?.is_none() {
            return Err(ReviewError::NotFound("Developer not found".to_string()));
        }
        if tx
            .find_review_by_author(new_review.developer_id, new_review.client_id)
            .await?
            .is_some()
        {
            return Err(ReviewError::Conflict(
                "You have already reviewed this developer".to_string(),
            ));
        }

        let review = tx.insert_review(&new_review).await?;
        let developer = AggregateMaintainer::recompute(tx.as_mut(), review.developer_id).await?;
        tx.commit().await?;

        tracing::info!(
            review_id = review.id,
            developer_id = review.developer_id,
            client_id = review.client_id,
            rating = review.rating,
            "review added"
        );
        Ok(ReviewOutcome { review, developer })
    }

    pub async fn update_review(
        &self,
        requester: &Requester,
        review_id: i32,
        input: UpdateReview,
    ) -> Result<ReviewOutcome, ReviewError> {
        self.try_update_review(requester, review_id, input)
            .await
            .map_err(|e| report("update_review", e))
    }

    async fn try_update_review(
        &self,
        requester: &Requester,
        review_id: i32,
        input: UpdateReview,
    ) -> Result<ReviewOutcome, ReviewError> {
        let patch = validate::patch(input)?;

        let mut tx = self.repo.begin().await?;
        let developer_id = lock_review_developer(tx.as_mut(), review_id).await?;
        check_author(tx.as_mut(), review_id, DeleteAuthority::Author(requester.user_id)).await?;

        let review = tx
            .update_review(review_id, &patch)
            .await?
            .ok_or_else(review_not_found)?;
        let developer = AggregateMaintainer::recompute(tx.as_mut(), developer_id).await?;
        tx.commit().await?;

        tracing::info!(review_id, developer_id, client_id = requester.user_id, "review updated");
        Ok(ReviewOutcome { review, developer })
    }

    /// Delete a review and return the developer's aggregate after the delete.
    pub async fn delete_review(
        &self,
        review_id: i32,
        authority: DeleteAuthority,
    ) -> Result<DeveloperAggregate, ReviewError> {
        self.try_delete_review(review_id, authority)
            .await
            .map_err(|e| report("delete_review", e))
    }

    async fn try_delete_review(
        &self,
        review_id: i32,
        authority: DeleteAuthority,
    ) -> Result<DeveloperAggregate, ReviewError> {
        let mut tx = self.repo.begin().await?;
        let developer_id = lock_review_developer(tx.as_mut(), review_id).await?;
        check_author(tx.as_mut(), review_id, authority).await?;

        if !tx.delete_review(review_id).await? {
            return Err(review_not_found());
        }
        let developer = AggregateMaintainer::recompute(tx.as_mut(), developer_id).await?;
        tx.commit().await?;

        tracing::info!(review_id, developer_id, ?authority, "review deleted");
        Ok(developer)
    }

    pub async fn list_for_developer(&self, developer_id: i32) -> Result<Vec<DeveloperReview>, ReviewError> {
        self.repo
            .list_for_developer(developer_id)
            .await
            .map_err(|e| report("list_for_developer", e))
    }

    /// Admin listing. `limit` falls back to the configured page size and is clamped to its maximum.
    pub async fn list_all(&self, limit: Option<i64>, offset: Option<i64>) -> Result<Vec<AdminReview>, ReviewError> {
        let page = Page {
            limit: config().page_limit(limit),
            offset: offset.unwrap_or(0).max(0),
        };
        self.repo
            .list_all(page)
            .await
            .map_err(|e| report("list_all", e))
    }

    pub async fn aggregate(&self, developer_id: i32) -> Result<DeveloperAggregate, ReviewError> {
        self.repo
            .aggregate(developer_id)
            .await
            .and_then(|found| found.ok_or_else(developer_not_found))
            .map_err(|e| report("aggregate", e))
    }

    /// Recompute one developer's aggregate from its review rows in a transaction of its own.
    pub async fn recompute(&self, developer_id: i32) -> Result<DeveloperAggregate, ReviewError> {
        self.try_recompute(developer_id)
            .await
            .map(|(_, after)| after)
            .map_err(|e| report("recompute", e))
    }

    async fn try_recompute(
        &self,
        developer_id: i32,
    ) -> Result<(DeveloperAggregate, DeveloperAggregate), ReviewError> {
        let mut tx = self.repo.begin().await?;
        let before = tx
            .lock_developer(developer_id)
            .await?
            .ok_or_else(developer_not_found)?;
        let after = AggregateMaintainer::recompute(tx.as_mut(), developer_id).await?;
        tx.commit().await?;
        Ok((before, after))
    }

    /// Recompute every developer and report the ones whose stored aggregate was stale.
    ///
    /// Each developer gets its own transaction. A developer removed between listing and
    /// locking is skipped.
    pub async fn reconcile_all(&self) -> Result<ReconcileReport, ReviewError> {
        let ids = self
            .repo
            .developer_ids()
            .await
            .map_err(|e| report("reconcile_all", e))?;

        let mut report_out = ReconcileReport::default();
        for developer_id in ids {
            match self.try_recompute(developer_id).await {
                Ok((before, after)) => {
                    report_out.checked += 1;
                    if before != after {
                        tracing::warn!(
                            developer_id,
                            stored_rating = %before.rating,
                            stored_total = before.total_reviews,
                            rating = %after.rating,
                            total_reviews = after.total_reviews,
                            "corrected drifted developer aggregate"
                        );
                        report_out.corrected.push(AggregateDrift { before, after });
                    }
                }
                Err(ReviewError::NotFound(_)) => continue,
                Err(e) => return Err(report("reconcile_all", e)),
            }
        }

        tracing::info!(
            checked = report_out.checked,
            corrected = report_out.corrected.len(),
            "reconciled developer aggregates"
        );
        Ok(report_out)
    }

    /// Delete a user; the store cascades to their reviews, and every developer they had
    /// reviewed gets its aggregate recomputed in the same transaction.
    pub async fn remove_user(&self, user_id: i32) -> Result<UserRemoval, ReviewError> {
        self.try_remove_user(user_id)
            .await
            .map_err(|e| report("remove_user", e))
    }

    async fn try_remove_user(&self, user_id: i32) -> Result<UserRemoval, ReviewError> {
        let mut tx = self.repo.begin().await?;

        // Developers before the user, matching the order an insert takes them in.
        let mut locked = tx.developers_reviewed_by(user_id).await?;
        for developer_id in &locked {
            tx.lock_developer(*developer_id).await?;
        }
        if !tx.lock_user(user_id).await? {
            return Err(ReviewError::NotFound("User not found".to_string()));
        }

        // Reviews committed between the first read and the user lock
        let mut late: Vec<i32> = tx
            .developers_reviewed_by(user_id)
            .await?
            .into_iter()
            .filter(|id| !locked.contains(id))
            .collect();
        late.sort_unstable();
        for developer_id in &late {
            tx.lock_developer(*developer_id).await?;
        }
        locked.extend(late);
        locked.sort_unstable();

        if !tx.delete_user(user_id).await? {
            return Err(ReviewError::NotFound("User not found".to_string()));
        }

        let mut recomputed = Vec::with_capacity(locked.len());
        for developer_id in locked {
            // The user's own developer profile goes with the user.
            if tx.lock_developer(developer_id).await?.is_none() {
                continue;
            }
            recomputed.push(AggregateMaintainer::recompute(tx.as_mut(), developer_id).await?);
        }
        tx.commit().await?;

        tracing::info!(user_id, developers = recomputed.len(), "user removed");
        Ok(UserRemoval { user_id, recomputed })
    }

    pub async fn health_check(&self) -> Result<(), ReviewError> {
        self.repo.ping().await
    }
}

async fn lock_review_developer(tx: &mut dyn ReviewTransaction, review_id: i32) -> Result<i32, ReviewError> {
    tx.lock_developer_for_review(review_id)
        .await?
        .ok_or_else(review_not_found)
}

async fn check_author(
    tx: &mut dyn ReviewTransaction,
    review_id: i32,
    authority: DeleteAuthority,
) -> Result<(), ReviewError> {
    let review = tx.find_review(review_id).await?.ok_or_else(review_not_found)?;
    match authority {
        DeleteAuthority::Admin => Ok(()),
        DeleteAuthority::Author(user_id) if review.client_id == user_id => Ok(()),
        DeleteAuthority::Author(_) => Err(ReviewError::PermissionDenied(
            "You can only modify your own reviews".to_string(),
        )),
    }
}

fn review_not_found() -> ReviewError {
    ReviewError::NotFound("Review not found".to_string())
}

fn developer_not_found() -> ReviewError {
    ReviewError::NotFound("Developer not found".to_string())
}

fn report(operation: &'static str, err: ReviewError) -> ReviewError {
    match &err {
        ReviewError::TransientStorageFailure(msg) => {
            tracing::error!(operation, error = %msg, retryable = true, "review store failure")
        }
        ReviewError::Storage(msg) => tracing::error!(operation, error = %msg, "review store failure"),
        ReviewError::PermissionDenied(_) | ReviewError::Conflict(_) => {
            tracing::warn!(operation, error = %err, "review request rejected")
        }
        ReviewError::NotFound(_) | ReviewError::InvalidArgument { .. } => {
            tracing::debug!(operation, error = %err, "review request rejected")
        }
    }
    err
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::reviews::memory::{FaultPoint, MemoryReviewRepository};

    struct Fixture {
        repo: MemoryReviewRepository,
        service: ReviewService,
        developer: i32,
    }

    async fn fixture() -> Fixture {
        let repo = MemoryReviewRepository::new();
        let developer = repo.add_developer("ada").await;
        let service = ReviewService::new(Arc::new(repo.clone()));
        Fixture {
            repo,
            service,
            developer,
        }
    }

    async fn client(repo: &MemoryReviewRepository, name: &str) -> Requester {
        Requester {
            user_id: repo.add_user(name).await,
            user_type: UserType::Client,
        }
    }

    fn add(developer_id: i32, rating: i64) -> AddReview {
        AddReview {
            developer_id,
            rating,
            message: "Delivered on time".to_string(),
        }
    }

    fn rating(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[tokio::test]
    async fn add_then_delete_tracks_aggregate() {
        let f = fixture().await;
        let a = client(&f.repo, "alice").await;
        let b = client(&f.repo, "bob").await;

        let first = f.service.add_review(&a, add(f.developer, 4)).await.unwrap();
        assert_eq!(first.developer.total_reviews, 1);
        assert_eq!(first.developer.rating, rating("4.00"));

        let second = f.service.add_review(&b, add(f.developer, 2)).await.unwrap();
        assert_eq!(second.developer.total_reviews, 2);
        assert_eq!(second.developer.rating, rating("3.00"));

        let after = f
            .service
            .delete_review(first.review.id, DeleteAuthority::Author(a.user_id))
            .await
            .unwrap();
        assert_eq!(after.total_reviews, 1);
        assert_eq!(after.rating, rating("2.00"));
        assert_eq!(f.service.aggregate(f.developer).await.unwrap(), after);
    }

    #[tokio::test]
    async fn deleting_last_review_resets_to_zero() {
        let f = fixture().await;
        let a = client(&f.repo, "alice").await;

        let outcome = f.service.add_review(&a, add(f.developer, 5)).await.unwrap();
        let after = f
            .service
            .delete_review(outcome.review.id, DeleteAuthority::Admin)
            .await
            .unwrap();

        assert_eq!(after.total_reviews, 0);
        assert_eq!(after.rating.to_string(), "0.00");
    }

    #[tokio::test]
    async fn second_review_by_same_client_conflicts() {
        let f = fixture().await;
        let a = client(&f.repo, "alice").await;

        f.service.add_review(&a, add(f.developer, 5)).await.unwrap();
        let err = f.service.add_review(&a, add(f.developer, 1)).await.unwrap_err();

        assert!(matches!(err, ReviewError::Conflict(_)));
        let aggregate = f.service.aggregate(f.developer).await.unwrap();
        assert_eq!(aggregate.total_reviews, 1);
        assert_eq!(aggregate.rating, rating("5.00"));
    }

    #[tokio::test]
    async fn only_clients_add_reviews() {
        let f = fixture().await;
        let dev_user = Requester {
            user_id: f.repo.add_user("grace").await,
            user_type: UserType::Developer,
        };

        let err = f.service.add_review(&dev_user, add(f.developer, 5)).await.unwrap_err();
        assert!(matches!(err, ReviewError::PermissionDenied(_)));
        assert_eq!(f.repo.review_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_developer_is_not_found() {
        let f = fixture().await;
        let a = client(&f.repo, "alice").await;

        let err = f.service.add_review(&a, add(f.developer + 100, 5)).await.unwrap_err();
        assert!(matches!(err, ReviewError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_rating_never_reaches_the_store() {
        let f = fixture().await;
        let a = client(&f.repo, "alice").await;
        // would trip on insert if validation let it through
        f.repo.fail_once(FaultPoint::InsertReview);

        let err = f.service.add_review(&a, add(f.developer, 6)).await.unwrap_err();
        assert!(matches!(err, ReviewError::InvalidArgument { field: "rating", .. }));

        // still armed
        let err = f.service.add_review(&a, add(f.developer, 3)).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn update_is_partial_and_author_only() {
        let f = fixture().await;
        let a = client(&f.repo, "alice").await;
        let b = client(&f.repo, "bob").await;
        let created = f.service.add_review(&a, add(f.developer, 2)).await.unwrap();

        let err = f
            .service
            .update_review(&b, created.review.id, UpdateReview { rating: Some(5), message: None })
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::PermissionDenied(_)));

        let updated = f
            .service
            .update_review(&a, created.review.id, UpdateReview { rating: Some(5), message: None })
            .await
            .unwrap();
        assert_eq!(updated.review.rating, 5);
        assert_eq!(updated.review.message, "Delivered on time");
        assert_eq!(updated.developer.rating, rating("5.00"));

        let unchanged = f
            .service
            .update_review(&a, created.review.id, UpdateReview::default())
            .await
            .unwrap();
        assert_eq!(unchanged.review, updated.review);
        assert_eq!(unchanged.developer, updated.developer);
    }

    #[tokio::test]
    async fn author_delete_checks_ownership() {
        let f = fixture().await;
        let a = client(&f.repo, "alice").await;
        let b = client(&f.repo, "bob").await;
        let created = f.service.add_review(&a, add(f.developer, 4)).await.unwrap();

        let err = f
            .service
            .delete_review(created.review.id, DeleteAuthority::Author(b.user_id))
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::PermissionDenied(_)));
        assert_eq!(f.repo.review_count().await, 1);

        let missing = f
            .service
            .delete_review(created.review.id + 1, DeleteAuthority::Admin)
            .await
            .unwrap_err();
        assert!(matches!(missing, ReviewError::NotFound(_)));
    }

    #[tokio::test]
    async fn recompute_is_idempotent() {
        let f = fixture().await;
        let a = client(&f.repo, "alice").await;
        let b = client(&f.repo, "bob").await;
        let c = client(&f.repo, "carol").await;
        f.service.add_review(&a, add(f.developer, 2)).await.unwrap();
        f.service.add_review(&b, add(f.developer, 5)).await.unwrap();
        let last = f.service.add_review(&c, add(f.developer, 1)).await.unwrap();

        let once = f.service.recompute(f.developer).await.unwrap();
        let twice = f.service.recompute(f.developer).await.unwrap();
        assert_eq!(once, last.developer);
        assert_eq!(once, twice);
        assert_eq!(once.rating, rating("2.67"));
    }

    #[tokio::test]
    async fn failed_recompute_rolls_back_the_insert() {
        let f = fixture().await;
        let a = client(&f.repo, "alice").await;
        f.repo.fail_once(FaultPoint::StoreAggregate);

        let err = f.service.add_review(&a, add(f.developer, 5)).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(f.repo.review_count().await, 0);
        assert_eq!(f.service.aggregate(f.developer).await.unwrap().total_reviews, 0);

        // the retry goes through once the fault has cleared
        let outcome = f.service.add_review(&a, add(f.developer, 5)).await.unwrap();
        assert_eq!(outcome.developer.total_reviews, 1);
    }

    #[tokio::test]
    async fn failed_update_rolls_back() {
        let f = fixture().await;
        let a = client(&f.repo, "alice").await;
        let created = f.service.add_review(&a, add(f.developer, 2)).await.unwrap();
        let patch = UpdateReview {
            rating: Some(5),
            message: Some("Changed my mind".to_string()),
        };

        f.repo.fail_once(FaultPoint::UpdateReview);
        let err = f
            .service
            .update_review(&a, created.review.id, patch.clone())
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        // the row is rewritten, then the aggregate read fails
        f.repo.fail_once(FaultPoint::RatingTotals);
        let err = f
            .service
            .update_review(&a, created.review.id, patch.clone())
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        let listed = f.service.list_for_developer(f.developer).await.unwrap();
        assert_eq!(listed[0].rating, 2);
        assert_eq!(listed[0].message, "Delivered on time");
        assert_eq!(f.service.aggregate(f.developer).await.unwrap(), created.developer);

        let updated = f.service.update_review(&a, created.review.id, patch).await.unwrap();
        assert_eq!(updated.developer.rating, rating("5.00"));
    }

    #[tokio::test]
    async fn failed_delete_rolls_back() {
        let f = fixture().await;
        let a = client(&f.repo, "alice").await;
        let created = f.service.add_review(&a, add(f.developer, 4)).await.unwrap();

        f.repo.fail_once(FaultPoint::DeleteReview);
        let err = f
            .service
            .delete_review(created.review.id, DeleteAuthority::Author(a.user_id))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(f.repo.review_count().await, 1);
        assert_eq!(f.service.aggregate(f.developer).await.unwrap(), created.developer);

        f.repo.fail_once(FaultPoint::RatingTotals);
        f.service
            .delete_review(created.review.id, DeleteAuthority::Admin)
            .await
            .unwrap_err();
        assert_eq!(f.repo.review_count().await, 1);
        assert_eq!(f.service.aggregate(f.developer).await.unwrap().total_reviews, 1);
    }

    #[tokio::test]
    async fn failed_commit_keeps_the_review() {
        let f = fixture().await;
        let a = client(&f.repo, "alice").await;
        let created = f.service.add_review(&a, add(f.developer, 3)).await.unwrap();
        f.repo.fail_once(FaultPoint::Commit);

        f.service
            .delete_review(created.review.id, DeleteAuthority::Admin)
            .await
            .unwrap_err();

        assert_eq!(f.repo.review_count().await, 1);
        assert_eq!(f.service.aggregate(f.developer).await.unwrap(), created.developer);
    }

    #[tokio::test]
    async fn concurrent_adds_both_count() {
        let f = fixture().await;
        let a = client(&f.repo, "alice").await;
        let b = client(&f.repo, "bob").await;

        let (first, second) = tokio::join!(
            f.service.add_review(&a, add(f.developer, 5)),
            f.service.add_review(&b, add(f.developer, 3)),
        );
        first.unwrap();
        second.unwrap();

        let aggregate = f.service.aggregate(f.developer).await.unwrap();
        assert_eq!(aggregate.total_reviews, 2);
        assert_eq!(aggregate.rating, rating("4.00"));
    }

    #[tokio::test]
    async fn removing_a_client_recomputes_every_developer_they_reviewed() {
        let f = fixture().await;
        let other = f.repo.add_developer("linus").await;
        let a = client(&f.repo, "alice").await;
        let b = client(&f.repo, "bob").await;
        f.service.add_review(&a, add(f.developer, 1)).await.unwrap();
        f.service.add_review(&b, add(f.developer, 5)).await.unwrap();
        f.service.add_review(&a, add(other, 2)).await.unwrap();

        let removal = f.service.remove_user(a.user_id).await.unwrap();
        assert_eq!(removal.recomputed.len(), 2);

        let first = f.service.aggregate(f.developer).await.unwrap();
        assert_eq!(first.total_reviews, 1);
        assert_eq!(first.rating, rating("5.00"));
        let second = f.service.aggregate(other).await.unwrap();
        assert_eq!(second.total_reviews, 0);
        assert_eq!(second.rating, Decimal::ZERO);

        let err = f.service.remove_user(a.user_id).await.unwrap_err();
        assert!(matches!(err, ReviewError::NotFound(_)));
    }

    #[tokio::test]
    async fn reconcile_repairs_drift() {
        let f = fixture().await;
        let healthy = f.repo.add_developer("linus").await;
        let a = client(&f.repo, "alice").await;
        f.service.add_review(&a, add(f.developer, 4)).await.unwrap();
        f.service.add_review(&a, add(healthy, 3)).await.unwrap();

        f.repo
            .force_aggregate(DeveloperAggregate {
                developer_id: f.developer,
                rating: rating("1.50"),
                total_reviews: 7,
            })
            .await;

        let report = f.service.reconcile_all().await.unwrap();
        assert_eq!(report.checked, 2);
        assert_eq!(report.corrected.len(), 1);
        assert_eq!(report.corrected[0].before.total_reviews, 7);
        assert_eq!(report.corrected[0].after.rating, rating("4.00"));

        let again = f.service.reconcile_all().await.unwrap();
        assert!(again.corrected.is_empty());
    }

    #[tokio::test]
    async fn listings_are_newest_first() {
        let f = fixture().await;
        let a = client(&f.repo, "alice").await;
        let b = client(&f.repo, "bob").await;
        let older = f.service.add_review(&a, add(f.developer, 4)).await.unwrap();
        let newer = f.service.add_review(&b, add(f.developer, 2)).await.unwrap();

        let listed = f.service.list_for_developer(f.developer).await.unwrap();
        let ids: Vec<i32> = listed.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![newer.review.id, older.review.id]);
        assert_eq!(listed[0].client_name, "bob");

        assert!(f.service.list_for_developer(999).await.unwrap().is_empty());

        let page = f.service.list_all(Some(1), Some(1)).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, older.review.id);
        assert_eq!(page[0].developer_name, "ada");
    }
}
