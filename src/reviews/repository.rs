use async_trait::async_trait;

use super::aggregate::RatingTotals;
use super::error::ReviewError;
use super::model::{AdminReview, DeveloperAggregate, DeveloperReview, NewReview, Page, Review, ReviewPatch};

/// Injected storage handle for the review subsystem.
///
/// Reads that do not feed a mutation go straight through the repository. Anything that
/// changes review rows goes through a [`ReviewTransaction`] so the mutation and its
/// aggregate recompute commit or roll back together.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn ReviewTransaction>, ReviewError>;

    /// Reviews for one developer, newest first.
    async fn list_for_developer(&self, developer_id: i32) -> Result<Vec<DeveloperReview>, ReviewError>;

    /// All reviews, newest first.
    async fn list_all(&self, page: Page) -> Result<Vec<AdminReview>, ReviewError>;

    /// Stored aggregate of a developer, `None` when the developer does not exist.
    async fn aggregate(&self, developer_id: i32) -> Result<Option<DeveloperAggregate>, ReviewError>;

    async fn developer_ids(&self) -> Result<Vec<i32>, ReviewError>;

    async fn ping(&self) -> Result<(), ReviewError>;
}

/// One unit of work against the store. Dropping it without [`ReviewTransaction::commit`]
/// discards every change made through it.
#[async_trait]
pub trait ReviewTransaction: Send {
    /// Lock a developer row for the rest of the transaction and return its stored aggregate.
    async fn lock_developer(&mut self, developer_id: i32) -> Result<Option<DeveloperAggregate>, ReviewError>;

    /// Lock the developer a review belongs to and return that developer's id.
    async fn lock_developer_for_review(&mut self, review_id: i32) -> Result<Option<i32>, ReviewError>;

    /// Lock a user row; blocks concurrent review inserts referencing the user.
    async fn lock_user(&mut self, user_id: i32) -> Result<bool, ReviewError>;

    async fn find_review(&mut self, review_id: i32) -> Result<Option<Review>, ReviewError>;

    async fn find_review_by_author(
        &mut self,
        developer_id: i32,
        client_id: i32,
    ) -> Result<Option<Review>, ReviewError>;

    async fn insert_review(&mut self, review: &NewReview) -> Result<Review, ReviewError>;

    async fn update_review(&mut self, review_id: i32, patch: &ReviewPatch) -> Result<Option<Review>, ReviewError>;

    async fn delete_review(&mut self, review_id: i32) -> Result<bool, ReviewError>;

    /// Developers the user has reviewed, ascending.
    async fn developers_reviewed_by(&mut self, client_id: i32) -> Result<Vec<i32>, ReviewError>;

    /// Delete a user and everything that cascades from it (their reviews, their developer profile).
    async fn delete_user(&mut self, user_id: i32) -> Result<bool, ReviewError>;

    async fn rating_totals(&mut self, developer_id: i32) -> Result<RatingTotals, ReviewError>;

    /// Only [`super::aggregate::AggregateMaintainer`] calls this.
    async fn store_aggregate(&mut self, aggregate: &DeveloperAggregate) -> Result<(), ReviewError>;

    async fn commit(self: Box<Self>) -> Result<(), ReviewError>;
}
