use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::aggregate::RatingTotals;
use super::error::ReviewError;
use super::model::{AdminReview, DeveloperAggregate, DeveloperReview, NewReview, Page, Review, ReviewPatch};
use super::repository::{ReviewRepository, ReviewTransaction};

const REVIEW_COLUMNS: &str = "id, developer_id, client_id, rating, message, created_at";

/// sqlx-backed review store against the `reviews`, `developers` and `users` tables.
#[derive(Clone)]
pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    async fn begin(&self) -> Result<Box<dyn ReviewTransaction>, ReviewError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgReviewTransaction { tx }))
    }

    async fn list_for_developer(&self, developer_id: i32) -> Result<Vec<DeveloperReview>, ReviewError> {
        let reviews = sqlx::query_as::<_, DeveloperReview>(
            r#"
            SELECT r.id, r.developer_id, r.client_id, r.rating, r.message, r.created_at,
                   u.full_name AS client_name
            FROM reviews r
            JOIN users u ON r.client_id = u.id
            WHERE r.developer_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .bind(developer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    async fn list_all(&self, page: Page) -> Result<Vec<AdminReview>, ReviewError> {
        let reviews = sqlx::query_as::<_, AdminReview>(
            r#"
            SELECT r.id, r.developer_id, r.client_id, r.rating, r.message, r.created_at,
                   d.username AS developer_name,
                   u.full_name AS client_name
            FROM reviews r
            JOIN developers d ON r.developer_id = d.id
            JOIN users u ON r.client_id = u.id
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    async fn aggregate(&self, developer_id: i32) -> Result<Option<DeveloperAggregate>, ReviewError> {
        let aggregate = sqlx::query_as::<_, DeveloperAggregate>(
            "SELECT id AS developer_id, rating, total_reviews FROM developers WHERE id = $1",
        )
        .bind(developer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(aggregate.map(DeveloperAggregate::normalized))
    }

    async fn developer_ids(&self) -> Result<Vec<i32>, ReviewError> {
        let ids = sqlx::query_scalar::<_, i32>("SELECT id FROM developers ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn ping(&self) -> Result<(), ReviewError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PgReviewTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ReviewTransaction for PgReviewTransaction {
    async fn lock_developer(&mut self, developer_id: i32) -> Result<Option<DeveloperAggregate>, ReviewError> {
        let aggregate = sqlx::query_as::<_, DeveloperAggregate>(
            "SELECT id AS developer_id, rating, total_reviews FROM developers WHERE id = $1 FOR UPDATE",
        )
        .bind(developer_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(aggregate.map(DeveloperAggregate::normalized))
    }

    async fn lock_developer_for_review(&mut self, review_id: i32) -> Result<Option<i32>, ReviewError> {
        let developer_id = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT d.id
            FROM reviews r
            JOIN developers d ON r.developer_id = d.id
            WHERE r.id = $1
            FOR UPDATE OF d
            "#,
        )
        .bind(review_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(developer_id)
    }

    async fn lock_user(&mut self, user_id: i32) -> Result<bool, ReviewError> {
        let found = sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(found.is_some())
    }

    async fn find_review(&mut self, review_id: i32) -> Result<Option<Review>, ReviewError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {} FROM reviews WHERE id = $1",
            REVIEW_COLUMNS
        ))
        .bind(review_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(review)
    }

    async fn find_review_by_author(
        &mut self,
        developer_id: i32,
        client_id: i32,
    ) -> Result<Option<Review>, ReviewError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {} FROM reviews WHERE developer_id = $1 AND client_id = $2",
            REVIEW_COLUMNS
        ))
        .bind(developer_id)
        .bind(client_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(review)
    }

    async fn insert_review(&mut self, review: &NewReview) -> Result<Review, ReviewError> {
        let inserted = sqlx::query_as::<_, Review>(&format!(
            "INSERT INTO reviews (developer_id, client_id, rating, message, created_at)
             VALUES ($1, $2, $3, $4, NOW())
             RETURNING {}",
            REVIEW_COLUMNS
        ))
        .bind(review.developer_id)
        .bind(review.client_id)
        .bind(review.rating)
        .bind(&review.message)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(inserted)
    }

    async fn update_review(&mut self, review_id: i32, patch: &ReviewPatch) -> Result<Option<Review>, ReviewError> {
        let updated = sqlx::query_as::<_, Review>(&format!(
            "UPDATE reviews
             SET rating = COALESCE($1, rating),
                 message = COALESCE($2, message)
             WHERE id = $3
             RETURNING {}",
            REVIEW_COLUMNS
        ))
        .bind(patch.rating)
        .bind(patch.message.as_deref())
        .bind(review_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(updated)
    }

    async fn delete_review(&mut self, review_id: i32) -> Result<bool, ReviewError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn developers_reviewed_by(&mut self, client_id: i32) -> Result<Vec<i32>, ReviewError> {
        let ids = sqlx::query_scalar::<_, i32>(
            "SELECT DISTINCT developer_id FROM reviews WHERE client_id = $1 ORDER BY developer_id",
        )
        .bind(client_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids)
    }

    async fn delete_user(&mut self, user_id: i32) -> Result<bool, ReviewError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn rating_totals(&mut self, developer_id: i32) -> Result<RatingTotals, ReviewError> {
        let (count, sum) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*)::BIGINT, COALESCE(SUM(rating), 0)::BIGINT FROM reviews WHERE developer_id = $1",
        )
        .bind(developer_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(RatingTotals { count, sum })
    }

    async fn store_aggregate(&mut self, aggregate: &DeveloperAggregate) -> Result<(), ReviewError> {
        sqlx::query("UPDATE developers SET rating = $1, total_reviews = $2 WHERE id = $3")
            .bind(aggregate.rating)
            .bind(aggregate.total_reviews)
            .bind(aggregate.developer_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), ReviewError> {
        self.tx.commit().await?;
        Ok(())
    }
}
