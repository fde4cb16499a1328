use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::UserType;

/// A stored client→developer review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: i32,
    pub developer_id: i32,
    pub client_id: i32,
    pub rating: i16,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Review row joined with the author's display name, as shown on a developer profile.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeveloperReview {
    pub id: i32,
    pub developer_id: i32,
    pub client_id: i32,
    pub rating: i16,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub client_name: String,
}

/// Review row joined with both parties, for moderation listings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminReview {
    pub id: i32,
    pub developer_id: i32,
    pub client_id: i32,
    pub rating: i16,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub developer_name: String,
    pub client_name: String,
}

/// The denormalized `rating` / `total_reviews` pair cached on a developer row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DeveloperAggregate {
    pub developer_id: i32,
    pub rating: Decimal,
    pub total_reviews: i32,
}

/// Validated insert payload.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub developer_id: i32,
    pub client_id: i32,
    pub rating: i16,
    pub message: String,
}

/// Validated partial update. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ReviewPatch {
    pub rating: Option<i16>,
    pub message: Option<String>,
}

/// Request body for `POST /api/reviews`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddReview {
    #[serde(alias = "developerId")]
    pub developer_id: i32,
    pub rating: i64,
    pub message: String,
}

/// Request body for `PUT`/`PATCH /api/reviews/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReview {
    pub rating: Option<i64>,
    pub message: Option<String>,
}

/// Verified caller identity handed over by the authentication layer.
#[derive(Debug, Clone, Copy)]
pub struct Requester {
    pub user_id: i32,
    pub user_type: UserType,
}

/// Who is allowed to remove a review: its author, or an administrator regardless of authorship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteAuthority {
    Author(i32),
    Admin,
}

/// A mutated review together with the developer aggregate committed alongside it.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub review: Review,
    pub developer: DeveloperAggregate,
}

/// Result of a user removal: every developer whose aggregate was recomputed.
#[derive(Debug, Clone, Serialize)]
pub struct UserRemoval {
    pub user_id: i32,
    pub recomputed: Vec<DeveloperAggregate>,
}

/// A developer whose stored aggregate disagreed with its review rows.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateDrift {
    pub before: DeveloperAggregate,
    pub after: DeveloperAggregate,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub checked: usize,
    pub corrected: Vec<AggregateDrift>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}
