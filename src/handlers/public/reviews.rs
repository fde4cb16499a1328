use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use serde::Serialize;

use crate::handlers::extract::path_id;
use crate::middleware::{ApiResponse, ApiResult};
use crate::reviews::{DeveloperAggregate, DeveloperReview};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ReviewList {
    pub reviews: Vec<DeveloperReview>,
    pub count: usize,
}

/// GET /api/reviews/developer/:developer_id - Reviews shown on a developer profile
///
/// Newest first, each with the author's display name. An unknown developer
/// yields an empty list.
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "reviews": [
///       {
///         "id": 12,
///         "developer_id": 3,
///         "client_id": 8,
///         "rating": 5,
///         "message": "Shipped ahead of schedule",
///         "created_at": "2025-01-01T12:00:00Z",
///         "client_name": "Grace Hopper"
///       }
///     ],
///     "count": 1
///   }
/// }
/// ```
pub async fn list_for_developer(
    State(state): State<AppState>,
    developer_id: Result<Path<i32>, PathRejection>,
) -> ApiResult<ReviewList> {
    let developer_id = path_id(developer_id)?;
    let reviews = state.reviews.list_for_developer(developer_id).await?;
    Ok(ApiResponse::success(ReviewList {
        count: reviews.len(),
        reviews,
    }))
}

/// GET /api/reviews/developer/:developer_id/summary - Stored rating aggregate
pub async fn developer_summary(
    State(state): State<AppState>,
    developer_id: Result<Path<i32>, PathRejection>,
) -> ApiResult<DeveloperAggregate> {
    let developer_id = path_id(developer_id)?;
    let aggregate = state.reviews.aggregate(developer_id).await?;
    Ok(ApiResponse::success(aggregate))
}
