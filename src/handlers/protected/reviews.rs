use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Json, Path, State};
use axum::Extension;
use serde_json::{json, Value};

use crate::handlers::extract::{json_body, path_id};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::reviews::{AddReview, DeleteAuthority, Requester, ReviewOutcome, UpdateReview};
use crate::state::AppState;

/// POST /api/reviews - Leave a review for a developer
///
/// Clients only, one review per developer. The developer's aggregate is
/// recomputed in the same transaction and returned alongside the review.
///
/// Expected Input:
/// ```json
/// { "developer_id": 3, "rating": 5, "message": "Shipped ahead of schedule" }
/// ```
///
/// Expected Output (201):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "review": { "id": 12, "developer_id": 3, "client_id": 8, "rating": 5, ... },
///     "developer": { "developer_id": 3, "rating": "4.50", "total_reviews": 2 }
///   }
/// }
/// ```
pub async fn add(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<AddReview>, JsonRejection>,
) -> ApiResult<ReviewOutcome> {
    let input = json_body(body)?;
    let outcome = state.reviews.add_review(&Requester::from(&user), input).await?;
    Ok(ApiResponse::created(outcome))
}

/// PUT|PATCH /api/reviews/:id - Edit your own review
///
/// Omitted fields keep their stored value.
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    review_id: Result<Path<i32>, PathRejection>,
    body: Result<Json<UpdateReview>, JsonRejection>,
) -> ApiResult<ReviewOutcome> {
    let review_id = path_id(review_id)?;
    let input = json_body(body)?;
    let outcome = state
        .reviews
        .update_review(&Requester::from(&user), review_id, input)
        .await?;
    Ok(ApiResponse::success(outcome))
}

/// DELETE /api/reviews/:id - Remove your own review
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    review_id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Value> {
    let review_id = path_id(review_id)?;
    let developer = state
        .reviews
        .delete_review(review_id, DeleteAuthority::Author(user.id))
        .await?;
    Ok(ApiResponse::success(json!({
        "deleted": review_id,
        "developer": developer
    })))
}
