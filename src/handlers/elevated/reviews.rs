use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Extension;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::handlers::extract::{path_id, query};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::reviews::{AdminReview, DeleteAuthority};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Page size; defaults to `api.default_page_size`, capped at `api.max_page_size`
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/admin/reviews?limit&offset - All reviews, newest first, for moderation
pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<AdminReview>> {
    let params = query(params)?;
    let reviews = state.reviews.list_all(params.limit, params.offset).await?;
    Ok(ApiResponse::success(reviews))
}

/// DELETE /api/admin/reviews/:id - Remove any review regardless of author
pub async fn delete(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    review_id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Value> {
    let review_id = path_id(review_id)?;
    let developer = state
        .reviews
        .delete_review(review_id, DeleteAuthority::Admin)
        .await?;

    tracing::info!(review_id, admin_id = admin.id, "review removed by admin");
    Ok(ApiResponse::success(json!({
        "deleted": review_id,
        "developer": developer
    })))
}
