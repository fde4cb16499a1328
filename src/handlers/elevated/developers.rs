use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};

use crate::handlers::extract::path_id;
use crate::middleware::{ApiResponse, ApiResult};
use crate::reviews::DeveloperAggregate;
use crate::state::AppState;

/// POST /api/admin/developers/:id/recompute - Rebuild one developer's aggregate from its reviews
pub async fn recompute(
    State(state): State<AppState>,
    developer_id: Result<Path<i32>, PathRejection>,
) -> ApiResult<DeveloperAggregate> {
    let developer_id = path_id(developer_id)?;
    let aggregate = state.reviews.recompute(developer_id).await?;
    Ok(ApiResponse::success(aggregate))
}
