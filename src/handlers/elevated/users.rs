use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::Extension;

use crate::handlers::extract::path_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::reviews::UserRemoval;
use crate::state::AppState;

/// DELETE /api/admin/users/:id - Delete a user account
///
/// The delete cascades to the user's reviews. Every developer they had
/// reviewed is listed under `recomputed` with its new aggregate.
pub async fn delete(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    user_id: Result<Path<i32>, PathRejection>,
) -> ApiResult<UserRemoval> {
    let user_id = path_id(user_id)?;
    let removal = state.reviews.remove_user(user_id).await?;
    tracing::info!(user_id, admin_id = admin.id, "user removed by admin");
    Ok(ApiResponse::success(removal))
}
