use crate::error::{ApiError, ErrorResponse};
use crate::models::Cat;
use crate::routes;
use crate::state::AppState;
use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};

/// POST /cats handler - Store a batch of new cats
///
/// Any `id` in the payload is ignored; the datastore assigns fresh keys.
#[utoipa::path(
    post,
    path = routes::CATS,
    request_body = Vec<Cat>,
    responses(
        (status = 200, description = "Cats stored"),
        (status = 422, description = "Body does not match the Cat schema", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "cats"
)]
pub async fn store_handler(
    State(state): State<AppState>,
    payload: Result<Json<Vec<Cat>>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(cats) = payload?;

    state.storage.store_cats(cats).await?;

    Ok(StatusCode::OK)
}
