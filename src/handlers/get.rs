use crate::error::{ApiError, ErrorResponse};
use crate::models::Cat;
use crate::routes;
use crate::state::AppState;
use axum::{extract::Path, extract::State, http::StatusCode, Json};

/// GET /cat/:id handler - Retrieve a single cat
#[utoipa::path(
    get,
    path = routes::CAT_ITEM,
    params(
        ("id" = String, Path, description = "Opaque cat id as returned by the list endpoint")
    ),
    responses(
        (status = 200, description = "Cat found", body = Cat),
        (status = 400, description = "Invalid Cat ID", body = ErrorResponse),
        (status = 404, description = "Cat not found", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "cats"
)]
pub async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Cat>), ApiError> {
    match state.storage.retrieve_cat_by_id(&id).await? {
        Some(cat) => Ok((StatusCode::OK, Json(cat))),
        None => Err(ApiError::CatNotFound),
    }
}
