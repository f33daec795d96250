use crate::error::{ApiError, ErrorResponse};
use crate::routes;
use crate::state::AppState;
use axum::{extract::Path, extract::State, http::StatusCode};

/// DELETE /cat/:id handler - Delete a cat
///
/// Deleting an id that is well formed but unused succeeds.
#[utoipa::path(
    delete,
    path = routes::CAT_ITEM,
    params(
        ("id" = String, Path, description = "Opaque cat id as returned by the list endpoint")
    ),
    responses(
        (status = 200, description = "Cat deleted (or already absent)"),
        (status = 400, description = "Invalid Cat ID", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "cats"
)]
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.storage.delete_cat(&id).await?;
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::CatKey;
    use axum::{body::Body, http::Request, routing::delete, Router};
    use tower::ServiceExt;

    async fn delete_cat(uri: String) -> (StatusCode, axum::body::Bytes) {
        let app = Router::new()
            .route(routes::CAT_ITEM, delete(delete_handler))
            .with_state(AppState::in_memory());

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn test_delete_endpoint_unknown_id() {
        let (status, body) = delete_cat(format!("/cat/{}", CatKey::generate().to_urlsafe())).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_delete_endpoint_invalid_id() {
        let (status, body) = delete_cat("/cat/not-a-real-key".to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error_response: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error_response.detail, "Invalid Cat ID");
    }
}
