use crate::error::{ApiError, ErrorResponse};
use crate::models::{ListQuery, ListResponse, Meta, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::routes;
use crate::state::AppState;
use std::num::NonZeroUsize;
use axum::{extract::rejection::QueryRejection, extract::Query, extract::State, http::StatusCode, Json};

/// GET /cats handler - List cats one page at a time
///
/// Query parameters:
/// - limit: Maximum number of cats to return (optional, default: 5, capped at 1000)
/// - cursor: Opaque token from a previous response's `meta.cursor` (optional)
#[utoipa::path(
    get,
    path = routes::CATS,
    params(
        ("limit" = Option<u32>, Query, description = "Maximum number of cats to return"),
        ("cursor" = Option<String>, Query, description = "Cursor from a previous page")
    ),
    responses(
        (status = 200, description = "One page of cats", body = ListResponse),
        (status = 400, description = "Invalid cursor", body = ErrorResponse),
        (status = 422, description = "Invalid query parameter", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "cats"
)]
pub async fn list_handler(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<(StatusCode, Json<ListResponse>), ApiError> {
    let Query(query) = query?;

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let limit = NonZeroUsize::new(limit as usize)
        .ok_or_else(|| ApiError::Validation("limit must be greater than zero".to_string()))?;

    let (data, cursor) = state
        .storage
        .retrieve_cats(limit, query.cursor.as_deref())
        .await?;

    tracing::info!("Listed {} cats (limit: {}, more: {})", data.len(), limit, !cursor.is_empty());

    Ok((
        StatusCode::OK,
        Json(ListResponse {
            data,
            meta: Meta { cursor },
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::store_handler;
    use axum::{body::Body, http::Request, routing::get, Router};
    use std::collections::HashSet;
    use tower::ServiceExt;

    async fn setup_test_app(count: usize) -> Router {
        let app = Router::new()
            .route(routes::CATS, get(list_handler).post(store_handler))
            .with_state(AppState::in_memory());

        if count > 0 {
            let cats: Vec<serde_json::Value> = (0..count)
                .map(|i| {
                    serde_json::json!({
                        "name": format!("cat-{}", i),
                        "date_of_birth": "2021-05-05",
                        "weight": 3.0 + i as f64,
                    })
                })
                .collect();

            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/cats")
                        .header("content-type", "application/json")
                        .body(Body::from(serde_json::to_string(&cats).unwrap()))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        app
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
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
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_list_endpoint_empty() {
        let app = setup_test_app(0).await;

        let (status, body) = get_json(app, "/cats").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"data": [], "meta": {"cursor": ""}}));
    }

    #[tokio::test]
    async fn test_list_endpoint_default_limit() {
        let app = setup_test_app(8).await;

        let (status, body) = get_json(app, "/cats").await;

        assert_eq!(status, StatusCode::OK);
        let listing: ListResponse = serde_json::from_value(body).unwrap();
        assert_eq!(listing.data.len(), DEFAULT_PAGE_SIZE as usize);
        assert!(!listing.meta.cursor.is_empty());
    }

    #[tokio::test]
    async fn test_list_endpoint_cursor_chain() {
        let app = setup_test_app(7).await;

        let mut seen = HashSet::new();
        let mut uri = "/cats?limit=2".to_string();
        loop {
            let (status, body) = get_json(app.clone(), &uri).await;
            assert_eq!(status, StatusCode::OK);

            let listing: ListResponse = serde_json::from_value(body).unwrap();
            assert!(listing.data.len() <= 2);
            for cat in listing.data {
                assert!(seen.insert(cat.id), "duplicate entry");
            }

            if listing.meta.cursor.is_empty() {
                break;
            }
            uri = format!("/cats?limit=2&cursor={}", listing.meta.cursor);
        }

        assert_eq!(seen.len(), 7);
    }

    #[tokio::test]
    async fn test_list_endpoint_invalid_cursor() {
        let app = setup_test_app(1).await;

        let (status, body) = get_json(app, "/cats?cursor=not-a-cursor").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"detail": "Invalid cursor"}));
    }

    #[tokio::test]
    async fn test_list_endpoint_invalid_limit() {
        let app = setup_test_app(0).await;

        let (status, _) = get_json(app.clone(), "/cats?limit=0").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = get_json(app.clone(), "/cats?limit=-1").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = get_json(app, "/cats?limit=abc").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
