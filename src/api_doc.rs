use utoipa::OpenApi;

use crate::error::{ErrorResponse, HealthResponse, UnhealthyResponse};
use crate::handlers;
use crate::models::{Cat, ListResponse, Meta, Species};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "cats-api",
        version = "1.0.0",
        description = "Store, list, fetch and delete cats"
    ),
    paths(
        handlers::health::health_handler,
        handlers::store::store_handler,
        handlers::list::list_handler,
        handlers::get::get_handler,
        handlers::delete::delete_handler
    ),
    components(
        schemas(
            Cat,
            Species,
            ListResponse,
            Meta,
            ErrorResponse,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "cats", description = "Cat operations")
    )
)]
pub struct ApiDoc;
