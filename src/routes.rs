// Route path constants - single source of truth for all API paths

pub const HEALTH: &str = "/health";
pub const CATS: &str = "/cats";
pub const CAT_ITEM: &str = "/cat/{id}";
pub const DOCS: &str = "/docs";
pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";
