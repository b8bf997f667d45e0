//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3 document for the eco-stream API, served with
//! Swagger UI at `/docs`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::db::{Item, UpdateItem, UpdateUser, UserResponse};
use crate::handlers::{
    CreateItemRequest, CreateUserRequest, FileUploadResponse, LoginRequest, LoginResponse,
    ReadyResponse, UpdatedItemResponse,
};

/// Registers the two bearer credential kinds.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "session_token",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Session token issued by POST /login/, valid 15 minutes"))
                    .build(),
            ),
        );
        components.add_security_scheme(
            "static_token",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .description(Some("Shared static token (TOKEN)"))
                    .build(),
            ),
        );
    }
}

/// eco-stream API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "eco-stream API",
        version = "0.1.0",
        description = r#"
CRUD endpoints for **users** and **items**, backed by PostgreSQL or Redis, plus
file upload and download backed by an S3-compatible object store.

### Authentication

- `POST /login/` exchanges a username and password for a session token
- Item routes require `Authorization: Bearer <session token>`
- Mutating user routes require the credential selected by `USERS_AUTH`
  (none, the static `TOKEN`, or a session token)
"#,
        license(
            name = "MIT OR Apache-2.0",
            url = "https://github.com/danmcfan/eco-stream/blob/main/LICENSE"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    tags(
        (name = "Auth", description = "Session token issue and check"),
        (name = "Users", description = "User records"),
        (name = "Items", description = "Items owned by the authenticated user"),
        (name = "Files", description = "File upload and download"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::auth::login_handler,
        crate::handlers::auth::authenticate_handler,
        crate::handlers::users::list_users_handler,
        crate::handlers::users::get_user_handler,
        crate::handlers::users::create_user_handler,
        crate::handlers::users::update_user_handler,
        crate::handlers::users::delete_user_handler,
        crate::handlers::items::list_items_handler,
        crate::handlers::items::get_item_handler,
        crate::handlers::items::create_item_handler,
        crate::handlers::items::update_item_handler,
        crate::handlers::items::delete_item_handler,
        crate::handlers::files::upload_file_handler,
        crate::handlers::files::download_file_handler,
    ),
    components(
        schemas(
            ReadyResponse,
            LoginRequest,
            LoginResponse,
            CreateUserRequest,
            UpdateUser,
            UserResponse,
            CreateItemRequest,
            UpdateItem,
            UpdatedItemResponse,
            Item,
            FileUploadResponse,
        )
    )
)]
pub struct ApiDoc;
