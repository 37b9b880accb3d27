//! Router configuration for the follow directory.
//!
//! This module defines the HTTP routes and applies middleware for
//! authentication, body limits and CORS.
//!
//! # Route Structure
//!
//! ```text
//! /health                                - Liveness (public)
//! /health/ready                          - Readiness (public)
//! /users                                 - Create / list (protected)
//! /users/{id}                            - Get / update / delete (protected)
//! /users/{id}/profile-image              - Image upload (protected)
//! /users/{id}/followers                  - Followers (protected)
//! /users/{id}/following                  - Follow / following (protected)
//! /users/{id}/following/{target_id}      - Get / remove edge (protected)
//! /follows                               - All edges (protected)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use follow_directory::directory::DirectoryService;
//! use follow_directory::server::routes::{create_router, RouterConfig};
//!
//! let service = DirectoryService::new(directory, object_store);
//! let config = RouterConfig::new("an-admin-token-of-some-length")
//!     .with_cors_origins(vec!["https://admin.example.com".to_string()]);
//!
//! let router = create_router(service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::{auth_middleware, AdminAuth};
use super::handlers::{
    create_user_handler, delete_user_handler, follow_handler, followers_handler,
    following_handler, get_follow_handler, get_user_handler, health_handler,
    list_follows_handler, list_users_handler, readiness_handler, unfollow_handler,
    update_user_handler, upload_profile_image_handler, AppState,
};
use crate::directory::DirectoryService;
use crate::storage::ObjectStore;
use crate::store::Directory;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Shared admin bearer token
    pub admin_token: String,

    /// Whether the directory routes require the admin token
    pub auth_enabled: bool,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration with the given admin token.
    ///
    /// By default:
    /// - Authentication is enabled
    /// - CORS allows any origin
    /// - Tracing is enabled
    pub fn new(admin_token: impl Into<String>) -> Self {
        Self {
            admin_token: admin_token.into(),
            auth_enabled: true,
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Create a configuration with authentication disabled.
    ///
    /// **Warning**: This should only be used for development/testing.
    pub fn without_auth() -> Self {
        Self {
            auth_enabled: false,
            ..Self::new(String::new())
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl std::fmt::Debug for RouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterConfig")
            .field("auth_enabled", &self.auth_enabled)
            .field("cors_origins", &self.cors_origins)
            .field("enable_tracing", &self.enable_tracing)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// Health routes are always public. Every other route sits behind the admin
/// token middleware when `config.auth_enabled` is set.
pub fn create_router<D, O>(service: DirectoryService<D, O>, config: RouterConfig) -> Router
where
    D: Directory + 'static,
    O: ObjectStore + 'static,
{
    let upload_limit = service.max_upload_bytes() + MULTIPART_OVERHEAD_BYTES;
    let app_state = AppState::new(service);
    let cors = build_cors_layer(&config);

    let mut directory_routes = directory_routes(app_state.clone(), upload_limit);
    if config.auth_enabled {
        let auth = AdminAuth::new(&config.admin_token);
        directory_routes =
            directory_routes.layer(middleware::from_fn_with_state(auth, auth_middleware));
    }

    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/health/ready", get(readiness_handler::<D, O>))
        .with_state(app_state);

    let router = Router::new()
        .merge(directory_routes)
        .merge(public_routes)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Routes for users, follows and uploads.
fn directory_routes<D, O>(app_state: AppState<D, O>, upload_limit: usize) -> Router
where
    D: Directory + 'static,
    O: ObjectStore + 'static,
{
    Router::new()
        .route(
            "/users",
            get(list_users_handler::<D, O>).post(create_user_handler::<D, O>),
        )
        .route(
            "/users/{id}",
            get(get_user_handler::<D, O>)
                .patch(update_user_handler::<D, O>)
                .put(update_user_handler::<D, O>)
                .delete(delete_user_handler::<D, O>),
        )
        .route(
            "/users/{id}/profile-image",
            post(upload_profile_image_handler::<D, O>)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/users/{id}/followers", get(followers_handler::<D, O>))
        .route(
            "/users/{id}/following",
            get(following_handler::<D, O>).post(follow_handler::<D, O>),
        )
        .route(
            "/users/{id}/following/{target_id}",
            get(get_follow_handler::<D, O>).delete(unfollow_handler::<D, O>),
        )
        .route("/follows", get(list_follows_handler::<D, O>))
        .with_state(app_state)
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        // No origins allowed - this effectively disables CORS
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
