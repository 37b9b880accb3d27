//! HTTP server layer for the follow directory.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │        /users, /users/{id}/following, /follows, /health         │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    auth     │  │        routes           │  │
//! │  │ (requests)  │  │ (bearer)    │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! │  ┌─────────────┐  ┌─────────────┐                               │
//! │  │  requests   │  │   extract   │                               │
//! │  │ (bodies)    │  │ (validated) │                               │
//! │  └─────────────┘  └─────────────┘                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod extract;
pub mod handlers;
pub mod requests;
pub mod routes;

pub use auth::{auth_middleware, AdminAuth, AuthError};
pub use extract::{parse_id, ValidatedJson};
pub use handlers::{
    AppState, ErrorResponse, HealthResponse, ListResponse, ReadinessResponse, UPLOAD_FIELD,
};
pub use requests::{
    CreateUserRequest, FollowRequest, ListUsersParams, PageParams, UpdateUserRequest,
};
pub use routes::{create_router, RouterConfig};
