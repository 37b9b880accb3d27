//! HTTP request handlers for the follow directory API.
//!
//! # Endpoints
//!
//! - `GET /health` - Liveness check
//! - `GET /health/ready` - Database and storage readiness
//! - `POST /users`, `GET /users` - Create and list users
//! - `GET|PATCH|PUT|DELETE /users/{id}` - Single user
//! - `POST /users/{id}/profile-image` - Upload a profile image
//! - `POST /users/{id}/following` - Follow another user
//! - `GET|DELETE /users/{id}/following/{target_id}` - A single follow edge
//! - `GET /users/{id}/followers`, `GET /users/{id}/following` - Edge listings
//! - `GET /follows` - Every follow edge

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::directory::{DirectoryService, ProfileImage, Readiness, UserProfile};
use crate::error::{ServiceError, StorageError, StoreError};
use crate::model::{Follow, Page, Pagination};
use crate::storage::ObjectStore;
use crate::store::Directory;

use super::extract::{parse_id, ValidatedJson};
use super::requests::{
    CreateUserRequest, FollowRequest, ListUsersParams, PageParams, UpdateUserRequest,
};

/// Multipart field carrying the profile image.
pub const UPLOAD_FIELD: &str = "file";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the directory service.
pub struct AppState<D: Directory, O: ObjectStore> {
    pub service: Arc<DirectoryService<D, O>>,
}

impl<D: Directory, O: ObjectStore> AppState<D, O> {
    pub fn new(service: DirectoryService<D, O>) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

impl<D: Directory, O: ObjectStore> Clone for AppState<D, O> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "validation_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Offending field, for validation errors and conflicts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
            field: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            status: Some(status.as_u16()),
            ..Self::new(error, message)
        }
    }

    /// Attach the name of the field the error is about.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// Readiness response listing each dependency.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    #[serde(flatten)]
    pub checks: Readiness,
}

/// Envelope for every paginated listing.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> From<Page<T>> for ListResponse<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            pagination: page.pagination(),
            data: page.items,
        }
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert ServiceError to HTTP response.
///
/// Logged by severity:
/// - 5xx at ERROR
/// - 404 at DEBUG
/// - other 4xx at WARN
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let mut field: Option<String> = None;

        let (status, error_type, message) = match &self {
            // 404 Not Found
            ServiceError::UserNotFound(_) => {
                (StatusCode::NOT_FOUND, "not_found", self.to_string())
            }
            ServiceError::NotFollowing { .. } => {
                (StatusCode::NOT_FOUND, "not_following", self.to_string())
            }

            // 400 Bad Request
            ServiceError::InvalidId(raw) => (
                StatusCode::BAD_REQUEST,
                "invalid_id",
                format!("Invalid user id: '{}' is not a UUID", raw),
            ),
            ServiceError::Validation { field: f, .. } => {
                field = Some(f.clone());
                (StatusCode::BAD_REQUEST, "validation_error", self.to_string())
            }
            ServiceError::EmptyUpdate => {
                (StatusCode::BAD_REQUEST, "empty_update", self.to_string())
            }
            ServiceError::SelfFollow => (StatusCode::BAD_REQUEST, "self_follow", self.to_string()),
            ServiceError::MissingFile(_) => {
                (StatusCode::BAD_REQUEST, "missing_file", self.to_string())
            }
            ServiceError::EmptyFile => (StatusCode::BAD_REQUEST, "empty_file", self.to_string()),
            ServiceError::MalformedUpload(_) => {
                (StatusCode::BAD_REQUEST, "invalid_upload", self.to_string())
            }
            ServiceError::InvalidJson(_) => {
                (StatusCode::BAD_REQUEST, "invalid_json", self.to_string())
            }
            ServiceError::InvalidQuery(_) => {
                (StatusCode::BAD_REQUEST, "invalid_query", self.to_string())
            }

            // 409 Conflict
            ServiceError::AlreadyFollowing { .. } => {
                (StatusCode::CONFLICT, "already_following", self.to_string())
            }
            ServiceError::Conflict { field: f } => {
                field = Some(f.to_string());
                (StatusCode::CONFLICT, "conflict", self.to_string())
            }

            // 413 / 415
            ServiceError::PayloadTooLarge { .. } | ServiceError::UploadLimitExceeded { .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                self.to_string(),
            ),
            ServiceError::UnsupportedImage { .. } => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_media_type",
                self.to_string(),
            ),
            ServiceError::InvalidContentType => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "invalid_content_type",
                self.to_string(),
            ),

            // Persistence
            ServiceError::Store(StoreError::Conflict { field: f }) => {
                field = Some(f.to_string());
                (
                    StatusCode::CONFLICT,
                    "conflict",
                    format!("{} is already taken", f),
                )
            }
            ServiceError::Store(StoreError::DuplicateFollow { .. }) => {
                (StatusCode::CONFLICT, "already_following", self.to_string())
            }
            ServiceError::Store(StoreError::MissingReference) => (
                StatusCode::NOT_FOUND,
                "not_found",
                "Referenced user does not exist".to_string(),
            ),
            ServiceError::Store(StoreError::Connection(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "database_unavailable",
                "Database is unavailable".to_string(),
            ),
            ServiceError::Store(StoreError::Database(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                "Internal database error".to_string(),
            ),

            // Object storage
            ServiceError::Storage(StorageError::Connection(_)) => (
                StatusCode::BAD_GATEWAY,
                "storage_unavailable",
                "Object storage is unavailable".to_string(),
            ),
            ServiceError::Storage(_) => (
                StatusCode::BAD_GATEWAY,
                "storage_error",
                "Object storage rejected the request".to_string(),
            ),
        };

        if status.is_server_error() {
            // Internal details are logged, never returned
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                self
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let mut body = ErrorResponse::with_status(error_type, message, status);
        if let Some(field) = field {
            body = body.with_field(field);
        }
        (status, Json(body)).into_response()
    }
}

fn query_error(rejection: QueryRejection) -> ServiceError {
    ServiceError::InvalidQuery(rejection.body_text())
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> ServiceError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::UploadLimitExceeded { max: max_bytes }
    } else {
        ServiceError::MalformedUpload(err.body_text())
    }
}

// =============================================================================
// Health
// =============================================================================

/// Handle liveness checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle readiness checks.
///
/// # Endpoint
///
/// `GET /health/ready`
///
/// `200 OK` when both the database and object storage answer, otherwise
/// `503 Service Unavailable`. The body reports each dependency either way.
pub async fn readiness_handler<D, O>(State(state): State<AppState<D, O>>) -> Response
where
    D: Directory + 'static,
    O: ObjectStore + 'static,
{
    let checks = state.service.readiness().await;
    let (status, label) = if checks.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        warn!(?checks, "Readiness check failed");
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    (
        status,
        Json(ReadinessResponse {
            status: label.to_string(),
            checks,
        }),
    )
        .into_response()
}

// =============================================================================
// Users
// =============================================================================

/// `POST /users` - create a user, `201 Created` with the profile.
pub async fn create_user_handler<D, O>(
    State(state): State<AppState<D, O>>,
    ValidatedJson(body): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ServiceError>
where
    D: Directory + 'static,
    O: ObjectStore + 'static,
{
    let profile = state.service.create_user(body.into_new_user()).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Handle user listings.
///
/// # Endpoint
///
/// `GET /users`
///
/// # Query Parameters
///
/// - `page`: 1-based page number (default: 1)
/// - `limit`: Page size (default: 20, clamped to 1..=100)
/// - `search`: Case-insensitive substring of username, full name or email
/// - `sort`: `created_at` (default), `username` or `full_name`
/// - `order`: `desc` (default) or `asc`
pub async fn list_users_handler<D, O>(
    State(state): State<AppState<D, O>>,
    params: Result<Query<ListUsersParams>, QueryRejection>,
) -> Result<Json<ListResponse<UserProfile>>, ServiceError>
where
    D: Directory + 'static,
    O: ObjectStore + 'static,
{
    let Query(params) = params.map_err(query_error)?;
    let page = state.service.list_users(&params.into_query()).await?;
    Ok(Json(page.into()))
}

/// `GET /users/{id}`
pub async fn get_user_handler<D, O>(
    State(state): State<AppState<D, O>>,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>, ServiceError>
where
    D: Directory + 'static,
    O: ObjectStore + 'static,
{
    let id = parse_id(&id)?;
    Ok(Json(state.service.get_user(id).await?))
}

/// `PATCH /users/{id}` (also served on `PUT`) - partial update.
pub async fn update_user_handler<D, O>(
    State(state): State<AppState<D, O>>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<UserProfile>, ServiceError>
where
    D: Directory + 'static,
    O: ObjectStore + 'static,
{
    let id = parse_id(&id)?;
    Ok(Json(state.service.update_user(id, body.into_changes()).await?))
}

/// `DELETE /users/{id}` - `204 No Content`, removes the user's follow edges.
pub async fn delete_user_handler<D, O>(
    State(state): State<AppState<D, O>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError>
where
    D: Directory + 'static,
    O: ObjectStore + 'static,
{
    let id = parse_id(&id)?;
    state.service.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handle profile image uploads.
///
/// # Endpoint
///
/// `POST /users/{id}/profile-image` with a `multipart/form-data` body whose
/// `file` field holds a JPEG, PNG, GIF or WebP image.
///
/// # Response
///
/// `200 OK` with the new public URL, the storage key, the detected content
/// type and the stored size.
pub async fn upload_profile_image_handler<D, O>(
    State(state): State<AppState<D, O>>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProfileImage>, ServiceError>
where
    D: Directory + 'static,
    O: ObjectStore + 'static,
{
    let user_id = parse_id(&id)?;
    let max_bytes = state.service.max_upload_bytes();
    let mut multipart =
        multipart.map_err(|rejection| ServiceError::MalformedUpload(rejection.body_text()))?;

    let mut data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            data = Some(field.bytes().await.map_err(|e| multipart_error(e, max_bytes))?);
            break;
        }
    }

    let data = data.ok_or(ServiceError::MissingFile(UPLOAD_FIELD))?;
    let image = state.service.upload_profile_image(user_id, data).await?;
    Ok(Json(image))
}

// =============================================================================
// Follows
// =============================================================================

/// `POST /users/{id}/following` - `201 Created` with the new edge.
pub async fn follow_handler<D, O>(
    State(state): State<AppState<D, O>>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<FollowRequest>,
) -> Result<(StatusCode, Json<Follow>), ServiceError>
where
    D: Directory + 'static,
    O: ObjectStore + 'static,
{
    let follower_id = parse_id(&id)?;
    let follow = state.service.follow(follower_id, body.target_id).await?;
    Ok((StatusCode::CREATED, Json(follow)))
}

/// `GET /users/{id}/following/{target_id}` - the edge, or 404.
pub async fn get_follow_handler<D, O>(
    State(state): State<AppState<D, O>>,
    Path((id, target_id)): Path<(String, String)>,
) -> Result<Json<Follow>, ServiceError>
where
    D: Directory + 'static,
    O: ObjectStore + 'static,
{
    let follower_id = parse_id(&id)?;
    let following_id = parse_id(&target_id)?;
    Ok(Json(
        state.service.get_follow(follower_id, following_id).await?,
    ))
}

/// `DELETE /users/{id}/following/{target_id}` - `204 No Content`.
pub async fn unfollow_handler<D, O>(
    State(state): State<AppState<D, O>>,
    Path((id, target_id)): Path<(String, String)>,
) -> Result<StatusCode, ServiceError>
where
    D: Directory + 'static,
    O: ObjectStore + 'static,
{
    let follower_id = parse_id(&id)?;
    let following_id = parse_id(&target_id)?;
    state.service.unfollow(follower_id, following_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /users/{id}/followers` - users following `id`, newest edge first.
pub async fn followers_handler<D, O>(
    State(state): State<AppState<D, O>>,
    Path(id): Path<String>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<ListResponse<UserProfile>>, ServiceError>
where
    D: Directory + 'static,
    O: ObjectStore + 'static,
{
    let id = parse_id(&id)?;
    let Query(params) = params.map_err(query_error)?;
    let page = state.service.followers(id, params.into_request()).await?;
    Ok(Json(page.into()))
}

/// `GET /users/{id}/following` - users `id` follows, newest edge first.
pub async fn following_handler<D, O>(
    State(state): State<AppState<D, O>>,
    Path(id): Path<String>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<ListResponse<UserProfile>>, ServiceError>
where
    D: Directory + 'static,
    O: ObjectStore + 'static,
{
    let id = parse_id(&id)?;
    let Query(params) = params.map_err(query_error)?;
    let page = state.service.following(id, params.into_request()).await?;
    Ok(Json(page.into()))
}

/// `GET /follows` - every edge, newest first.
pub async fn list_follows_handler<D, O>(
    State(state): State<AppState<D, O>>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<ListResponse<Follow>>, ServiceError>
where
    D: Directory + 'static,
    O: ObjectStore + 'static,
{
    let Query(params) = params.map_err(query_error)?;
    let page = state.service.list_follows(params.into_request()).await?;
    Ok(Json(page.into()))
}

// =============================================================================
// Tests
// =============================================================================
