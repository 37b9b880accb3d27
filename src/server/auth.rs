//! Admin bearer-token authentication.
//!
//! Every directory endpoint is an administrative operation and requires the
//! shared admin token:
//!
//! ```text
//! Authorization: Bearer <admin-token>
//! ```
//!
//! The configured token is hashed once at startup. Incoming tokens are hashed
//! the same way and compared in constant time, so neither the token's length
//! nor the position of the first mismatch leaks through timing.
//!
//! # Example
//!
//! ```rust
//! use follow_directory::server::auth::AdminAuth;
//!
//! let auth = AdminAuth::new("an-admin-token-of-some-length");
//! assert!(auth.verify_token("an-admin-token-of-some-length").is_ok());
//! assert!(auth.verify_token("guess").is_err());
//! ```

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::handlers::ErrorResponse;

// =============================================================================
// Authentication Errors
// =============================================================================

/// Errors that can occur while authenticating a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header was sent
    #[error("Missing Authorization header")]
    MissingToken,

    /// The header was not of the form `Bearer <token>`
    #[error("Authorization header must use the Bearer scheme")]
    InvalidScheme,

    /// The token did not match the admin token
    #[error("Invalid admin token")]
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let error_type = match &self {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidScheme => "invalid_scheme",
            AuthError::InvalidToken => "invalid_token",
        };
        let status = StatusCode::UNAUTHORIZED;
        let message = self.to_string();

        // A wrong token may be someone probing; a missing one is usually a
        // misconfigured client
        match &self {
            AuthError::InvalidToken => {
                warn!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    message
                );
            }
            _ => {
                debug!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    message
                );
            }
        }

        let body = ErrorResponse::with_status(error_type, message, status);
        (
            status,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            Json(body),
        )
            .into_response()
    }
}

// =============================================================================
// Admin Token
// =============================================================================

/// Verifier for the shared admin token.
#[derive(Clone)]
pub struct AdminAuth {
    digest: [u8; 32],
}

impl AdminAuth {
    /// Create a verifier for the given token.
    pub fn new(token: impl AsRef<[u8]>) -> Self {
        Self {
            digest: Sha256::digest(token.as_ref()).into(),
        }
    }

    /// Check a bare token against the admin token.
    pub fn verify_token(&self, candidate: &str) -> Result<(), AuthError> {
        let candidate: [u8; 32] = Sha256::digest(candidate.as_bytes()).into();
        if bool::from(self.digest.ct_eq(&candidate)) {
            Ok(())
        } else {
            Err(AuthError::InvalidToken)
        }
    }

    /// Check the `Authorization` header of a request.
    pub fn verify_headers(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?;
        let value = value.to_str().map_err(|_| AuthError::InvalidScheme)?;
        let token = bearer_token(value).ok_or(AuthError::InvalidScheme)?;
        self.verify_token(token)
    }
}

impl std::fmt::Debug for AdminAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAuth").finish_non_exhaustive()
    }
}

/// Extract the token from a `Bearer <token>` header value.
///
/// The scheme name is case-insensitive. Returns `None` for other schemes and
/// for an empty token.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Axum middleware rejecting requests without a valid admin token.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware};
/// use follow_directory::server::auth::{AdminAuth, auth_middleware};
///
/// let auth = AdminAuth::new("an-admin-token-of-some-length");
/// let app = Router::new()
///     .route("/users", get(list_users_handler))
///     .layer(middleware::from_fn_with_state(auth, auth_middleware));
/// ```
pub async fn auth_middleware(
    State(auth): State<AdminAuth>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    auth.verify_headers(request.headers())?;
    Ok(next.run(request).await)
}

// =============================================================================
// Tests
// =============================================================================
