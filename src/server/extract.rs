//! Request extractors that reject with the API's JSON error shape.

use axum::extract::{rejection::JsonRejection, FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::error::ServiceError;

/// JSON body extractor that also runs the payload's [`Validate`] rules.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err| match err {
                JsonRejection::MissingJsonContentType(_) => ServiceError::InvalidContentType,
                other => ServiceError::InvalidJson(other.body_text()),
            })?;

        payload.validate().map_err(first_validation_error)?;

        Ok(Self(payload))
    }
}

/// Reduce a set of validation failures to the first one, by field name.
///
/// Sorting keeps the reported field stable when several fields are invalid.
pub(crate) fn first_validation_error(errors: ValidationErrors) -> ServiceError {
    let mut fields: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, field_errors)| {
            let error = field_errors.first()?;
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| error.code.to_string());
            Some((field.to_string(), message))
        })
        .collect();
    fields.sort();

    match fields.into_iter().next() {
        Some((field, message)) => ServiceError::Validation { field, message },
        None => ServiceError::Validation {
            field: "body".to_string(),
            message: "invalid request body".to_string(),
        },
    }
}

/// Parse a user id taken from the request path.
pub fn parse_id(raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw).map_err(|_| ServiceError::InvalidId(raw.to_string()))
}
