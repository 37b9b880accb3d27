//! Request bodies and query strings accepted by the API.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidateUrl, ValidationError};

use crate::directory::today;
use crate::model::{NewUser, PageRequest, SortField, SortOrder, UserChanges, UserQuery};

static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.]{3,30}$").expect("Invalid regex"));

/// Earliest accepted date of birth.
const MIN_BIRTH_DATE: (i32, u32, u32) = (1900, 1, 1);

/// Longest accepted full name, in characters.
pub const MAX_FULL_NAME_CHARS: usize = 100;

// =============================================================================
// Validators
// =============================================================================

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_REGEX.is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::new("username")
            .with_message("must be 3-30 letters, digits, '_' or '.'".into()))
    }
}

fn validate_full_name(full_name: &str) -> Result<(), ValidationError> {
    let chars = full_name.trim().chars().count();
    if (1..=MAX_FULL_NAME_CHARS).contains(&chars) {
        Ok(())
    } else {
        Err(ValidationError::new("length").with_message("must be 1-100 characters".into()))
    }
}

fn validate_birth_date(date: &NaiveDate) -> Result<(), ValidationError> {
    let (y, m, d) = MIN_BIRTH_DATE;
    let earliest = NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN);
    if *date < earliest {
        return Err(ValidationError::new("date_of_birth")
            .with_message("must not be before 1900-01-01".into()));
    }
    if *date > today() {
        return Err(
            ValidationError::new("date_of_birth").with_message("must not be in the future".into())
        );
    }
    Ok(())
}

/// E-mail addresses are trimmed before storage, so surrounding whitespace is
/// not an error.
fn validate_email_address(email: &str) -> Result<(), ValidationError> {
    if email.trim().validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email").with_message("must be a valid email address".into()))
    }
}

/// A blank image URL clears the field, anything else must parse.
fn validate_image_url(url: &str) -> Result<(), ValidationError> {
    let url = url.trim();
    if url.is_empty() || url.validate_url() {
        Ok(())
    } else {
        Err(ValidationError::new("url").with_message("must be a valid URL".into()))
    }
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trim, and turn blank strings into `None`.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Users
// =============================================================================

/// Body of `POST /users`.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: String,

    #[validate(custom(function = "validate_full_name"))]
    pub full_name: String,

    #[validate(custom(function = "validate_email_address"))]
    pub email: String,

    #[validate(custom(function = "validate_birth_date"))]
    pub date_of_birth: Option<NaiveDate>,

    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub bio: Option<String>,

    #[validate(custom(function = "validate_image_url"))]
    pub profile_image_url: Option<String>,
}

impl CreateUserRequest {
    pub fn into_new_user(self) -> NewUser {
        NewUser {
            username: self.username,
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            date_of_birth: self.date_of_birth,
            bio: non_blank(self.bio),
            profile_image_url: non_blank(self.profile_image_url),
        }
    }
}

/// Body of `PATCH /users/{id}`.
///
/// Omitted fields are left unchanged. `null` clears a nullable field.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: Option<String>,

    #[validate(custom(function = "validate_full_name"))]
    pub full_name: Option<String>,

    #[validate(custom(function = "validate_email_address"))]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(custom(function = "validate_birth_date"))]
    pub date_of_birth: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub bio: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(custom(function = "validate_image_url"))]
    pub profile_image_url: Option<Option<String>>,
}

impl UpdateUserRequest {
    pub fn into_changes(self) -> UserChanges {
        UserChanges {
            username: self.username,
            full_name: self.full_name.map(|n| n.trim().to_string()),
            email: self.email.map(|e| e.trim().to_lowercase()),
            date_of_birth: self.date_of_birth,
            bio: self.bio.map(non_blank),
            profile_image_url: self.profile_image_url.map(non_blank),
        }
    }
}

/// Query string of `GET /users`.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: SortField,
    #[serde(default)]
    pub order: SortOrder,
}

impl ListUsersParams {
    pub fn into_query(self) -> UserQuery {
        UserQuery {
            search: self.search,
            sort: self.sort,
            order: self.order,
            page: PageRequest::new(self.page, self.limit),
        }
    }
}

// =============================================================================
// Follows
// =============================================================================

/// Body of `POST /users/{id}/following`.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct FollowRequest {
    pub target_id: Uuid,
}

/// Query string of paginated follow listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageParams {
    pub fn into_request(self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}
