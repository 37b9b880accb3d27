use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::page::PageRequest;

/// A stored user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub date_of_birth: Option<NaiveDate>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a user about to be inserted.
///
/// The store assigns the id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub date_of_birth: Option<NaiveDate>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
}

/// A partial update.
///
/// `None` leaves a column untouched. For nullable columns `Some(None)`
/// clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<Option<NaiveDate>>,
    pub bio: Option<Option<String>>,
    pub profile_image_url: Option<Option<String>>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.full_name.is_none()
            && self.email.is_none()
            && self.date_of_birth.is_none()
            && self.bio.is_none()
            && self.profile_image_url.is_none()
    }

    /// Apply the changes to an in-memory record, bumping `updated_at`.
    pub fn apply_to(self, user: &mut User, now: DateTime<Utc>) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(full_name) = self.full_name {
            user.full_name = full_name;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(date_of_birth) = self.date_of_birth {
            user.date_of_birth = date_of_birth;
        }
        if let Some(bio) = self.bio {
            user.bio = bio;
        }
        if let Some(url) = self.profile_image_url {
            user.profile_image_url = url;
        }
        user.updated_at = now;
    }
}

/// Column a user listing is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    Username,
    FullName,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Username => "username",
            SortField::FullName => "full_name",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Options for listing users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    /// Case-insensitive substring matched against username, full name and email
    pub search: Option<String>,
    pub sort: SortField,
    pub order: SortOrder,
    pub page: PageRequest,
}

impl UserQuery {
    /// The search term with surrounding whitespace removed, if any remains.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}
