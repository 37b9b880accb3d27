//! Response shaping for user records.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::model::{FollowCounts, User};

/// A user as returned by the API: the stored record plus computed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub date_of_birth: Option<NaiveDate>,
    /// Whole years since `date_of_birth`, `None` if unknown
    pub age: Option<u32>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
    pub followers_count: u64,
    pub following_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user: User, counts: FollowCounts, today: NaiveDate) -> Self {
        Self {
            age: user.date_of_birth.and_then(|dob| age_on(dob, today)),
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            date_of_birth: user.date_of_birth,
            bio: user.bio,
            profile_image_url: user.profile_image_url,
            followers_count: counts.followers,
            following_count: counts.following,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Age in whole years on `today` for someone born on `birth`.
///
/// Returns `None` if `birth` is after `today`. A 29 February birthday is
/// reached on 1 March in non-leap years.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    if birth > today {
        return None;
    }

    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

/// Today's date in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
