use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A directed follow edge: `follower_id` follows `following_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Follow {
    pub follower_id: Uuid,
    pub following_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Edge counts for a single user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FollowCounts {
    /// Users following this user
    pub followers: u64,

    /// Users this user follows
    pub following: u64,
}
