//! Persistence layer.
//!
//! All user and follow data lives in a managed Postgres database. The rest of
//! the crate talks to it through the [`Directory`] trait so that handlers and
//! the service layer can be exercised against any backend.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            DirectoryService             │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            Directory Trait              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │          PostgresDirectory              │
//! │   (sqlx pool, users + follows tables)   │
//! └─────────────────────────────────────────┘
//! ```

mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{Follow, FollowCounts, NewUser, Page, PageRequest, User, UserChanges, UserQuery};

pub use postgres::{connect_pool, escape_like, PostgresDirectory, DEFAULT_MAX_CONNECTIONS};

/// Storage backend for users and follow edges.
///
/// Implementations must be thread-safe; a single instance is shared by every
/// request handler.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Insert a new user, assigning its id and timestamps.
    ///
    /// Fails with [`StoreError::Conflict`] when the username or email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Apply a partial update. Returns `None` when the user does not exist.
    async fn update_user(&self, id: Uuid, changes: UserChanges)
        -> Result<Option<User>, StoreError>;

    /// Delete a user and every edge touching it. Returns `false` when the
    /// user did not exist.
    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn list_users(&self, query: &UserQuery) -> Result<Page<User>, StoreError>;

    /// Follower/following counts for each of `ids`.
    ///
    /// Ids with no edges may be missing from the map.
    async fn follow_counts(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, FollowCounts>, StoreError>;

    /// Create the edge `follower_id -> following_id`.
    ///
    /// Fails with [`StoreError::DuplicateFollow`] if it already exists and
    /// [`StoreError::MissingReference`] if either user is gone.
    async fn insert_follow(&self, follower_id: Uuid, following_id: Uuid)
        -> Result<Follow, StoreError>;

    async fn find_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<Option<Follow>, StoreError>;

    /// Remove an edge. Returns `false` when it did not exist.
    async fn delete_follow(&self, follower_id: Uuid, following_id: Uuid)
        -> Result<bool, StoreError>;

    /// Users following `user_id`, newest edge first.
    async fn list_followers(&self, user_id: Uuid, page: PageRequest)
        -> Result<Page<User>, StoreError>;

    /// Users `user_id` follows, newest edge first.
    async fn list_following(&self, user_id: Uuid, page: PageRequest)
        -> Result<Page<User>, StoreError>;

    /// Every edge, newest first.
    async fn list_follows(&self, page: PageRequest) -> Result<Page<Follow>, StoreError>;

    /// Cheap round trip used by readiness checks.
    async fn ping(&self) -> Result<(), StoreError>;
}
