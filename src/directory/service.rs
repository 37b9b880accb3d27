//! Directory service: the orchestration layer behind every endpoint.
//!
//! Each operation is a short sequence of calls against the [`Directory`] and
//! the [`ObjectStore`], followed by response shaping:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       DirectoryService                          │
//! │  1. Check referenced users exist    3. Batch follow counts      │
//! │  2. Run the store operation         4. Shape into UserProfile   │
//! │           │                                    │                │
//! │           ▼                                    ▼                │
//! │    ┌──────────────┐                    ┌──────────────┐         │
//! │    │  Directory   │                    │ ObjectStore  │         │
//! │    └──────────────┘                    └──────────────┘         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ServiceError, StoreError};
use crate::model::{Follow, NewUser, Page, PageRequest, User, UserChanges, UserQuery};
use crate::storage::ObjectStore;
use crate::store::Directory;

use super::upload::{inspect_image, DEFAULT_MAX_UPLOAD_BYTES};
use super::profile::{today, UserProfile};

/// Result of a successful profile image upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileImage {
    pub profile_image_url: String,
    pub key: String,
    pub content_type: String,
    pub size: usize,
}

/// Readiness of the service's remote dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub database: DependencyStatus,
    pub storage: DependencyStatus,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.database.ok && self.storage.ok
    }
}

/// Whether one dependency answered.
///
/// The failure detail is kept for logs and never serialized: backend errors
/// can carry hosts, bucket names and driver text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyStatus {
    pub ok: bool,
    #[serde(skip)]
    pub error: Option<String>,
}

impl<E: std::fmt::Display> From<Result<(), E>> for DependencyStatus {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self {
                ok: true,
                error: None,
            },
            Err(e) => Self {
                ok: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Service for managing users, follow edges and profile images.
///
/// # Type Parameters
///
/// * `D` - The persistence backend (e.g. [`PostgresDirectory`](crate::store::PostgresDirectory))
/// * `O` - The object store receiving profile images
pub struct DirectoryService<D: Directory, O: ObjectStore> {
    directory: Arc<D>,
    storage: Arc<O>,
    max_upload_bytes: usize,
}

impl<D: Directory, O: ObjectStore> DirectoryService<D, O> {
    /// Create a new service with the default upload limit.
    pub fn new(directory: D, storage: O) -> Self {
        Self::with_upload_limit(directory, storage, DEFAULT_MAX_UPLOAD_BYTES)
    }

    /// Create a new service with a custom upload limit in bytes.
    pub fn with_upload_limit(directory: D, storage: O, max_upload_bytes: usize) -> Self {
        Self {
            directory: Arc::new(directory),
            storage: Arc::new(storage),
            max_upload_bytes,
        }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn storage(&self) -> &O {
        &self.storage
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    pub async fn create_user(&self, user: NewUser) -> Result<UserProfile, ServiceError> {
        let user = self
            .directory
            .insert_user(user)
            .await
            .map_err(conflict_to_service)?;

        info!(user_id = %user.id, username = %user.username, "Created user");
        self.shape_one(user).await
    }

    pub async fn get_user(&self, id: Uuid) -> Result<UserProfile, ServiceError> {
        let user = self.require_user(id).await?;
        self.shape_one(user).await
    }

    pub async fn list_users(&self, query: &UserQuery) -> Result<Page<UserProfile>, ServiceError> {
        let page = self.directory.list_users(query).await?;
        self.shape_page(page).await
    }

    pub async fn update_user(
        &self,
        id: Uuid,
        changes: UserChanges,
    ) -> Result<UserProfile, ServiceError> {
        if changes.is_empty() {
            return Err(ServiceError::EmptyUpdate);
        }

        let user = self
            .directory
            .update_user(id, changes)
            .await
            .map_err(conflict_to_service)?
            .ok_or(ServiceError::UserNotFound(id))?;

        info!(user_id = %id, "Updated user");
        self.shape_one(user).await
    }

    /// Delete a user, its edges and (best effort) its stored profile image.
    pub async fn delete_user(&self, id: Uuid) -> Result<(), ServiceError> {
        let user = self.require_user(id).await?;

        if !self.directory.delete_user(id).await? {
            return Err(ServiceError::UserNotFound(id));
        }
        info!(user_id = %id, "Deleted user");

        if let Some(url) = user.profile_image_url.as_deref() {
            self.remove_owned_image(id, url).await;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Follows
    // -------------------------------------------------------------------------

    pub async fn follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<Follow, ServiceError> {
        if follower_id == following_id {
            return Err(ServiceError::SelfFollow);
        }
        self.require_user(follower_id).await?;
        self.require_user(following_id).await?;

        let follow = match self.directory.insert_follow(follower_id, following_id).await {
            Ok(follow) => follow,
            Err(StoreError::DuplicateFollow {
                follower_id,
                following_id,
            }) => {
                return Err(ServiceError::AlreadyFollowing {
                    follower_id,
                    following_id,
                })
            }
            // One of the users was deleted between the checks and the insert
            Err(StoreError::MissingReference) => {
                let missing = if self.directory.find_user(follower_id).await?.is_none() {
                    follower_id
                } else {
                    following_id
                };
                return Err(ServiceError::UserNotFound(missing));
            }
            Err(other) => return Err(other.into()),
        };

        info!(%follower_id, %following_id, "Created follow");
        Ok(follow)
    }

    pub async fn get_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<Follow, ServiceError> {
        self.directory
            .find_follow(follower_id, following_id)
            .await?
            .ok_or(ServiceError::NotFollowing {
                follower_id,
                following_id,
            })
    }

    pub async fn unfollow(&self, follower_id: Uuid, following_id: Uuid) -> Result<(), ServiceError> {
        if !self
            .directory
            .delete_follow(follower_id, following_id)
            .await?
        {
            return Err(ServiceError::NotFollowing {
                follower_id,
                following_id,
            });
        }

        info!(%follower_id, %following_id, "Removed follow");
        Ok(())
    }

    pub async fn followers(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<UserProfile>, ServiceError> {
        self.require_user(user_id).await?;
        let page = self.directory.list_followers(user_id, page).await?;
        self.shape_page(page).await
    }

    pub async fn following(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<UserProfile>, ServiceError> {
        self.require_user(user_id).await?;
        let page = self.directory.list_following(user_id, page).await?;
        self.shape_page(page).await
    }

    pub async fn list_follows(&self, page: PageRequest) -> Result<Page<Follow>, ServiceError> {
        Ok(self.directory.list_follows(page).await?)
    }

    // -------------------------------------------------------------------------
    // Profile images
    // -------------------------------------------------------------------------

    /// Validate, store and attach a new profile image.
    ///
    /// The user is checked before anything is uploaded. The previous image is
    /// deleted afterwards if it was stored by this service.
    pub async fn upload_profile_image(
        &self,
        user_id: Uuid,
        data: Bytes,
    ) -> Result<ProfileImage, ServiceError> {
        let user = self.require_user(user_id).await?;
        let info = inspect_image(&data, self.max_upload_bytes)?;

        let key = format!(
            "{}{}.{}",
            self.image_key_prefix(user_id),
            Uuid::new_v4(),
            info.kind.extension()
        );
        let size = data.len();
        let content_type = info.kind.content_type();

        self.storage.put_object(&key, data, content_type).await?;
        let url = self.storage.public_url(&key);
        debug!(%user_id, key = %key, size, width = info.width, height = info.height, "Uploaded profile image");

        let changes = UserChanges {
            profile_image_url: Some(Some(url.clone())),
            ..Default::default()
        };
        let updated = self.directory.update_user(user_id, changes).await;
        match updated {
            Ok(Some(_)) => {}
            Ok(None) => {
                // Deleted while uploading; don't leave the object behind
                self.remove_owned_image(user_id, &url).await;
                return Err(ServiceError::UserNotFound(user_id));
            }
            Err(e) => {
                self.remove_owned_image(user_id, &url).await;
                return Err(e.into());
            }
        }

        if let Some(previous) = user.profile_image_url.as_deref() {
            if previous != url {
                self.remove_owned_image(user_id, previous).await;
            }
        }

        info!(%user_id, key = %key, "Updated profile image");
        Ok(ProfileImage {
            profile_image_url: url,
            key,
            content_type: content_type.to_string(),
            size,
        })
    }

    // -------------------------------------------------------------------------
    // Health
    // -------------------------------------------------------------------------

    pub async fn readiness(&self) -> Readiness {
        let (database, storage) = tokio::join!(self.directory.ping(), self.storage.ping());
        Readiness {
            database: database.into(),
            storage: storage.into(),
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn require_user(&self, id: Uuid) -> Result<User, ServiceError> {
        self.directory
            .find_user(id)
            .await?
            .ok_or(ServiceError::UserNotFound(id))
    }

    async fn shape_one(&self, user: User) -> Result<UserProfile, ServiceError> {
        let counts = self.directory.follow_counts(&[user.id]).await?;
        let user_counts = counts.get(&user.id).copied().unwrap_or_default();
        Ok(UserProfile::new(user, user_counts, today()))
    }

    async fn shape_page(&self, page: Page<User>) -> Result<Page<UserProfile>, ServiceError> {
        let ids: Vec<Uuid> = page.items.iter().map(|u| u.id).collect();
        let counts = self.directory.follow_counts(&ids).await?;
        let today = today();

        Ok(page.map(|user| {
            let user_counts = counts.get(&user.id).copied().unwrap_or_default();
            UserProfile::new(user, user_counts, today)
        }))
    }

    /// Key prefix under which `user_id`'s profile images are stored.
    fn image_key_prefix(&self, user_id: Uuid) -> String {
        format!("{}users/{}/", self.storage.key_prefix(), user_id)
    }

    /// Delete an object if `url` points at one of `user_id`'s stored images.
    ///
    /// URLs copied from another user's profile are left alone. Failures are
    /// logged; the caller's operation has already succeeded.
    async fn remove_owned_image(&self, user_id: Uuid, url: &str) {
        let owned = self.image_key_prefix(user_id);
        let Some(key) = self
            .storage
            .key_for_url(url)
            .filter(|key| key.starts_with(&owned))
        else {
            debug!(%user_id, url, "Profile image is not owned by this user, leaving it");
            return;
        };

        if let Err(e) = self.storage.delete_object(&key).await {
            warn!(key = %key, error = %e, "Failed to delete profile image");
        }
    }
}

fn conflict_to_service(err: StoreError) -> ServiceError {
    match err {
        StoreError::Conflict { field } => ServiceError::Conflict { field },
        other => ServiceError::Store(other),
    }
}
