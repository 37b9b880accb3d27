//! # Follow Directory
//!
//! An administrative REST API for a social "follow" directory: user records,
//! the directed follow graph between them, and profile images kept in
//! S3-compatible object storage. Users and edges live in Postgres.
//!
//! ## Features
//!
//! - **User management**: create, read, partial update and delete, with
//!   validated input and unique usernames and e-mails
//! - **Listings**: offset pagination, case-insensitive search and stable sorting
//! - **Follow graph**: follow, unfollow, followers/following listings, with
//!   computed counts on every returned profile
//! - **Profile images**: sniffed and size-checked uploads to object storage
//! - **Authentication**: optional admin bearer token
//!
//! ## Architecture
//!
//! - [`model`] - Users, follows, pagination and listing queries
//! - [`store`] - The [`Directory`] persistence trait and its Postgres implementation
//! - [`storage`] - The [`ObjectStore`] trait and its S3 implementation
//! - [`directory`] - [`DirectoryService`], response shaping and image inspection
//! - [`server`] - Axum handlers, router and authentication
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use follow_directory::{
//!     connect_pool, create_router, create_s3_client, DirectoryService, PostgresDirectory,
//!     RouterConfig, S3ObjectStore,
//! };
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = connect_pool("postgres://localhost/directory", 10, Duration::from_secs(5)).await?;
//!     let directory = PostgresDirectory::new(pool);
//!     directory.migrate().await?;
//!
//!     let client = create_s3_client(None, "us-east-1").await;
//!     let images = S3ObjectStore::new(client, "avatars", "", "https://avatars.example.com");
//!
//!     let service = DirectoryService::new(directory, images);
//!     let router = create_router(service, RouterConfig::new("an-admin-token-of-some-length"));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod model;
pub mod server;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use config::{CheckConfig, Cli, Command, MigrateConfig, ServeConfig};
pub use directory::{DirectoryService, ProfileImage, Readiness, UserProfile};
pub use error::{ServiceError, StorageError, StoreError};
pub use model::{
    Follow, FollowCounts, NewUser, Page, PageRequest, Pagination, SortField, SortOrder, User,
    UserChanges, UserQuery,
};
pub use server::{create_router, AdminAuth, AppState, ErrorResponse, RouterConfig};
pub use storage::{create_s3_client, ObjectStore, S3ObjectStore};
pub use store::{connect_pool, Directory, PostgresDirectory};
