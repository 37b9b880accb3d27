//! Postgres-backed implementation of [`Directory`].
//!
//! Queries are built at runtime with `sqlx`, so the crate compiles without a
//! live database. The schema is created by [`PostgresDirectory::migrate`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::debug;
use uuid::Uuid;

use super::Directory;
use crate::error::StoreError;
use crate::model::{Follow, FollowCounts, NewUser, Page, PageRequest, User, UserChanges, UserQuery};

/// Default size of the connection pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

const USER_COLUMNS: &str =
    "id, username, full_name, email, date_of_birth, bio, profile_image_url, created_at, updated_at";

const JOINED_USER_COLUMNS: &str = "u.id, u.username, u.full_name, u.email, u.date_of_birth, \
     u.bio, u.profile_image_url, u.created_at, u.updated_at";

const FOLLOW_COLUMNS: &str = "follower_id, following_id, created_at";

/// Open a connection pool to the given database.
pub async fn connect_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))
}

/// Escape `LIKE` metacharacters so the term is matched literally.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Directory backed by a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// The idempotent schema for the `users` and `follows` tables.
    ///
    /// Constraint names are relied upon when mapping unique violations back
    /// to field names.
    pub fn migration_query() -> &'static str {
        "CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    username TEXT NOT NULL,
    full_name TEXT NOT NULL,
    email TEXT NOT NULL,
    date_of_birth DATE,
    bio TEXT,
    profile_image_url TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT users_username_key UNIQUE (username),
    CONSTRAINT users_email_key UNIQUE (email)
);

CREATE TABLE IF NOT EXISTS follows (
    follower_id UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    following_id UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT follows_pkey PRIMARY KEY (follower_id, following_id),
    CONSTRAINT follows_no_self_follow CHECK (follower_id <> following_id)
);

CREATE INDEX IF NOT EXISTS idx_follows_following_id ON follows (following_id);
CREATE INDEX IF NOT EXISTS idx_follows_created_at ON follows (created_at);
CREATE INDEX IF NOT EXISTS idx_users_created_at ON users (created_at);"
    }

    /// Create the tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        use sqlx::Executor as _;

        self.pool.execute(Self::migration_query()).await?;
        Ok(())
    }

    async fn list_edge_users(
        &self,
        join_column: &str,
        filter_column: &str,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<User>, StoreError> {
        let count_sql = format!("SELECT COUNT(*) FROM follows WHERE {} = $1", filter_column);
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM follows f JOIN users u ON u.id = f.{} \
             WHERE f.{} = $1 \
             ORDER BY f.created_at DESC, u.id ASC \
             LIMIT $2 OFFSET $3",
            JOINED_USER_COLUMNS, join_column, filter_column
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .bind(i64::from(page.limit()))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(users, total.max(0) as u64, page))
    }
}

fn push_search_filter(qb: &mut QueryBuilder<'_, Postgres>, term: Option<&str>) {
    if let Some(term) = term {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" WHERE (username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR full_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl Directory for PostgresDirectory {
    #[tracing::instrument(name = "Insert user", level = "debug", skip_all)]
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users \
             (id, username, full_name, email, date_of_birth, bio, profile_image_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {}",
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(user.username)
            .bind(user.full_name)
            .bind(user.email)
            .bind(user.date_of_birth)
            .bind(user.bio)
            .bind(user.profile_image_url)
            .fetch_one(&self.pool)
            .await?;

        debug!(user_id = %user.id, "Inserted user");
        Ok(user)
    }

    #[tracing::instrument(name = "Find user", level = "debug", skip(self))]
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    #[tracing::instrument(name = "Update user", level = "debug", skip(self, changes))]
    async fn update_user(
        &self,
        id: Uuid,
        changes: UserChanges,
    ) -> Result<Option<User>, StoreError> {
        if changes.is_empty() {
            return self.find_user(id).await;
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(username) = changes.username {
                set.push("username = ").push_bind_unseparated(username);
            }
            if let Some(full_name) = changes.full_name {
                set.push("full_name = ").push_bind_unseparated(full_name);
            }
            if let Some(email) = changes.email {
                set.push("email = ").push_bind_unseparated(email);
            }
            if let Some(date_of_birth) = changes.date_of_birth {
                set.push("date_of_birth = ")
                    .push_bind_unseparated(date_of_birth);
            }
            if let Some(bio) = changes.bio {
                set.push("bio = ").push_bind_unseparated(bio);
            }
            if let Some(url) = changes.profile_image_url {
                set.push("profile_image_url = ").push_bind_unseparated(url);
            }
            set.push("updated_at = now()");
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(USER_COLUMNS);

        let user = qb
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    #[tracing::instrument(name = "Delete user", level = "debug", skip(self))]
    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(name = "List users", level = "debug", skip_all)]
    async fn list_users(&self, query: &UserQuery) -> Result<Page<User>, StoreError> {
        let term = query.search_term();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_search_filter(&mut count, term);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT ");
        select.push(USER_COLUMNS).push(" FROM users");
        push_search_filter(&mut select, term);
        select
            .push(format!(
                " ORDER BY {} {}, id {}",
                query.sort.column(),
                query.order.keyword(),
                query.order.keyword()
            ))
            .push(" LIMIT ")
            .push_bind(i64::from(query.page.limit()))
            .push(" OFFSET ")
            .push_bind(query.page.offset() as i64);

        let users = select
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(users, total.max(0) as u64, query.page))
    }

    #[tracing::instrument(name = "Count follows", level = "debug", skip_all, fields(users = ids.len()))]
    async fn follow_counts(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, FollowCounts>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            "SELECT u.id, \
             (SELECT COUNT(*) FROM follows f WHERE f.following_id = u.id) AS followers, \
             (SELECT COUNT(*) FROM follows f WHERE f.follower_id = u.id) AS following \
             FROM users u WHERE u.id = ANY($1)",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        let mut counts = HashMap::with_capacity(rows.len());
        for row in rows {
            let id: Uuid = row.try_get("id")?;
            let followers: i64 = row.try_get("followers")?;
            let following: i64 = row.try_get("following")?;
            counts.insert(
                id,
                FollowCounts {
                    followers: followers.max(0) as u64,
                    following: following.max(0) as u64,
                },
            );
        }
        Ok(counts)
    }

    #[tracing::instrument(name = "Insert follow", level = "debug", skip(self))]
    async fn insert_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<Follow, StoreError> {
        let sql = format!(
            "INSERT INTO follows (follower_id, following_id) VALUES ($1, $2) RETURNING {}",
            FOLLOW_COLUMNS
        );

        sqlx::query_as::<_, Follow>(&sql)
            .bind(follower_id)
            .bind(following_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match StoreError::from(e) {
                StoreError::Conflict { .. } => StoreError::DuplicateFollow {
                    follower_id,
                    following_id,
                },
                other => other,
            })
    }

    #[tracing::instrument(name = "Find follow", level = "debug", skip(self))]
    async fn find_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<Option<Follow>, StoreError> {
        let sql = format!(
            "SELECT {} FROM follows WHERE follower_id = $1 AND following_id = $2",
            FOLLOW_COLUMNS
        );
        let follow = sqlx::query_as::<_, Follow>(&sql)
            .bind(follower_id)
            .bind(following_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(follow)
    }

    #[tracing::instrument(name = "Delete follow", level = "debug", skip(self))]
    async fn delete_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
                .bind(follower_id)
                .bind(following_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(name = "List followers", level = "debug", skip(self))]
    async fn list_followers(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<User>, StoreError> {
        self.list_edge_users("follower_id", "following_id", user_id, page)
            .await
    }

    #[tracing::instrument(name = "List following", level = "debug", skip(self))]
    async fn list_following(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<User>, StoreError> {
        self.list_edge_users("following_id", "follower_id", user_id, page)
            .await
    }

    #[tracing::instrument(name = "List follows", level = "debug", skip(self))]
    async fn list_follows(&self, page: PageRequest) -> Result<Page<Follow>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows")
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM follows \
             ORDER BY created_at DESC, follower_id ASC, following_id ASC \
             LIMIT $1 OFFSET $2",
            FOLLOW_COLUMNS
        );
        let follows = sqlx::query_as::<_, Follow>(&sql)
            .bind(i64::from(page.limit()))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(follows, total.max(0) as u64, page))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
