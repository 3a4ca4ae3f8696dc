//! PostgreSQL account store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgConnection, PgPool};

use crate::config::Postgres as PostgresConfig;
use crate::crypto::PasswordHash;
use crate::database::AccountStore;
use crate::error::{AccountError, Result};
use crate::role::Role;
use crate::user::{CommentId, FavoriteId, PostId, User, UserSnapshot};

pub const DEFAULT_CREDENTIALS: &str = "postgres";
pub const DEFAULT_DATABASE_NAME: &str = "accounts";
pub const DEFAULT_POOL_SIZE: u32 = 10;

const USERNAME_CONSTRAINT: &str = "users_pkey";
const EMAIL_CONSTRAINT: &str = "users_email_key";

/// Accounts stored on PostgreSQL.
///
/// Ownership links live in their own tables and are removed by
/// `ON DELETE CASCADE` when the account goes.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Create a new [`PgAccountStore`] on an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool.
    pub async fn connect(
        config: &PostgresConfig,
    ) -> std::result::Result<Self, sqlx::Error> {
        let username = config.username.as_deref().unwrap_or(DEFAULT_CREDENTIALS);
        let password = config.password.as_deref().unwrap_or(DEFAULT_CREDENTIALS);
        let db = config.database.as_deref().unwrap_or(DEFAULT_DATABASE_NAME);
        let hostname = &config.address;

        let addr = format!("postgres://{username}:{password}@{hostname}/{db}");
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size.unwrap_or(DEFAULT_POOL_SIZE))
            .connect(&addr)
            .await?;

        tracing::info!(%hostname, %db, "postgres connected");

        Ok(Self { pool })
    }

    /// Execute migration scripts.
    pub async fn migrate(
        &self,
    ) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.pool).await
    }

    async fn find_by(&self, field: Field, value: &str) -> Result<Option<User>> {
        let query = get_by_field_query(field);

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_by(Field::Username, username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_by(Field::Email, email).await
    }

    async fn save(&self, user: &User) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO users (username, email, password, refresh_token, created_at)
                VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(user.username())
        .bind(user.email())
        .bind(user.credential_hash().as_str())
        .bind(user.refresh_token())
        .bind(user.created_at())
        .execute(&mut *tx)
        .await
        .map_err(|err| conflict(err, user.username()))?;

        insert_links(&mut tx, user).await?;
        tx.commit().await?;

        tracing::debug!(username = user.username(), "account row inserted");
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"UPDATE users
                SET email = $2, password = $3, refresh_token = $4
                WHERE username = $1"#,
        )
        .bind(user.username())
        .bind(user.email())
        .bind(user.credential_hash().as_str())
        .bind(user.refresh_token())
        .execute(&mut *tx)
        .await
        .map_err(|err| conflict(err, user.username()))?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AccountError::AccountNotFound(user.username().to_owned()));
        }

        for link in LINKS {
            sqlx::query(&format!("DELETE FROM {} WHERE username = $1", link.table))
                .bind(user.username())
                .execute(&mut *tx)
                .await?;
        }
        insert_links(&mut tx, user).await?;
        tx.commit().await?;

        Ok(())
    }

    async fn delete(&self, username: &str) -> Result<()> {
        let result = sqlx::query(r#"DELETE FROM users WHERE username = $1"#)
            .bind(username)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AccountError::AccountNotFound(username.to_owned()));
        }

        Ok(())
    }
}

/// Link table holding one ownership collection.
struct Link {
    table: &'static str,
    column: &'static str,
    cast: &'static str,
}

const LINKS: [Link; 4] = [
    Link {
        table: "user_roles",
        column: "role",
        cast: "TEXT[]",
    },
    Link {
        table: "user_posts",
        column: "post_id",
        cast: "BIGINT[]",
    },
    Link {
        table: "user_comments",
        column: "comment_id",
        cast: "BIGINT[]",
    },
    Link {
        table: "user_favorites",
        column: "favorite_id",
        cast: "BIGINT[]",
    },
];

fn insert_link_query(link: &Link) -> String {
    format!(
        "INSERT INTO {} (username, {}) SELECT $1, UNNEST($2::{})",
        link.table, link.column, link.cast
    )
}

async fn insert_links(conn: &mut PgConnection, user: &User) -> Result<()> {
    let [roles, posts, comments, favorites] = &LINKS;

    let names: Vec<&str> = user.roles().iter().map(Role::as_str).collect();
    sqlx::query(&insert_link_query(roles))
        .bind(user.username())
        .bind(&names)
        .execute(&mut *conn)
        .await?;

    let ids: Vec<i64> = user.posts().iter().map(|p| p.get()).collect();
    sqlx::query(&insert_link_query(posts))
        .bind(user.username())
        .bind(&ids)
        .execute(&mut *conn)
        .await?;

    let ids: Vec<i64> = user.comments().iter().map(|c| c.get()).collect();
    sqlx::query(&insert_link_query(comments))
        .bind(user.username())
        .bind(&ids)
        .execute(&mut *conn)
        .await?;

    let ids: Vec<i64> = user.favorites().iter().map(|f| f.get()).collect();
    sqlx::query(&insert_link_query(favorites))
        .bind(user.username())
        .bind(&ids)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Turn a unique violation into the matching duplicate error.
fn conflict(err: sqlx::Error, username: &str) -> AccountError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            match db.constraint() {
                Some(USERNAME_CONSTRAINT) => {
                    return AccountError::DuplicateUsername(username.to_owned());
                },
                Some(EMAIL_CONSTRAINT) => return AccountError::DuplicateEmail,
                _ => {},
            }
        }
    }

    AccountError::Sql(err)
}

/// Row as returned by [`get_by_field_query`].
#[derive(Debug, FromRow)]
struct UserRow {
    username: String,
    email: String,
    password: String,
    refresh_token: Option<String>,
    created_at: DateTime<Utc>,
    roles: Vec<String>,
    posts: Vec<i64>,
    comments: Vec<i64>,
    favorites: Vec<i64>,
}

impl TryFrom<UserRow> for User {
    type Error = AccountError;

    fn try_from(row: UserRow) -> Result<Self> {
        let snapshot = UserSnapshot {
            username: row.username,
            email: row.email,
            password: PasswordHash::parse(row.password)?,
            refresh_token: row.refresh_token,
            roles: row
                .roles
                .iter()
                .map(|r| r.parse::<Role>())
                .collect::<Result<_>>()?,
            posts: row.posts.into_iter().map(PostId).collect(),
            comments: row.comments.into_iter().map(CommentId).collect(),
            favorites: row.favorites.into_iter().map(FavoriteId).collect(),
            created_at: row.created_at,
        };

        User::try_from(snapshot)
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Username,
    Email,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Field::Username => write!(f, "username"),
            Field::Email => write!(f, "email"),
        }
    }
}

fn get_by_field_query(field: Field) -> String {
    format!(
        r#"SELECT
                u.username,
                u.email,
                u.password,
                u.refresh_token,
                u.created_at,
                ARRAY(SELECT r.role FROM user_roles r WHERE r.username = u.username) AS roles,
                ARRAY(SELECT p.post_id FROM user_posts p WHERE p.username = u.username) AS posts,
                ARRAY(SELECT c.comment_id FROM user_comments c WHERE c.username = u.username) AS comments,
                ARRAY(SELECT f.favorite_id FROM user_favorites f WHERE f.username = u.username) AS favorites
            FROM users u
            WHERE u.{field} = $1"#
    )
}
