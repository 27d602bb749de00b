use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

/// Failure reported by a repository implementation.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The store rejected a write on a unique constraint; carries the constraint name.
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("record not found")]
    NotFound,

    /// A foreign key points at a row that does not exist (or no longer does).
    #[error("missing referenced row: {0}")]
    MissingReference(String),

    #[error("{0}")]
    Backend(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                RepoError::MissingReference(db.constraint().unwrap_or("foreign key").to_string())
            }
            _ => RepoError::Backend(e.to_string()),
        }
    }
}

/// PostgreSQL-backed implementation of every repository trait.
/// The trait impls live next to their feature (`auth::repo`, `meals::repo`, `favorites::repo`).
#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }
}
