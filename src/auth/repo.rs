use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, ProfileChanges, User};
use crate::db::{PgStore, RepoError};

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert a new account. A taken email surfaces as `RepoError::Conflict`.
    async fn create(&self, new: NewUser) -> Result<User, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Apply a profile edit. Supplying an email bumps `token_version` by one
    /// in the same write.
    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<User, RepoError>;

    /// Store a new password hash and bump `token_version` by one in the same write.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<User, RepoError>;

    async fn update_image(&self, id: Uuid, image_url: &str) -> Result<User, RepoError>;
}

#[async_trait]
impl UserRepo for PgStore {
    async fn create(&self, new: NewUser) -> Result<User, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, image_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, role, image_url,
                      token_version, created_at, updated_at
            "#,
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, image_url,
                   token_version, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, image_url,
                   token_version, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<User, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET username = COALESCE($2, username),
                   email = COALESCE($3, email),
                   token_version = token_version + CASE WHEN $3::text IS NULL THEN 0 ELSE 1 END,
                   updated_at = now()
             WHERE id = $1
            RETURNING id, username, email, password_hash, role, image_url,
                      token_version, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.username)
        .bind(changes.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<User, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET password_hash = $2,
                   token_version = token_version + 1,
                   updated_at = now()
             WHERE id = $1
            RETURNING id, username, email, password_hash, role, image_url,
                      token_version, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_image(&self, id: Uuid, image_url: &str) -> Result<User, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET image_url = $2,
                   updated_at = now()
             WHERE id = $1
            RETURNING id, username, email, password_hash, role, image_url,
                      token_version, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }
}
