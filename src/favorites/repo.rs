use async_trait::async_trait;
use uuid::Uuid;

use crate::db::{PgStore, RepoError};
use crate::meals::{
    repo::hydrate,
    repo_types::{Recipe, RecipeRow},
};

/// Many-to-many membership between users and the recipes they favorited.
#[async_trait]
pub trait FavoriteRepo: Send + Sync {
    /// Idempotent: the (user, recipe) pair is stored at most once.
    async fn add(&self, user_id: Uuid, recipe_id: Uuid) -> Result<(), RepoError>;

    async fn contains(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, RepoError>;

    /// Returns whether a membership row was removed.
    async fn remove(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, RepoError>;

    /// Favorited recipes with their ingredients and steps.
    async fn list(&self, user_id: Uuid) -> Result<Vec<Recipe>, RepoError>;
}

#[async_trait]
impl FavoriteRepo for PgStore {
    async fn add(&self, user_id: Uuid, recipe_id: Uuid) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO favorite_user_meal (user_id, meal_recipe_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, meal_recipe_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(recipe_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn contains(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, RepoError> {
        let found: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM favorite_user_meal
                 WHERE user_id = $1 AND meal_recipe_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(recipe_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn remove(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, RepoError> {
        let res = sqlx::query(
            "DELETE FROM favorite_user_meal WHERE user_id = $1 AND meal_recipe_id = $2",
        )
        .bind(user_id)
        .bind(recipe_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<Recipe>, RepoError> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT r.id, r.user_id, r.name, r.category, r.image_url, r.duration, r.complexity,
                   r.affordability, r.is_gluten_free, r.is_lactose_free, r.is_vegan,
                   r.created_at, r.updated_at
              FROM meal_recipes r
              JOIN favorite_user_meal f ON f.meal_recipe_id = r.id
             WHERE f.user_id = $1
             ORDER BY f.created_at, r.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        hydrate(&mut conn, rows).await
    }
}
