use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::{PgStore, RepoError};
use crate::meals::repo_types::{
    replacement, ChildRow, Recipe, RecipeHeader, RecipePatch, RecipeRow,
};

/// Atomic persistence for the recipe aggregate.
#[async_trait]
pub trait RecipeRepo: Send + Sync {
    /// Insert the header and every child row in one transaction.
    /// Either the whole aggregate becomes visible or nothing does.
    async fn create(
        &self,
        owner_id: Uuid,
        header: RecipeHeader,
        ingredients: &[String],
        steps: &[String],
    ) -> Result<Recipe, RepoError>;

    /// Apply `patch` to the header and, for each non-empty child list,
    /// delete the stored rows and insert the new ones. One transaction.
    async fn replace(
        &self,
        id: Uuid,
        patch: RecipePatch,
        ingredients: Option<Vec<String>>,
        steps: Option<Vec<String>>,
    ) -> Result<Recipe, RepoError>;

    /// Delete the header; children and favorite memberships go with it.
    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;

    /// All recipes, or those whose name matches `name_filter`, best match first.
    async fn list(&self, name_filter: Option<&str>) -> Result<Vec<Recipe>, RepoError>;

    async fn get(&self, id: Uuid) -> Result<Option<Recipe>, RepoError>;
}

#[derive(Debug, Clone, Copy)]
enum ChildTable {
    Ingredients,
    Steps,
}

impl ChildTable {
    fn table(self) -> &'static str {
        match self {
            ChildTable::Ingredients => "meal_ingredients",
            ChildTable::Steps => "meal_recipe_steps",
        }
    }

    fn column(self) -> &'static str {
        match self {
            ChildTable::Ingredients => "ingredient",
            ChildTable::Steps => "step",
        }
    }
}

async fn insert_children(
    conn: &mut PgConnection,
    kind: ChildTable,
    recipe_id: Uuid,
    items: &[String],
) -> Result<(), RepoError> {
    if items.is_empty() {
        return Ok(());
    }
    let sql = format!(
        r#"
        INSERT INTO {table} (meal_recipe_id, position, {column})
        SELECT $1, (t.ord - 1)::int, t.body
          FROM UNNEST($2::text[]) WITH ORDINALITY AS t(body, ord)
        "#,
        table = kind.table(),
        column = kind.column(),
    );
    sqlx::query(&sql)
        .bind(recipe_id)
        .bind(items.to_vec())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn delete_children(
    conn: &mut PgConnection,
    kind: ChildTable,
    recipe_id: Uuid,
) -> Result<(), RepoError> {
    let sql = format!("DELETE FROM {} WHERE meal_recipe_id = $1", kind.table());
    sqlx::query(&sql).bind(recipe_id).execute(&mut *conn).await?;
    Ok(())
}

async fn load_children(
    conn: &mut PgConnection,
    kind: ChildTable,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<String>>, RepoError> {
    let sql = format!(
        r#"
        SELECT meal_recipe_id, {column} AS body
          FROM {table}
         WHERE meal_recipe_id = ANY($1)
         ORDER BY meal_recipe_id, position
        "#,
        table = kind.table(),
        column = kind.column(),
    );
    let rows = sqlx::query_as::<_, ChildRow>(&sql)
        .bind(ids.to_vec())
        .fetch_all(&mut *conn)
        .await?;

    let mut out: HashMap<Uuid, Vec<String>> = HashMap::new();
    for row in rows {
        out.entry(row.meal_recipe_id).or_default().push(row.body);
    }
    Ok(out)
}

/// Attach ingredients and steps to header rows, keeping the rows' order.
pub(crate) async fn hydrate(
    conn: &mut PgConnection,
    rows: Vec<RecipeRow>,
) -> Result<Vec<Recipe>, RepoError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut ingredients = load_children(conn, ChildTable::Ingredients, &ids).await?;
    let mut steps = load_children(conn, ChildTable::Steps, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let i = ingredients.remove(&row.id).unwrap_or_default();
            let s = steps.remove(&row.id).unwrap_or_default();
            Recipe::from_parts(row, i, s)
        })
        .collect())
}

#[async_trait]
impl RecipeRepo for PgStore {
    async fn create(
        &self,
        owner_id: Uuid,
        header: RecipeHeader,
        ingredients: &[String],
        steps: &[String],
    ) -> Result<Recipe, RepoError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, RecipeRow>(
            r#"
            INSERT INTO meal_recipes (user_id, name, category, image_url, duration, complexity,
                                      affordability, is_gluten_free, is_lactose_free, is_vegan)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, user_id, name, category, image_url, duration, complexity, affordability,
                      is_gluten_free, is_lactose_free, is_vegan, created_at, updated_at
            "#,
        )
        .bind(owner_id)
        .bind(&header.name)
        .bind(&header.category)
        .bind(&header.image_url)
        .bind(&header.duration)
        .bind(&header.complexity)
        .bind(&header.affordability)
        .bind(header.is_gluten_free)
        .bind(header.is_lactose_free)
        .bind(header.is_vegan)
        .fetch_one(&mut *tx)
        .await?;

        insert_children(&mut tx, ChildTable::Ingredients, row.id, ingredients).await?;
        insert_children(&mut tx, ChildTable::Steps, row.id, steps).await?;

        tx.commit().await?;
        Ok(Recipe::from_parts(row, ingredients.to_vec(), steps.to_vec()))
    }

    async fn replace(
        &self,
        id: Uuid,
        patch: RecipePatch,
        ingredients: Option<Vec<String>>,
        steps: Option<Vec<String>>,
    ) -> Result<Recipe, RepoError> {
        let mut tx = self.pool.begin().await?;

        // Row lock so concurrent replaces patch the latest committed header.
        let mut row = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT id, user_id, name, category, image_url, duration, complexity, affordability,
                   is_gluten_free, is_lactose_free, is_vegan, created_at, updated_at
            FROM meal_recipes
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepoError::NotFound)?;

        patch.apply(&mut row);

        let row = sqlx::query_as::<_, RecipeRow>(
            r#"
            UPDATE meal_recipes
               SET name = $2, category = $3, image_url = $4, duration = $5, complexity = $6,
                   affordability = $7, is_gluten_free = $8, is_lactose_free = $9, is_vegan = $10,
                   updated_at = now()
             WHERE id = $1
            RETURNING id, user_id, name, category, image_url, duration, complexity, affordability,
                      is_gluten_free, is_lactose_free, is_vegan, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&row.name)
        .bind(&row.category)
        .bind(&row.image_url)
        .bind(&row.duration)
        .bind(&row.complexity)
        .bind(&row.affordability)
        .bind(row.is_gluten_free)
        .bind(row.is_lactose_free)
        .bind(row.is_vegan)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(items) = replacement(ingredients) {
            delete_children(&mut tx, ChildTable::Ingredients, id).await?;
            insert_children(&mut tx, ChildTable::Ingredients, id, &items).await?;
        }
        if let Some(items) = replacement(steps) {
            delete_children(&mut tx, ChildTable::Steps, id).await?;
            insert_children(&mut tx, ChildTable::Steps, id, &items).await?;
        }

        let recipe = hydrate(&mut tx, vec![row])
            .await?
            .pop()
            .ok_or(RepoError::NotFound)?;

        tx.commit().await?;
        Ok(recipe)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        // Child rows and favorites are removed by ON DELETE CASCADE.
        let res = sqlx::query("DELETE FROM meal_recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, name_filter: Option<&str>) -> Result<Vec<Recipe>, RepoError> {
        let mut conn = self.pool.acquire().await?;

        let rows = match name_filter {
            // Natural-language match: any word of the query, ranked by relevance.
            Some(name) => {
                sqlx::query_as::<_, RecipeRow>(
                    r#"
                    WITH q AS (
                        SELECT replace(plainto_tsquery('simple', $1)::text, '&', '|')::tsquery AS query
                    )
                    SELECT r.id, r.user_id, r.name, r.category, r.image_url, r.duration,
                           r.complexity, r.affordability, r.is_gluten_free, r.is_lactose_free,
                           r.is_vegan, r.created_at, r.updated_at
                      FROM meal_recipes r, q
                     WHERE to_tsvector('simple', r.name) @@ q.query
                     ORDER BY ts_rank(to_tsvector('simple', r.name), q.query) DESC, r.created_at
                    "#,
                )
                .bind(name)
                .fetch_all(&mut *conn)
                .await?
            }
            None => {
                sqlx::query_as::<_, RecipeRow>(
                    r#"
                    SELECT id, user_id, name, category, image_url, duration, complexity,
                           affordability, is_gluten_free, is_lactose_free, is_vegan,
                           created_at, updated_at
                      FROM meal_recipes
                     ORDER BY created_at, id
                    "#,
                )
                .fetch_all(&mut *conn)
                .await?
            }
        };

        hydrate(&mut conn, rows).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Recipe>, RepoError> {
        let mut conn = self.pool.acquire().await?;

        let row = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT id, user_id, name, category, image_url, duration, complexity, affordability,
                   is_gluten_free, is_lactose_free, is_vegan, created_at, updated_at
            FROM meal_recipes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => Ok(hydrate(&mut conn, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}
