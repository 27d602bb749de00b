use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Header row of a recipe (`meal_recipes`).
#[derive(Debug, Clone, FromRow)]
pub struct RecipeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub category: String,
    pub image_url: String,
    pub duration: String,
    pub complexity: String,
    pub affordability: String,
    pub is_gluten_free: bool,
    pub is_lactose_free: bool,
    pub is_vegan: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Child row shared by `meal_ingredients` and `meal_recipe_steps`.
#[derive(Debug, Clone, FromRow)]
pub struct ChildRow {
    pub meal_recipe_id: Uuid,
    pub body: String,
}

/// The full aggregate: header plus its ordered ingredients and steps.
#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub category: String,
    pub image_url: String,
    pub duration: String,
    pub complexity: String,
    pub affordability: String,
    pub is_gluten_free: bool,
    pub is_lactose_free: bool,
    pub is_vegan: bool,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Recipe {
    pub fn from_parts(row: RecipeRow, ingredients: Vec<String>, steps: Vec<String>) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            category: row.category,
            image_url: row.image_url,
            duration: row.duration,
            complexity: row.complexity,
            affordability: row.affordability,
            is_gluten_free: row.is_gluten_free,
            is_lactose_free: row.is_lactose_free,
            is_vegan: row.is_vegan,
            ingredients,
            steps,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Header fields supplied when a recipe is created.
#[derive(Debug, Clone)]
pub struct RecipeHeader {
    pub name: String,
    pub category: String,
    pub image_url: String,
    pub duration: String,
    pub complexity: String,
    pub affordability: String,
    pub is_gluten_free: bool,
    pub is_lactose_free: bool,
    pub is_vegan: bool,
}

/// Partial header update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct RecipePatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub duration: Option<String>,
    pub complexity: Option<String>,
    pub affordability: Option<String>,
    pub is_gluten_free: Option<bool>,
    pub is_lactose_free: Option<bool>,
    pub is_vegan: Option<bool>,
}

impl RecipePatch {
    pub fn apply(self, row: &mut RecipeRow) {
        if let Some(v) = self.name {
            row.name = v;
        }
        if let Some(v) = self.category {
            row.category = v;
        }
        if let Some(v) = self.image_url {
            row.image_url = v;
        }
        if let Some(v) = self.duration {
            row.duration = v;
        }
        if let Some(v) = self.complexity {
            row.complexity = v;
        }
        if let Some(v) = self.affordability {
            row.affordability = v;
        }
        if let Some(v) = self.is_gluten_free {
            row.is_gluten_free = v;
        }
        if let Some(v) = self.is_lactose_free {
            row.is_lactose_free = v;
        }
        if let Some(v) = self.is_vegan {
            row.is_vegan = v;
        }
    }
}

/// A child list only replaces the stored one when it has at least one entry.
pub fn replacement(list: Option<Vec<String>>) -> Option<Vec<String>> {
    list.filter(|items| !items.is_empty())
}
