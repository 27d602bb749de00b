use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::services::MAX_FIELD_LEN,
    error::AppError,
    images::form::MultipartForm,
    meals::repo_types::{Recipe, RecipeHeader, RecipePatch},
};

/// Boolean spellings accepted from forms and JSON strings.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn flag(field: &str, raw: &str) -> Result<bool, AppError> {
    parse_flag(raw).ok_or_else(|| AppError::BadRequest(format!("{field} must be a boolean")))
}

/// List entries are stored exactly as sent; a blank entry is refused, not dropped.
fn check_items(field: &str, items: &[String]) -> Result<(), AppError> {
    if items.iter().any(|item| item.trim().is_empty()) {
        return Err(AppError::Validation(format!("{field} must not contain blank entries")));
    }
    Ok(())
}

fn check_name(name: &str) -> Result<(), AppError> {
    if name.chars().count() > MAX_FIELD_LEN {
        return Err(AppError::Validation("name must be at most 100 characters".into()));
    }
    Ok(())
}

/// Validated multipart create request. The image file is taken separately.
#[derive(Debug, Clone)]
pub struct CreateMealRequest {
    pub name: String,
    pub category: String,
    pub duration: String,
    pub complexity: String,
    pub affordability: String,
    pub is_gluten_free: bool,
    pub is_lactose_free: bool,
    pub is_vegan: bool,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
}

impl CreateMealRequest {
    pub fn from_form(form: &MultipartForm) -> Result<Self, AppError> {
        let required = |field: &str| {
            form.text(field)
                .ok_or_else(|| AppError::Validation(format!("{field} is required")))
        };

        let name = required("name")?;
        check_name(&name)?;
        let category = required("category")?;
        let duration = required("duration")?;
        let complexity = required("complexity")?;
        let affordability = required("affordability")?;
        let is_gluten_free = flag("is_gluten_free", &required("is_gluten_free")?)?;
        let is_lactose_free = flag("is_lactose_free", &required("is_lactose_free")?)?;
        let is_vegan = flag("is_vegan", &required("is_vegan")?)?;

        let ingredients = form.list("ingredients");
        if ingredients.is_empty() {
            return Err(AppError::Validation("ingredients is required".into()));
        }
        check_items("ingredients", &ingredients)?;
        let steps = form.list("steps");
        if steps.is_empty() {
            return Err(AppError::Validation("steps is required".into()));
        }
        check_items("steps", &steps)?;

        Ok(Self {
            name,
            category,
            duration,
            complexity,
            affordability,
            is_gluten_free,
            is_lactose_free,
            is_vegan,
            ingredients,
            steps,
        })
    }

    pub fn into_parts(self, image_url: String) -> (RecipeHeader, Vec<String>, Vec<String>) {
        let header = RecipeHeader {
            name: self.name,
            category: self.category,
            image_url,
            duration: self.duration,
            complexity: self.complexity,
            affordability: self.affordability,
            is_gluten_free: self.is_gluten_free,
            is_lactose_free: self.is_lactose_free,
            is_vegan: self.is_vegan,
        };
        (header, self.ingredients, self.steps)
    }
}

/// JSON flag that arrives either as a bool or as one of its string spellings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FlexBool {
    Bool(bool),
    Text(String),
}

impl FlexBool {
    /// `Ok(None)` for an empty string, which means "unchanged".
    fn resolve(self, field: &str) -> Result<Option<bool>, AppError> {
        match self {
            FlexBool::Bool(b) => Ok(Some(b)),
            FlexBool::Text(s) if s.trim().is_empty() => Ok(None),
            FlexBool::Text(s) => flag(field, &s).map(Some),
        }
    }
}

/// Partial update; absent or empty fields leave the stored value alone.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMealRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub duration: Option<String>,
    pub complexity: Option<String>,
    pub affordability: Option<String>,
    pub is_gluten_free: Option<FlexBool>,
    pub is_lactose_free: Option<FlexBool>,
    pub is_vegan: Option<FlexBool>,
    pub ingredients: Option<Vec<String>>,
    pub steps: Option<Vec<String>>,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn present_flag(value: Option<FlexBool>, field: &str) -> Result<Option<bool>, AppError> {
    match value {
        Some(v) => v.resolve(field),
        None => Ok(None),
    }
}

/// An empty list means "unchanged"; anything else replaces the stored list verbatim.
fn present_list(field: &str, value: Option<Vec<String>>) -> Result<Option<Vec<String>>, AppError> {
    if let Some(items) = &value {
        check_items(field, items)?;
    }
    Ok(value)
}

impl UpdateMealRequest {
    pub fn into_parts(
        self,
    ) -> Result<(RecipePatch, Option<Vec<String>>, Option<Vec<String>>), AppError> {
        let name = present(self.name);
        if let Some(name) = &name {
            check_name(name)?;
        }

        let patch = RecipePatch {
            name,
            category: present(self.category),
            image_url: None,
            duration: present(self.duration),
            complexity: present(self.complexity),
            affordability: present(self.affordability),
            is_gluten_free: present_flag(self.is_gluten_free, "is_gluten_free")?,
            is_lactose_free: present_flag(self.is_lactose_free, "is_lactose_free")?,
            is_vegan: present_flag(self.is_vegan, "is_vegan")?,
        };
        let ingredients = present_list("ingredients", self.ingredients)?;
        let steps = present_list("steps", self.steps)?;
        Ok((patch, ingredients, steps))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MealResponse {
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

impl From<Recipe> for MealResponse {
    fn from(r: Recipe) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            name: r.name,
            category: r.category,
            image_url: r.image_url,
            duration: r.duration,
            complexity: r.complexity,
            affordability: r.affordability,
            is_gluten_free: r.is_gluten_free,
            is_lactose_free: r.is_lactose_free,
            is_vegan: r.is_vegan,
            ingredients: r.ingredients,
            steps: r.steps,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
