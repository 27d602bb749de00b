use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        guard::{can_delete, can_mutate, ensure},
        repo_types::User,
    },
    db::RepoError,
    error::AppError,
    images::services::{upload_image, UploadItem},
    meals::{
        dto::{CreateMealRequest, UpdateMealRequest},
        repo_types::{Recipe, RecipePatch},
    },
    state::AppState,
};

pub(crate) fn recipe_not_found() -> AppError {
    AppError::NotFound("meal recipe not found".into())
}

fn missing_as_not_found(e: RepoError) -> AppError {
    match e {
        RepoError::NotFound => recipe_not_found(),
        other => other.into(),
    }
}

pub async fn get_meal(st: &AppState, id: Uuid) -> Result<Recipe, AppError> {
    st.recipes.get(id).await?.ok_or_else(recipe_not_found)
}

pub async fn list_meals(st: &AppState, name: Option<&str>) -> Result<Vec<Recipe>, AppError> {
    let filter = name.map(str::trim).filter(|n| !n.is_empty());
    Ok(st.recipes.list(filter).await?)
}

/// Upload first; the aggregate is only written once the image URL exists.
pub async fn create_meal(
    st: &AppState,
    identity: &User,
    req: CreateMealRequest,
    image: UploadItem,
) -> Result<Recipe, AppError> {
    let image_url = upload_image(st, image).await?;
    let (header, ingredients, steps) = req.into_parts(image_url);
    let recipe = st
        .recipes
        .create(identity.id, header, &ingredients, &steps)
        .await?;
    info!(recipe_id = %recipe.id, user_id = %identity.id, "meal recipe created");
    Ok(recipe)
}

pub async fn update_meal(
    st: &AppState,
    identity: &User,
    id: Uuid,
    req: UpdateMealRequest,
) -> Result<Recipe, AppError> {
    let current = get_meal(st, id).await?;
    let allowed = can_mutate(identity, &current);
    if !allowed {
        warn!(recipe_id = %id, user_id = %identity.id, "update denied");
    }
    ensure(allowed)?;

    let (patch, ingredients, steps) = req.into_parts()?;
    let recipe = st
        .recipes
        .replace(id, patch, ingredients, steps)
        .await
        .map_err(missing_as_not_found)?;
    info!(recipe_id = %id, "meal recipe updated");
    Ok(recipe)
}

pub async fn update_meal_image(
    st: &AppState,
    identity: &User,
    id: Uuid,
    image: UploadItem,
) -> Result<Recipe, AppError> {
    let current = get_meal(st, id).await?;
    ensure(can_mutate(identity, &current))?;

    let image_url = upload_image(st, image).await?;
    let patch = RecipePatch {
        image_url: Some(image_url),
        ..Default::default()
    };
    let recipe = st
        .recipes
        .replace(id, patch, None, None)
        .await
        .map_err(missing_as_not_found)?;
    Ok(recipe)
}

pub async fn delete_meal(st: &AppState, identity: &User, id: Uuid) -> Result<(), AppError> {
    let current = get_meal(st, id).await?;
    let allowed = can_delete(identity, &current);
    if !allowed {
        warn!(recipe_id = %id, user_id = %identity.id, "delete denied");
    }
    ensure(allowed)?;
    st.recipes.delete(id).await.map_err(missing_as_not_found)?;
    info!(recipe_id = %id, user_id = %identity.id, role = identity.role.as_str(), "meal recipe deleted");
    Ok(())
}
