use tracing::info;
use uuid::Uuid;

use crate::{
    auth::repo_types::User,
    db::RepoError,
    error::AppError,
    meals::{
        repo_types::Recipe,
        services::{get_meal, recipe_not_found},
    },
    state::AppState,
};

fn not_in_favorites() -> AppError {
    AppError::NotFound("meal recipe is not in favorites".into())
}

/// The recipe can vanish between the lookup and the insert.
fn favorite_store_error(e: RepoError) -> AppError {
    match e {
        RepoError::MissingReference(_) => recipe_not_found(),
        other => other.into(),
    }
}

/// Mark a recipe as favorite. Repeating the call is harmless.
pub async fn add_favorite(st: &AppState, identity: &User, recipe_id: Uuid) -> Result<Recipe, AppError> {
    let recipe = get_meal(st, recipe_id).await?;
    st.favorites
        .add(identity.id, recipe_id)
        .await
        .map_err(favorite_store_error)?;
    info!(user_id = %identity.id, %recipe_id, "favorite added");
    Ok(recipe)
}

pub async fn remove_favorite(st: &AppState, identity: &User, recipe_id: Uuid) -> Result<(), AppError> {
    if !st.favorites.contains(identity.id, recipe_id).await? {
        return Err(not_in_favorites());
    }
    // A concurrent removal may win the race; the pair is gone either way.
    if !st.favorites.remove(identity.id, recipe_id).await? {
        return Err(not_in_favorites());
    }
    info!(user_id = %identity.id, %recipe_id, "favorite removed");
    Ok(())
}

pub async fn list_favorites(st: &AppState, identity: &User) -> Result<Vec<Recipe>, AppError> {
    Ok(st.favorites.list(identity.id).await?)
}
