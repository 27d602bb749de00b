use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::{get, post},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    favorites::services,
    meals::dto::MealResponse,
    response::{ApiResponse, ApiResult},
    state::AppState,
};

pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/meals/:id/favorites", post(add_favorite).delete(remove_favorite))
        .route("/users/favorites", get(list_favorites))
}

#[instrument(skip(state, user))]
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<MealResponse> {
    let Path(id) = id?;
    let recipe = services::add_favorite(&state, &user, id).await?;
    Ok(ApiResponse::ok(recipe.into()))
}

#[instrument(skip(state, user))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<String> {
    let Path(id) = id?;
    services::remove_favorite(&state, &user, id).await?;
    Ok(ApiResponse::ok("meal recipe removed from favorites".to_string()))
}

#[instrument(skip_all)]
pub async fn list_favorites(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Vec<MealResponse>> {
    let recipes = services::list_favorites(&state, &user).await?;
    Ok(ApiResponse::ok(recipes.into_iter().map(Into::into).collect()))
}
