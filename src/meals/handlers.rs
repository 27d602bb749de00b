use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    handler::Handler,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    images::form::MultipartForm,
    meals::{
        dto::{CreateMealRequest, MealResponse, SearchQuery, UpdateMealRequest},
        services,
    },
    response::{ApiResponse, ApiResult},
    state::AppState,
};

// --- public router ---

const UPLOAD_LIMIT: usize = 10 * 1024 * 1024; // 10MB

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/meals",
            get(list_meals).post(create_meal.layer(DefaultBodyLimit::max(UPLOAD_LIMIT))),
        )
        .route("/meals/:id", get(get_meal).put(update_meal).delete(delete_meal))
        .route(
            "/meals/:id/image",
            put(update_meal_image).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
}

// --- handlers ---

#[instrument(skip_all)]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Vec<MealResponse>> {
    let Query(query) = query?;
    let recipes = services::list_meals(&state, query.name.as_deref()).await?;
    Ok(ApiResponse::ok(recipes.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, _user))]
pub async fn get_meal(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<MealResponse> {
    let Path(id) = id?;
    let recipe = services::get_meal(&state, id).await?;
    Ok(ApiResponse::ok(recipe.into()))
}

/// multipart: name, category, duration, complexity, affordability,
/// is_gluten_free, is_lactose_free, is_vegan, ingredients[], steps[], image
#[instrument(skip_all)]
pub async fn create_meal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mp: Multipart,
) -> ApiResult<MealResponse> {
    let mut form = MultipartForm::read(mp).await?;
    let req = CreateMealRequest::from_form(&form)?;
    let image = form.require_file("image")?;
    let recipe = services::create_meal(&state, &user, req, image).await?;
    Ok(ApiResponse::ok(recipe.into()))
}

#[instrument(skip(state, user, payload))]
pub async fn update_meal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateMealRequest>, JsonRejection>,
) -> ApiResult<MealResponse> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let recipe = services::update_meal(&state, &user, id, payload).await?;
    Ok(ApiResponse::ok(recipe.into()))
}

#[instrument(skip_all)]
pub async fn update_meal_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
    mp: Multipart,
) -> ApiResult<MealResponse> {
    let Path(id) = id?;
    let mut form = MultipartForm::read(mp).await?;
    let image = form.require_file("image")?;
    let recipe = services::update_meal_image(&state, &user, id, image).await?;
    Ok(ApiResponse::ok(recipe.into()))
}

#[instrument(skip(state, user))]
pub async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<String> {
    let Path(id) = id?;
    services::delete_meal(&state, &user, id).await?;
    Ok(ApiResponse::ok("meal recipe deleted".to_string()))
}
