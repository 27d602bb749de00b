use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    images::form::MultipartForm,
    response::{ApiResponse, ApiResult},
    state::AppState,
    users::{
        dto::{ChangePasswordRequest, UpdateProfileRequest, UserResponse},
        services,
    },
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(profile).put(update_profile))
        .route("/users/change-password", put(change_password))
}

pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route("/users/image", put(update_image))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
}

#[instrument(skip_all)]
pub async fn profile(AuthUser(user): AuthUser) -> ApiResult<UserResponse> {
    Ok(ApiResponse::ok(user.into()))
}

#[instrument(skip_all)]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ApiResult<UserResponse> {
    let Json(payload) = payload?;
    let user = services::update_profile(&state, &user, payload).await?;
    Ok(ApiResponse::ok(user.into()))
}

#[instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<UserResponse> {
    let Json(payload) = payload?;
    let user = services::change_password(&state, &user, payload).await?;
    Ok(ApiResponse::ok(user.into()))
}

#[instrument(skip_all)]
pub async fn update_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mp: Multipart,
) -> ApiResult<UserResponse> {
    let mut form = MultipartForm::read(mp).await?;
    let file = form.require_file("image")?;
    let user = services::update_image(&state, &user, file).await?;
    Ok(ApiResponse::ok(user.into()))
}
