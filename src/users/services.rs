use tracing::info;

use crate::{
    auth::{
        password::hash_password,
        repo_types::{ProfileChanges, User},
        services::{email_conflict, normalize_email, validate_email, validate_username},
    },
    error::AppError,
    images::services::{upload_image, UploadItem},
    state::AppState,
    users::dto::{ChangePasswordRequest, UpdateProfileRequest},
};

/// Edit username and/or email. A new email invalidates every token issued so far.
pub async fn update_profile(
    st: &AppState,
    identity: &User,
    req: UpdateProfileRequest,
) -> Result<User, AppError> {
    let username = Some(req.username.trim().to_string()).filter(|s| !s.is_empty());
    let email = Some(normalize_email(&req.email)).filter(|s| !s.is_empty());

    if let Some(name) = &username {
        validate_username(name)?;
    }
    if let Some(addr) = &email {
        validate_email(addr)?;
    }

    let changes_email = email.is_some();
    let user = st
        .users
        .update_profile(identity.id, ProfileChanges { username, email })
        .await
        .map_err(email_conflict)?;

    if changes_email {
        info!(user_id = %user.id, epoch = user.token_version, "email changed, tokens revoked");
    }
    Ok(user)
}

pub async fn change_password(
    st: &AppState,
    identity: &User,
    req: ChangePasswordRequest,
) -> Result<User, AppError> {
    if req.password.is_empty() {
        return Err(AppError::Validation("password is required".into()));
    }
    let hash = hash_password(&req.password)?;
    let user = st.users.update_password(identity.id, &hash).await?;
    info!(user_id = %user.id, epoch = user.token_version, "password changed, tokens revoked");
    Ok(user)
}

pub async fn update_image(st: &AppState, identity: &User, file: UploadItem) -> Result<User, AppError> {
    let url = upload_image(st, file).await?;
    let user = st.users.update_image(identity.id, &url).await?;
    Ok(user)
}
