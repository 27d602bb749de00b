use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        password::{hash_password, verify_against_dummy, verify_password},
        repo_types::{NewUser, User},
        session::{AuthError, JwtKeys},
    },
    db::RepoError,
    error::AppError,
    state::AppState,
};

pub(crate) const MAX_FIELD_LEN: usize = 100;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn validate_email(email: &str) -> Result<(), AppError> {
    if email.chars().count() > MAX_FIELD_LEN {
        return Err(AppError::Validation("email must be at most 100 characters".into()));
    }
    if !is_valid_email(email) {
        return Err(AppError::Validation("email is not a valid address".into()));
    }
    Ok(())
}

pub(crate) fn validate_username(username: &str) -> Result<(), AppError> {
    if username.chars().count() > MAX_FIELD_LEN {
        return Err(AppError::Validation("username must be at most 100 characters".into()));
    }
    Ok(())
}

pub(crate) fn email_conflict(e: RepoError) -> AppError {
    match e {
        RepoError::Conflict(_) => AppError::Conflict("email already exists".into()),
        other => other.into(),
    }
}

pub async fn register(st: &AppState, req: RegisterRequest) -> Result<User, AppError> {
    let username = req.username.trim().to_string();
    let email = normalize_email(&req.email);

    if username.is_empty() {
        return Err(AppError::Validation("username is required".into()));
    }
    if email.is_empty() {
        return Err(AppError::Validation("email is required".into()));
    }
    if req.password.is_empty() {
        return Err(AppError::Validation("password is required".into()));
    }
    validate_username(&username)?;
    validate_email(&email)?;

    let password_hash = hash_password(&req.password)?;

    let user = st
        .users
        .create(NewUser {
            username,
            email,
            password_hash,
            image_url: st.config.default_user_image_url.clone(),
        })
        .await
        .map_err(|e| {
            if matches!(e, RepoError::Conflict(_)) {
                warn!("email already registered");
            }
            email_conflict(e)
        })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Returns a signed token plus the account it was issued for.
pub async fn login(st: &AppState, req: LoginRequest) -> Result<(String, User), AppError> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("email and password are required".into()));
    }

    let user = match st.users.find_by_email(&email).await? {
        Some(u) => u,
        None => {
            verify_against_dummy(&req.password);
            warn!(email = %email, "login unknown email");
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    if !verify_password(&req.password, &user.password_hash) {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials.into());
    }

    let keys = JwtKeys::from_ref(st);
    let token = keys.issue(user.id, &user.username, user.token_version)?;

    info!(user_id = %user.id, "user logged in");
    Ok((token, user))
}
