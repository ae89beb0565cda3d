//! Account Handlers
//!
//! Registration, login and self-service profile management. Every route
//! except register and login acts on the account carried by the bearer token.

use axum::{extract::State, http::StatusCode, response::Json, Extension};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::state::AppState;
use super::utils::JsonBody;
use crate::auth::{hash_password, verify_password, verify_unknown_account, AuthUser};
use crate::errors::{AppError, ValidationErrorExt};
use crate::models::User;
use crate::validation;

/// Credentials for register and login
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CredentialsRequest {
    fn into_parts(self) -> Result<(String, String), AppError> {
        let username = self
            .username
            .ok_or_else(|| AppError::invalid("username", "username is required"))?;
        let password = self
            .password
            .ok_or_else(|| AppError::invalid("password", "password is required"))?;
        Ok((username.trim().to_string(), password))
    }
}

/// Token plus the account it was issued for
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub message: String,
    pub user: serde_json::Value,
    pub token: String,
}

fn issue_token(state: &AppState, user: &User) -> Result<String, AppError> {
    state
        .jwt
        .issue(user)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("token signing failed: {e:?}")))
}

async fn hash_off_thread(password: String) -> Result<String, AppError> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;
    Ok(hash)
}

/// POST /api/auth/register - Create an account and sign a token for it
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CredentialsRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let (username, password) = req.into_parts()?;
    validation::validate_username(&username).map_validation_err("username")?;
    validation::validate_password(&password).map_validation_err("password")?;

    let hash = hash_off_thread(password).await?;
    let user = state
        .with_db(move |db| db.create_user(&username, &hash))
        .await?;
    let token = issue_token(&state, &user)?;

    info!(user_id = user.id, username = %user.username, "account registered");
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            message: "User registered successfully".to_string(),
            user: serde_json::to_value(&user)?,
            token,
        }),
    ))
}

/// POST /api/auth/login - Exchange credentials for a token
///
/// Unknown handles and wrong passwords produce the same error.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CredentialsRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let (username, password) = req.into_parts()?;

    let found = state
        .with_db(move |db| db.find_user_by_username(&username))
        .await?;

    // Unknown handles still pay for a hash check so timing does not reveal them
    let hash = found.as_ref().map(|user| user.password_hash.clone());
    let matches = tokio::task::spawn_blocking(move || match hash {
        Some(hash) => verify_password(&password, &hash),
        None => verify_unknown_account(&password),
    })
    .await?;
    let user = match found {
        Some(user) if matches => user,
        _ => return Err(AppError::InvalidCredentials),
    };

    let token = issue_token(&state, &user)?;
    info!(user_id = user.id, "login succeeded");
    Ok(Json(SessionResponse {
        message: "Login successful".to_string(),
        user: serde_json::to_value(&user)?,
        token,
    }))
}

/// GET /api/auth/me - Current account
pub async fn me(Extension(AuthUser(user)): Extension<AuthUser>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "user": user }))
}

/// Profile changes; omitted fields stay as they are
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// PUT /api/auth/me - Change handle and/or password
pub async fn update_me(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.username.is_none() && req.password.is_none() {
        return Err(AppError::invalid("body", "No update fields provided"));
    }

    let username = match req.username {
        Some(name) => {
            let name = name.trim().to_string();
            validation::validate_username(&name).map_validation_err("username")?;
            Some(name)
        }
        None => None,
    };
    let hash = match req.password {
        Some(password) => {
            validation::validate_password(&password).map_validation_err("password")?;
            Some(hash_off_thread(password).await?)
        }
        None => None,
    };

    let user_id = user.id;
    let updated = state
        .with_db(move |db| db.update_user(user_id, username.as_deref(), hash.as_deref()))
        .await?
        .ok_or(AppError::UserNotFound(user_id))?;

    Ok(Json(serde_json::json!({
        "message": "Profile updated",
        "user": updated,
    })))
}

/// DELETE /api/auth/me - Remove the account with all its todos and turns
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = user.id;
    let deleted = state.with_db(move |db| db.delete_user(user_id)).await?;
    if !deleted {
        return Err(AppError::UserNotFound(user_id));
    }

    info!(user_id, "account deleted");
    Ok(Json(serde_json::json!({ "success": true })))
}
