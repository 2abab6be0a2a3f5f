//! User management and token issuance.
//!
//! Registration and deletion are admin-only; the very first registration is
//! open and becomes the admin account, so a fresh deployment can bootstrap
//! itself.

use anyhow::anyhow;
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::{doc, DateTime};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{LoginRequest, RegisterRequest, TokenResponse, UserResponse};
use crate::middleware::{create_token, AuthUser};
use crate::models::{Role, User};
use crate::services::is_duplicate_key_error;
use crate::startup::AppState;

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalError(anyhow!("password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub async fn register(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    payload.validate()?;

    let user_count = state.db.users().count_documents(doc! {}, None).await?;
    let role = if user_count == 0 {
        // Bootstrap: the first account is always the admin.
        Role::Admin
    } else {
        match caller {
            Some(caller) => {
                caller.require_admin()?;
                payload.role.unwrap_or(Role::User)
            }
            None => {
                return Err(AppError::AuthError(anyhow!(
                    "registration requires an administrator token"
                )));
            }
        }
    };

    let now = DateTime::now();
    let user = User {
        id: Uuid::new_v4(),
        username: payload.username,
        password_hash: hash_password(&payload.password)?,
        role,
        reset_token_hash: None,
        reset_token_expires_at: None,
        created_at: now,
        updated_at: now,
    };

    state.db.users().insert_one(&user, None).await.map_err(|e| {
        if is_duplicate_key_error(&e) {
            AppError::Conflict(anyhow!("username '{}' is already taken", user.username))
        } else {
            AppError::from(e)
        }
    })?;

    tracing::info!(user_id = %user.id, username = %user.username, role = ?user.role, "User registered");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    payload.validate()?;

    let user = state
        .db
        .users()
        .find_one(doc! { "username": &payload.username }, None)
        .await?
        .ok_or_else(|| AppError::AuthError(anyhow!("invalid username or password")))?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(AppError::AuthError(anyhow!("invalid username or password")));
    }

    let token = create_token(
        &user,
        state.config.auth.jwt_secret.expose_secret(),
        state.config.auth.token_expiry_hours,
    )?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(TokenResponse {
        token,
        role: user.role,
        expires_in_hours: state.config.auth.token_expiry_hours,
    }))
}

pub async fn delete_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    caller.require_admin()?;

    if caller.user_id == user_id {
        return Err(AppError::BadRequest(anyhow!(
            "administrators cannot delete their own account"
        )));
    }

    let result = state
        .db
        .users()
        .delete_one(doc! { "_id": user_id.to_string() }, None)
        .await?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound(anyhow!("user {} not found", user_id)));
    }

    tracing::info!(user_id = %user_id, deleted_by = %caller.user_id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
