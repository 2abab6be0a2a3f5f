//! Token authentication.
//!
//! Every route except health, metrics and login requires a bearer token;
//! the `role` claim gates user management. Applied uniformly to billing and
//! inventory mutations as well, not just auth-adjacent endpoints.

use anyhow::anyhow;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{Role, User};
use crate::startup::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated caller extracted from the Authorization header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role != Role::Admin {
            return Err(AppError::Forbidden(anyhow!(
                "administrator role required"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::AuthError(anyhow!("missing Authorization header")))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::AuthError(anyhow!("expected a bearer token")))?;

        let key = DecodingKey::from_secret(
            state.config.auth.jwt_secret.expose_secret().as_bytes(),
        );
        let token_data = decode::<Claims>(token, &key, &Validation::default())?;

        let user_id = Uuid::parse_str(&token_data.claims.sub)
            .map_err(|_| AppError::AuthError(anyhow!("malformed subject claim")))?;

        Ok(AuthUser {
            user_id,
            username: token_data.claims.username,
            role: token_data.claims.role,
        })
    }
}

/// Issue a signed, time-limited token carrying the user's role claim.
pub fn create_token(
    user: &User,
    jwt_secret: &str,
    expiry_hours: i64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role,
        iat: now.timestamp(),
        exp: (now + Duration::hours(expiry_hours)).timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::DateTime;

    #[test]
    fn issued_token_round_trips_role_claim() {
        let now = DateTime::now();
        let user = User {
            id: Uuid::new_v4(),
            username: "owner".to_string(),
            password_hash: "unused".to_string(),
            role: Role::Admin,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        };

        let token = create_token(&user, "test-secret", 1).expect("token");
        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .expect("decode");

        assert_eq!(decoded.claims.sub, user.id.to_string());
        assert_eq!(decoded.claims.role, Role::Admin);
    }
}
