use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// Service account. Password-reset email delivery is handled outside this
/// service; only the token fields live here.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token_expires_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
