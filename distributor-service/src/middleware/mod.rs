mod auth;

pub use auth::{create_token, AuthUser, Claims};
