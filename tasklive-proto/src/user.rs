//! User and authentication types, matching the backend's JSON shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user as returned by the user listing and profile endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Server-assigned identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Display name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Avatar URL (may be empty).
    #[serde(default)]
    pub avatar: String,
    /// Whether the user currently has an active session.
    #[serde(default)]
    pub is_online: bool,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
    /// Last profile update time.
    pub updated_at: DateTime<Utc>,
}

/// The slim user shape embedded in authentication responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Server-assigned identifier.
    pub id: String,
    /// Display name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Avatar URL (may be empty).
    #[serde(default)]
    pub avatar: String,
}

/// Successful login/register response: a bearer token plus the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token for subsequent API calls and the push channel.
    pub token: String,
    /// The authenticated user's profile.
    pub user: AuthUser,
}

/// Login form data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginForm {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterForm {
    /// Desired display name.
    pub username: String,
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}
