//! Backend API payload types

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Permission names granted to this user. Absent in older payloads.
    #[serde(default)]
    pub permissions: HashSet<String>,
}

impl User {
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.contains(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

/// Successful register/login response.
///
/// Newer backends return the bearer credential as `access_token`; some
/// deployments still send a plain `token` field.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub user: User,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl AuthPayload {
    /// The bearer credential, preferring `access_token`.
    pub fn bearer_token(&self) -> Option<&str> {
        self.access_token.as_deref().or(self.token.as_deref())
    }
}

/// Partial profile update. Only the populated fields are sent, and the
/// backend echoes back the fields it changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// User-scoped configuration resource. The typed fields are the ones the
/// dashboard knows about; everything else passes through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
