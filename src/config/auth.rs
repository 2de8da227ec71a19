//! Static bearer token configuration.

use grid_proto::User;
use serde::Deserialize;
use uuid::Uuid;

/// Client authentication configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Accepted tokens.
    #[serde(default)]
    pub token: Vec<TokenBlock>,
    /// Accounts created at startup when missing.
    #[serde(default)]
    pub user: Vec<UserBlock>,
}

/// One accepted bearer token and the account it logs in as.
#[derive(Clone, Deserialize)]
pub struct TokenBlock {
    /// Token presented as `?token=` on the WebSocket URL.
    pub token: String,
    /// Account the token authenticates.
    pub user: Uuid,
}

impl std::fmt::Debug for TokenBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBlock")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// An account seeded into the store at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct UserBlock {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Above 249 is an administrator.
    #[serde(default)]
    pub access_level: i32,
}

impl UserBlock {
    pub fn to_user(&self) -> User {
        User {
            user_id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            access_level: self.access_level,
            suspended: false,
        }
    }
}
