//! Client identity resolution.
//!
//! The WebSocket handshake carries a bearer token; an [`IdentityProvider`]
//! maps it to a user id. Token issuance happens elsewhere.

use grid_proto::UserId;

use crate::config::TokenBlock;
use crate::security::password::verify_password;

/// Resolves a bearer token to the account it authenticates.
pub trait IdentityProvider: Send + Sync {
    fn authenticate(&self, token: &str) -> Option<UserId>;
}

/// Tokens listed in the configuration file.
///
/// A token value starting with `$argon2` is treated as a hash and verified;
/// anything else is compared as plaintext.
pub struct StaticTokens {
    tokens: Vec<TokenBlock>,
}

impl StaticTokens {
    pub fn new(tokens: Vec<TokenBlock>) -> Self {
        Self { tokens }
    }
}

impl IdentityProvider for StaticTokens {
    fn authenticate(&self, token: &str) -> Option<UserId> {
        if token.is_empty() {
            return None;
        }
        self.tokens
            .iter()
            .find(|block| {
                if block.token.starts_with("$argon2") {
                    verify_password(token, &block.token)
                } else {
                    block.token == token
                }
            })
            .map(|block| block.user)
    }
}
