//! SetPassword handler.

use super::{Context, Handler};
use crate::error::{HandlerError, HandlerResult};
use crate::security::password::hash_password;
use async_trait::async_trait;
use grid_proto::{ClientRequest, PasswordPayload};
use tracing::{info, warn};

/// Handler for SetPassword. Users may change their own password; admins
/// may change anyone's.
pub struct SetPasswordHandler;

#[async_trait]
impl Handler for SetPasswordHandler {
    async fn handle(&self, ctx: &Context, req: &ClientRequest) -> HandlerResult {
        let payload: PasswordPayload = req.payload()?;
        let user = payload.user;

        if user != ctx.user && !ctx.is_admin {
            return Err(HandlerError::PermissionDenied);
        }
        if payload.password.is_empty() {
            return Err(HandlerError::BlankPassword);
        }
        if ctx.grid.store.user(user).is_none() {
            return Err(HandlerError::UserDoesNotExist);
        }

        let hash = tokio::task::spawn_blocking(move || hash_password(&payload.password))
            .await
            .map_err(|e| HandlerError::Internal(e.to_string()))?
            .map_err(|e| {
                warn!(%user, error = %e, "password hashing failed");
                HandlerError::Internal(e.to_string())
            })?;

        ctx.grid.store.set_password(user, hash);
        info!(%user, "password changed");
        Ok("Password Set Successfully".to_string())
    }
}
