//! Host registration handlers: AddHost, RemoveHost.

use super::{Context, Handler};
use crate::error::{HandlerError, HandlerResult};
use async_trait::async_trait;
use grid_proto::{AddressPayload, ClientRequest, IdPayload};
use tracing::info;

/// Handler for AddHost. Admin only; the gateway's answer is passed through.
pub struct AddHostHandler;

#[async_trait]
impl Handler for AddHostHandler {
    async fn handle(&self, ctx: &Context, req: &ClientRequest) -> HandlerResult {
        ctx.require_admin()?;
        let AddressPayload { address } = req.payload()?;

        info!(%address, "requesting add host");
        ctx.grid
            .hosts
            .add_host(&address)
            .await
            .map_err(HandlerError::Backend)
    }
}

/// Handler for RemoveHost.
pub struct RemoveHostHandler;

#[async_trait]
impl Handler for RemoveHostHandler {
    async fn handle(&self, ctx: &Context, req: &ClientRequest) -> HandlerResult {
        ctx.require_admin()?;
        let IdPayload { id } = req.payload()?;

        info!(host = id, "requesting remove host");
        let host = ctx
            .grid
            .store
            .host(id)
            .ok_or(HandlerError::HostDoesNotExist)?;
        ctx.grid
            .hosts
            .remove_host(&host)
            .await
            .map_err(HandlerError::Backend)
    }
}
