//! Region console handlers: OpenConsole, CloseConsole.

use super::regions::controlled_region;
use super::{Context, Handler};
use crate::error::{HandlerError, HandlerResult};
use async_trait::async_trait;
use grid_proto::ClientRequest;
use tracing::{debug, info};

/// Handler for OpenConsole. A session holds at most one console; opening a
/// new one closes the old.
pub struct OpenConsoleHandler;

#[async_trait]
impl Handler for OpenConsoleHandler {
    async fn handle(&self, ctx: &Context, req: &ClientRequest) -> HandlerResult {
        let (region, host) = controlled_region(ctx, req)?;
        info!(region = %region.uuid, host = host.id, "requesting region console");

        let console = ctx
            .grid
            .hosts
            .open_console(&region, &host)
            .await
            .map_err(HandlerError::Backend)?;
        if let Some(previous) = ctx.console.replace(console) {
            debug!(region = %previous.region(), "closing replaced console");
            previous.close().await;
        }
        Ok("Console opened".to_string())
    }
}

/// Handler for CloseConsole. Always succeeds.
pub struct CloseConsoleHandler;

#[async_trait]
impl Handler for CloseConsoleHandler {
    async fn handle(&self, ctx: &Context, _req: &ClientRequest) -> HandlerResult {
        if let Some(console) = ctx.console.take() {
            debug!(region = %console.region(), "closing console");
            console.close().await;
        }
        Ok("Console closed".to_string())
    }
}
