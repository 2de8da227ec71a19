//! DeleteJob handler.

use super::{Context, SessionHandler};
use crate::error::{HandlerError, HandlerResult};
use crate::session::Visibility;
use async_trait::async_trait;
use grid_proto::{ClientRequest, IdPayload};
use tracing::info;

pub struct DeleteJobHandler;

#[async_trait]
impl SessionHandler for DeleteJobHandler {
    async fn handle(
        &self,
        ctx: &Context,
        _visibility: &Visibility,
        req: &ClientRequest,
    ) -> HandlerResult {
        let IdPayload { id } = req.payload()?;
        if !ctx.grid.store.remove_job(id) {
            return Err(HandlerError::JobDoesNotExist);
        }
        info!(job = id, "job deleted");
        Ok("Job Deleted".to_string())
    }
}
