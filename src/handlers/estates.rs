//! SetEstate: move a region into another estate.

use super::{Context, SessionHandler};
use crate::error::{HandlerError, HandlerResult};
use crate::session::Visibility;
use async_trait::async_trait;
use grid_proto::{ClientRequest, IdPayload, RegionPayload};
use tracing::info;

/// Handler for SetEstate. Admin only.
///
/// The move itself runs on its own task; the client hears success as soon
/// as it is requested. The estate and region updates that follow are what
/// confirm it.
pub struct SetEstateHandler;

#[async_trait]
impl SessionHandler for SetEstateHandler {
    async fn handle(
        &self,
        ctx: &Context,
        _visibility: &Visibility,
        req: &ClientRequest,
    ) -> HandlerResult {
        ctx.require_admin()?;
        let IdPayload { id: estate } = req.payload()?;
        let RegionPayload { region } = req.payload()?;

        let store = &ctx.grid.store;
        let region = store.region(region).ok_or(HandlerError::RegionDoesNotExist)?;
        let estate = store.estate(estate).ok_or(HandlerError::EstateDoesNotExist)?;

        info!(region = %region.uuid, estate = estate.id, "requesting estate move");
        let store = store.clone();
        tokio::spawn(async move {
            store.move_region_to_estate(region.uuid, estate.id);
        });
        Ok("Region Flagged for new estate".to_string())
    }
}
