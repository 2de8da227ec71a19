//! Region handlers: SetLocation, StartRegion, KillRegion.

use super::{Context, Handler};
use crate::error::{HandlerError, HandlerResult};
use async_trait::async_trait;
use grid_proto::{ClientRequest, Host, LocationPayload, Region, RegionPayload};
use tracing::info;

/// Handler for SetLocation. Admin only.
pub struct SetLocationHandler;

#[async_trait]
impl Handler for SetLocationHandler {
    async fn handle(&self, ctx: &Context, req: &ClientRequest) -> HandlerResult {
        ctx.require_admin()?;
        let RegionPayload { region } = req
            .payload()
            .map_err(|_| HandlerError::InvalidIdFormat)?;
        let mut region = ctx
            .grid
            .store
            .region(region)
            .ok_or(HandlerError::RegionNotFound)?;
        let LocationPayload { x, y } = req
            .payload()
            .map_err(|_| HandlerError::InvalidCoordinates)?;

        info!(region = %region.uuid, x, y, "requesting region relocation");
        region.loc_x = x;
        region.loc_y = y;
        ctx.grid
            .hosts
            .update_region(&region)
            .await
            .map_err(HandlerError::Backend)
    }
}

/// Resolve the region a control command targets, with its host.
///
/// Allowed for admins and for the owner or a manager of the region's
/// estate, as recorded in the store right now.
pub(super) fn controlled_region(
    ctx: &Context,
    req: &ClientRequest,
) -> Result<(Region, Host), HandlerError> {
    let RegionPayload { region } = req.payload()?;
    let store = &ctx.grid.store;
    let region = store.region(region).ok_or(HandlerError::RegionDoesNotExist)?;

    if !ctx.is_admin {
        let managed = region
            .estate
            .and_then(|id| store.estate(id))
            .is_some_and(|estate| estate.is_managed_by(ctx.user));
        if !managed {
            return Err(HandlerError::PermissionDenied);
        }
    }

    if !region.is_assigned() {
        return Err(HandlerError::RegionUnassigned);
    }
    let host = store
        .host(region.host)
        .ok_or(HandlerError::HostDoesNotExist)?;
    Ok((region, host))
}

/// Handler for StartRegion.
pub struct StartRegionHandler;

#[async_trait]
impl Handler for StartRegionHandler {
    async fn handle(&self, ctx: &Context, req: &ClientRequest) -> HandlerResult {
        let (region, host) = controlled_region(ctx, req)?;
        info!(region = %region.uuid, host = host.id, "requesting region start");
        ctx.grid
            .hosts
            .start_region(&region, &host)
            .await
            .map_err(HandlerError::Backend)
    }
}

/// Handler for KillRegion.
pub struct KillRegionHandler;

#[async_trait]
impl Handler for KillRegionHandler {
    async fn handle(&self, ctx: &Context, req: &ClientRequest) -> HandlerResult {
        let (region, host) = controlled_region(ctx, req)?;
        info!(region = %region.uuid, host = host.id, "requesting region kill");
        ctx.grid
            .hosts
            .kill_region(&region, &host)
            .await
            .map_err(HandlerError::Backend)
    }
}
