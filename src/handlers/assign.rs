//! SetHost: move a region between hosts.
//!
//! Relocation is two gateway calls. The region is detached from its current
//! host first; only once that call reports success is it attached to the
//! new one. The pair is not atomic: an attach that fails leaves the region
//! unassigned.

use super::{Context, Handler};
use crate::error::{HandlerError, HandlerResult};
use crate::hostops::HostOps;
use crate::state::StateStore;
use async_trait::async_trait;
use grid_proto::{ClientRequest, HostId, IdPayload, Region, RegionPayload, UNASSIGNED_HOST};
use tracing::{info, warn};

/// Handler for SetHost. Admin only.
pub struct SetHostHandler;

#[async_trait]
impl Handler for SetHostHandler {
    async fn handle(&self, ctx: &Context, req: &ClientRequest) -> HandlerResult {
        ctx.require_admin()?;
        let RegionPayload { region } = req.payload()?;
        let region = ctx
            .grid
            .store
            .region(region)
            .ok_or(HandlerError::RegionNotFound)?;
        let IdPayload { id: target } = req.payload()?;

        reassign_region(ctx.grid.hosts.as_ref(), ctx.grid.store.as_ref(), &region, target).await
    }
}

/// Detach `region` from its host, then attach it to `target`.
///
/// A `target` of [`UNASSIGNED_HOST`] only detaches. The detach call is
/// awaited before the attach is attempted and a failed detach is final.
pub async fn reassign_region(
    hosts: &dyn HostOps,
    store: &dyn StateStore,
    region: &Region,
    target: HostId,
) -> HandlerResult {
    if region.host == target {
        return Err(HandlerError::AlreadyOnHost);
    }
    info!(region = %region.uuid, from = region.host, to = target, "reassigning region");

    let mut placed = region.clone();
    let mut outcome = None;

    if region.is_assigned() {
        let Some(current) = store.host(region.host) else {
            warn!(region = %region.uuid, host = region.host, "current host missing, not detaching");
            return Err(HandlerError::HostNotFound);
        };
        let detached = hosts
            .remove_region_from_host(region, &current)
            .await
            .map_err(|msg| {
                warn!(region = %region.uuid, host = current.id, %msg, "detach failed");
                HandlerError::Backend(msg)
            })?;
        placed.host = UNASSIGNED_HOST;
        outcome = Some(detached);
    }

    if target == UNASSIGNED_HOST {
        return outcome.ok_or(HandlerError::AlreadyOnHost);
    }

    let host = store.host(target).ok_or(HandlerError::HostNotFound)?;
    hosts
        .add_region_to_host(&placed, &host)
        .await
        .map_err(HandlerError::Backend)
}
