//! GetState: stream the caller's view of the grid.

use super::{Context, SessionHandler};
use crate::error::HandlerResult;
use crate::session::Visibility;
use async_trait::async_trait;
use grid_proto::{ClientRequest, ServerMessage};
use tracing::info;

/// Handler for GetState.
///
/// Everyone gets users, estates, groups and their own jobs. Admins also
/// get pending users, every region and every host; other users get only
/// the regions their visibility admits.
pub struct GetStateHandler;

#[async_trait]
impl SessionHandler for GetStateHandler {
    async fn handle(
        &self,
        ctx: &Context,
        visibility: &Visibility,
        _req: &ClientRequest,
    ) -> HandlerResult {
        info!("state sync requested");
        let store = &ctx.grid.store;

        for user in store.users() {
            ctx.push(ServerMessage::UserUpdate(user)).await;
        }
        for job in store.jobs_for_user(ctx.user) {
            ctx.push(ServerMessage::JobUpdate(job)).await;
        }
        for estate in store.estates() {
            ctx.push(ServerMessage::EstateUpdate(estate)).await;
        }
        for group in store.groups() {
            ctx.push(ServerMessage::GroupUpdate(group)).await;
        }

        if visibility.is_admin() {
            for pending in store.pending_users() {
                ctx.push(ServerMessage::PendingUserUpdate(pending)).await;
            }
            for region in store.regions() {
                ctx.push(ServerMessage::RegionUpdate(region)).await;
            }
            for host in store.hosts() {
                ctx.push(ServerMessage::HostUpdate(host)).await;
            }
        } else {
            for region in store.regions() {
                if visibility.region_visible(&region.uuid) {
                    ctx.push(ServerMessage::RegionUpdate(region)).await;
                }
            }
        }

        Ok("State Sync Complete".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{ADMIN, Harness, MANAGER, OUTSIDER, OWNER, R1, drain, request};
    use crate::state::StateStore;
    use grid_proto::{PendingUser, UserId};
    use serde_json::json;
    use uuid::Uuid;

    async fn sync(h: &Harness, user: UserId) -> Vec<ServerMessage> {
        let (ctx, mut rx) = h.context(user);
        let vis = Visibility::for_user(user, ctx.is_admin, &h.store.estates());
        let result = GetStateHandler
            .handle(&ctx, &vis, &request("GetState", json!({})))
            .await;
        assert_eq!(result, Ok("State Sync Complete".into()));
        drain(&mut rx)
    }

    fn regions(msgs: &[ServerMessage]) -> Vec<Uuid> {
        msgs.iter()
            .filter_map(|m| match m {
                ServerMessage::RegionUpdate(r) => Some(r.uuid),
                _ => None,
            })
            .collect()
    }

    fn count(msgs: &[ServerMessage], kind: &str) -> usize {
        msgs.iter().filter(|m| m.message_type() == kind).count()
    }

    #[tokio::test]
    async fn owner_sees_own_region_only() {
        let h = Harness::new();
        let msgs = sync(&h, OWNER).await;
        assert_eq!(regions(&msgs), vec![R1]);
        assert_eq!(count(&msgs, "HostUpdate"), 0);
        assert_eq!(count(&msgs, "UserUpdate"), 4);
        assert_eq!(count(&msgs, "EstateUpdate"), 2);
        let jobs: Vec<_> = msgs
            .iter()
            .filter_map(|m| match m {
                ServerMessage::JobUpdate(j) => Some(j.user),
                _ => None,
            })
            .collect();
        assert_eq!(jobs, vec![OWNER]);
    }

    #[tokio::test]
    async fn manager_sees_managed_region() {
        let h = Harness::new();
        assert_eq!(regions(&sync(&h, MANAGER).await), vec![R1]);
    }

    #[tokio::test]
    async fn outsider_sees_no_regions() {
        let h = Harness::new();
        let msgs = sync(&h, OUTSIDER).await;
        assert!(regions(&msgs).is_empty());
        assert_eq!(count(&msgs, "EstateUpdate"), 2);
        assert_eq!(count(&msgs, "JobUpdate"), 1);
    }

    #[tokio::test]
    async fn admin_sees_everything() {
        let mut snapshot = crate::handlers::testing::grid_snapshot();
        snapshot.pending_users.push(PendingUser {
            name: "newbie".into(),
            email: "newbie@grid.test".into(),
            summary: "hi".into(),
        });
        let h = Harness::with_snapshot(snapshot);
        let msgs = sync(&h, ADMIN).await;
        assert_eq!(regions(&msgs).len(), 3);
        assert_eq!(count(&msgs, "HostUpdate"), 2);
        assert_eq!(count(&msgs, "PendingUserUpdate"), 1);
        assert_eq!(count(&msgs, "JobUpdate"), 0);
        assert_eq!(msgs.first().map(|m| m.message_type()), Some("UserUpdate"));
    }
}
