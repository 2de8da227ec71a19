//! Session main loop.
//!
//! Four sources feed the loop: hub deliveries, client frames, the process
//! shutdown broadcast, and completions of the session's command tasks. None
//! has priority over the others.

use std::sync::Arc;

use grid_proto::{Notice, ServerMessage};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{Instrument, debug, info, warn};

use super::{Inbound, Session, Visibility};
use crate::error::HandlerError;
use crate::handlers::{ConsoleSlot, Context, Outbound, Registry, Route};
use crate::state::{Category, Delivery, Notification, SessionClosed};
use crate::telemetry::spans;

enum SessionInput {
    /// Something arrived from the hub
    Delivery(Delivery),
    /// The client sent a frame
    Frame(Inbound),
    /// The client is gone
    Closing,
    /// The process is stopping
    Shutdown,
    /// A command task finished
    TaskDone(Result<(), JoinError>),
}

/// Translate a hub notification into what this session should be sent.
///
/// Estate notifications update a filtered visibility in place whether or
/// not they are forwarded.
pub fn filter_notification(
    notification: Notification,
    visibility: &mut Visibility,
) -> Option<ServerMessage> {
    let admin = visibility.is_admin();
    match notification {
        Notification::HostUpdated(host) => admin.then_some(ServerMessage::HostUpdate(host)),
        Notification::HostRemoved(id) => {
            admin.then_some(ServerMessage::HostDeleted(Notice { id }))
        }
        Notification::HostStat(stat) => admin.then_some(ServerMessage::HostStat(stat)),
        Notification::RegionUpdated(region) => visibility
            .region_visible(&region.uuid)
            .then_some(ServerMessage::RegionUpdate(region)),
        Notification::RegionRemoved(id) => visibility
            .region_visible(&id)
            .then_some(ServerMessage::RegionDeleted(Notice { id })),
        Notification::RegionStat(stat) => visibility
            .region_visible(&stat.uuid)
            .then_some(ServerMessage::RegionStat(stat)),
        Notification::EstateUpdated(estate) => match visibility {
            Visibility::Everything => Some(ServerMessage::EstateUpdate(estate)),
            Visibility::Filtered(filter) => filter
                .apply_estate(&estate)
                .then_some(ServerMessage::EstateUpdate(estate)),
        },
        Notification::EstateRemoved(id) => {
            if let Visibility::Filtered(filter) = visibility {
                filter.remove_estate(id);
            }
            Some(ServerMessage::EstateDeleted(Notice { id }))
        }
    }
}

impl Session {
    /// Run the session until the client leaves or the process stops.
    pub async fn run(self) {
        let span = spans::session(self.id, self.user);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(mut self) {
        let grid = Arc::clone(&self.grid);

        // Subscribe before reading estates so no change slips between the two.
        let mut subscription = grid.hub.subscribe();
        let mut visibility =
            Visibility::for_user(self.user, self.is_admin, &grid.store.estates());

        let ctx = Context {
            session: self.id,
            user: self.user,
            is_admin: self.is_admin,
            grid: Arc::clone(&grid),
            sender: Outbound::new(self.outbound.clone()),
            console: ConsoleSlot::default(),
        };
        let permits = Arc::new(Semaphore::new(grid.limits.max_inflight_commands.max(1)));
        let mut tasks: JoinSet<()> = JoinSet::new();

        info!(admin = self.is_admin, "session started");

        let closed_by_client = loop {
            let input = tokio::select! {
                delivery = subscription.recv() => SessionInput::Delivery(delivery),
                frame = self.inbound.recv() => match frame {
                    Some(frame) => SessionInput::Frame(frame),
                    None => SessionInput::Closing,
                },
                _ = self.shutdown.recv() => SessionInput::Shutdown,
                Some(done) = tasks.join_next(), if !tasks.is_empty() => {
                    SessionInput::TaskDone(done)
                }
            };

            match input {
                SessionInput::Delivery(Delivery::Event(notification)) => {
                    let category = notification.category();
                    if let Some(msg) = filter_notification(notification, &mut visibility) {
                        if !ctx.sender.send(msg).await {
                            break true;
                        }
                        crate::metrics::record_forwarded(category.as_str());
                    }
                }
                SessionInput::Delivery(Delivery::Lagged { category, skipped }) => {
                    self.recover_from_lag(category, skipped, &mut visibility);
                }
                SessionInput::Delivery(Delivery::Closed) => {
                    debug!("hub closed");
                    break false;
                }
                SessionInput::Frame(Inbound::Malformed(reason)) => {
                    debug!(%reason, "malformed client frame");
                    crate::metrics::record_command_error("malformed", "invalid_format");
                    ctx.signal(0, Err(HandlerError::UnknownCommand(String::new())))
                        .await;
                }
                SessionInput::Frame(Inbound::Request(req)) => {
                    match grid.registry.route(&req.message_type) {
                        Some(Route::Inline(name, handler)) => {
                            Registry::run_inline(name, handler, &ctx, &visibility, &req).await;
                        }
                        Some(Route::Task(name, handler)) => {
                            // Queued commands wait for a permit in their own task.
                            let permits = Arc::clone(&permits);
                            let ctx = ctx.clone();
                            tasks.spawn(async move {
                                let Ok(_permit) = permits.acquire_owned().await else {
                                    return;
                                };
                                Registry::run_task(name, handler, ctx, req).await;
                            });
                        }
                        None => Registry::reject_unknown(&ctx, &req).await,
                    }
                }
                SessionInput::TaskDone(Err(e)) if e.is_panic() => {
                    warn!(error = %e, "command task panicked");
                }
                SessionInput::TaskDone(_) => {}
                SessionInput::Closing => break true,
                SessionInput::Shutdown => break false,
            }
        };

        if closed_by_client {
            info!("client disconnected");
            let closed = SessionClosed {
                session: self.id,
                user: self.user,
            };
            if grid.sessions.closing_sink().send(closed).await.is_err() {
                debug!("session registry is gone");
            }
        } else {
            info!("session stopped");
        }

        // In-flight commands finish on their own; their signals find a closed queue.
        tasks.detach_all();
        if let Some(console) = ctx.console.take() {
            console.close().await;
        }
    }

    fn recover_from_lag(&self, category: Category, skipped: u64, visibility: &mut Visibility) {
        warn!(category = category.as_str(), skipped, "session fell behind the hub");
        crate::metrics::record_lagged(category.as_str(), skipped);
        if category.affects_visibility() && !visibility.is_admin() {
            *visibility = Visibility::for_user(self.user, false, &self.grid.store.estates());
            debug!("visibility rebuilt after lag");
        }
    }
}
