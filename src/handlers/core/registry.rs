//! Command handler registry and dispatch.
//!
//! The `Registry` maps `MessageType` names to handlers and keeps per-command
//! usage counters. Execution is wrapped in a command span, a latency timer
//! and error accounting.

use super::context::{Context, Handler, SessionHandler};
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{
    assign::SetHostHandler,
    console::{CloseConsoleHandler, OpenConsoleHandler},
    estates::SetEstateHandler,
    hosts::{AddHostHandler, RemoveHostHandler},
    jobs::DeleteJobHandler,
    regions::{KillRegionHandler, SetLocationHandler, StartRegionHandler},
    state_sync::GetStateHandler,
    users::SetPasswordHandler,
};
use crate::session::Visibility;
use crate::telemetry::{CommandTimer, spans};
use grid_proto::ClientRequest;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Instrument, debug};

/// How a command runs relative to its session loop.
pub enum Route<'a> {
    /// Spawned onto the session's command pool.
    Task(&'static str, Arc<dyn Handler>),
    /// Run on the session loop itself, with access to its visibility.
    Inline(&'static str, &'a dyn SessionHandler),
}

enum Entry {
    Task(Arc<dyn Handler>),
    Inline(Box<dyn SessionHandler>),
}

/// Registry of command handlers.
pub struct Registry {
    handlers: HashMap<&'static str, Entry>,
    command_counts: HashMap<&'static str, Arc<AtomicU64>>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Entry> = HashMap::new();

        // Host placement
        handlers.insert("AddHost", Entry::Task(Arc::new(AddHostHandler)));
        handlers.insert("RemoveHost", Entry::Task(Arc::new(RemoveHostHandler)));
        handlers.insert("SetHost", Entry::Task(Arc::new(SetHostHandler)));

        // Region control
        handlers.insert("SetLocation", Entry::Task(Arc::new(SetLocationHandler)));
        handlers.insert("StartRegion", Entry::Task(Arc::new(StartRegionHandler)));
        handlers.insert("KillRegion", Entry::Task(Arc::new(KillRegionHandler)));
        handlers.insert("OpenConsole", Entry::Task(Arc::new(OpenConsoleHandler)));
        handlers.insert("CloseConsole", Entry::Task(Arc::new(CloseConsoleHandler)));

        // Accounts
        handlers.insert("SetPassword", Entry::Task(Arc::new(SetPasswordHandler)));

        // Session-local commands
        handlers.insert("SetEstate", Entry::Inline(Box::new(SetEstateHandler)));
        handlers.insert("DeleteJob", Entry::Inline(Box::new(DeleteJobHandler)));
        handlers.insert("GetState", Entry::Inline(Box::new(GetStateHandler)));

        let command_counts = handlers
            .keys()
            .map(|&cmd| (cmd, Arc::new(AtomicU64::new(0))))
            .collect();

        Self {
            handlers,
            command_counts,
        }
    }

    /// Look up a command and count the use.
    pub fn route(&self, command: &str) -> Option<Route<'_>> {
        let (&name, entry) = self.handlers.get_key_value(command)?;
        if let Some(counter) = self.command_counts.get(name) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        Some(match entry {
            Entry::Task(handler) => Route::Task(name, Arc::clone(handler)),
            Entry::Inline(handler) => Route::Inline(name, handler.as_ref()),
        })
    }

    /// Command usage statistics, most used first.
    pub fn command_stats(&self) -> Vec<(&'static str, u64)> {
        let mut stats: Vec<_> = self
            .command_counts
            .iter()
            .map(|(cmd, count)| (*cmd, count.load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();
        stats.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        stats
    }

    /// Run a task command to completion and send its signal.
    pub async fn run_task(
        name: &'static str,
        handler: Arc<dyn Handler>,
        ctx: Context,
        req: ClientRequest,
    ) {
        let span = spans::command(name, ctx.session, req.message_id);
        async {
            let result = {
                let _timer = CommandTimer::new(name);
                handler.handle(&ctx, &req).await
            };
            finish(name, &ctx, req.message_id, result).await;
        }
        .instrument(span)
        .await
    }

    /// Run an inline command on the caller's task and send its signal.
    pub async fn run_inline(
        name: &'static str,
        handler: &dyn SessionHandler,
        ctx: &Context,
        visibility: &Visibility,
        req: &ClientRequest,
    ) {
        let span = spans::command(name, ctx.session, req.message_id);
        async {
            let result = {
                let _timer = CommandTimer::new(name);
                handler.handle(ctx, visibility, req).await
            };
            finish(name, ctx, req.message_id, result).await;
        }
        .instrument(span)
        .await
    }

    /// Answer a command nobody handles.
    pub async fn reject_unknown(ctx: &Context, req: &ClientRequest) {
        debug!(command = %req.message_type, "unknown command");
        let err = HandlerError::UnknownCommand(req.message_type.clone());
        crate::metrics::record_command_error("unknown", err.error_code());
        ctx.signal(req.message_id, Err(err)).await;
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

async fn finish(name: &'static str, ctx: &Context, message_id: i64, result: HandlerResult) {
    if let Err(e) = &result {
        crate::metrics::record_command_error(name, e.error_code());
        debug!(error = %e, code = e.error_code(), "command failed");
    }
    ctx.signal(message_id, result).await;
}
