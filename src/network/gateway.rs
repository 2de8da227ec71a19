//! Gateway - WebSocket listener that accepts client connections.
//!
//! The handshake callback enforces the Origin allow-list and resolves the
//! caller's identity; only a known, unsuspended user gets a session.

use crate::network::connection;
use crate::security::IdentityProvider;
use crate::state::Grid;
use grid_proto::User;
use http::StatusCode;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tracing::{error, info, instrument, warn};

/// The Gateway accepts incoming WebSocket connections and spawns sessions.
pub struct Gateway {
    listener: TcpListener,
    allow_origins: Arc<Vec<String>>,
    grid: Arc<Grid>,
    identity: Arc<dyn IdentityProvider>,
    shutdown: broadcast::Sender<()>,
}

impl Gateway {
    /// Bind the gateway to the specified address.
    pub async fn bind(
        addr: SocketAddr,
        allow_origins: Vec<String>,
        grid: Arc<Grid>,
        identity: Arc<dyn IdentityProvider>,
        shutdown: broadcast::Sender<()>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "WebSocket listener bound");
        Ok(Self {
            listener,
            allow_origins: Arc::new(allow_origins),
            grid,
            identity,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the gateway, accepting connections until shutdown.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        let mut shutdown = self.shutdown.subscribe();
        loop {
            let (stream, addr) = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "Failed to accept WebSocket connection");
                        continue;
                    }
                },
                _ = shutdown.recv() => {
                    info!("gateway stopping");
                    return Ok(());
                }
            };

            info!(%addr, "WebSocket connection attempt");
            let grid = Arc::clone(&self.grid);
            let identity = Arc::clone(&self.identity);
            let allowed = Arc::clone(&self.allow_origins);
            let shutdown = self.shutdown.subscribe();
            tokio::spawn(async move {
                handle_socket(stream, addr, grid, identity, allowed, shutdown).await;
            });
        }
    }
}

async fn handle_socket(
    stream: TcpStream,
    addr: SocketAddr,
    grid: Arc<Grid>,
    identity: Arc<dyn IdentityProvider>,
    allowed: Arc<Vec<String>>,
    shutdown: broadcast::Receiver<()>,
) {
    let mut admitted: Option<User> = None;
    let callback = |req: &Request, response: Response| {
        check_origin(req, &allowed, addr)?;

        let Some(token) = bearer_token(req) else {
            return Err(reject(StatusCode::UNAUTHORIZED, "missing token"));
        };
        let Some(user_id) = identity.authenticate(&token) else {
            warn!(%addr, "WebSocket authentication failed");
            return Err(reject(StatusCode::UNAUTHORIZED, "invalid token"));
        };
        let Some(user) = grid.store.user(user_id) else {
            warn!(%addr, user = %user_id, "token names an unknown user");
            return Err(reject(StatusCode::UNAUTHORIZED, "unknown user"));
        };
        if user.suspended {
            warn!(%addr, user = %user_id, "suspended user refused");
            return Err(reject(StatusCode::FORBIDDEN, "account suspended"));
        }
        admitted = Some(user);
        Ok(response)
    };

    match accept_hdr_async(stream, callback).await {
        Ok(ws) => {
            let Some(user) = admitted else {
                return;
            };
            info!(%addr, user = %user.user_id, "WebSocket handshake successful");
            connection::serve(ws, addr, user, grid, shutdown).await;
        }
        Err(e) => {
            warn!(%addr, error = %e, "WebSocket handshake failed");
        }
    }
}

fn check_origin(req: &Request, allowed: &[String], addr: SocketAddr) -> Result<(), ErrorResponse> {
    // If allow_origins is empty, allow all origins
    if allowed.is_empty() {
        return Ok(());
    }
    if let Some(origin) = req.headers().get("Origin").and_then(|o| o.to_str().ok()) {
        if allowed.iter().any(|a| a == origin || a == "*") {
            return Ok(());
        }
        warn!(%addr, origin = %origin, "WebSocket CORS rejected");
    }
    Err(reject(StatusCode::FORBIDDEN, "CORS origin not allowed"))
}

fn reject(status: StatusCode, reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = status;
    response
}

/// Token from an `Authorization: Bearer` header, else from `?token=`.
pub fn bearer_token<B>(req: &http::Request<B>) -> Option<String> {
    if let Some(token) = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(token.trim().to_string());
    }
    req.uri()
        .query()?
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
