//! Node telemetry listener.
//!
//! Worker nodes hold one TCP connection each and stream newline-delimited
//! [`NetworkMessage`] frames. A node is identified by its peer IP, which
//! must match a registered host address. While connected the host is
//! online and region requests for it are relayed down the same socket.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use grid_proto::{Host, HostId, LineCodec, NetworkMessage, NodeFrame, ProtocolError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::Framed;
use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::hostops::NodeDirectory;
use crate::state::MemoryStore;
use crate::telemetry::spans;

/// Requests queued per node before senders wait.
const NODE_QUEUE: usize = 32;

/// What became of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A telemetry sample was published.
    Stats,
    /// Decoded but not something a node may send.
    Invalid,
    /// Not JSON; skipped.
    Malformed,
}

impl FrameOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Stats => "stats",
            Self::Invalid => "invalid",
            Self::Malformed => "malformed",
        }
    }
}

/// Process one frame received from the node for `host`.
pub fn handle_frame(line: &str, store: &MemoryStore, host: HostId) -> FrameOutcome {
    let msg = match NetworkMessage::parse(line) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(host, error = %e, "undecodable node frame");
            return FrameOutcome::Malformed;
        }
    };
    match msg.classify() {
        NodeFrame::HostStats(stat) => {
            store.record_host_stat(host, stat);
            FrameOutcome::Stats
        }
        NodeFrame::Request(req) => {
            warn!(host, verb = req.verb(), "node sent a request frame");
            FrameOutcome::Invalid
        }
        NodeFrame::Invalid(message_type) => {
            warn!(host, %message_type, "invalid node message");
            FrameOutcome::Invalid
        }
    }
}

/// Accepts node connections.
pub struct NodeListener {
    listener: TcpListener,
    store: Arc<MemoryStore>,
    nodes: NodeDirectory,
    max_line_len: usize,
    shutdown: broadcast::Sender<()>,
}

impl NodeListener {
    pub async fn bind(
        addr: SocketAddr,
        store: Arc<MemoryStore>,
        nodes: NodeDirectory,
        max_line_len: usize,
        shutdown: broadcast::Sender<()>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "Node listener bound");
        Ok(Self {
            listener,
            store,
            nodes,
            max_line_len,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    #[instrument(skip(self), name = "node_listener")]
    pub async fn run(self) -> anyhow::Result<()> {
        let mut shutdown = self.shutdown.subscribe();
        loop {
            let (stream, peer) = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "Failed to accept node connection");
                        continue;
                    }
                },
                _ = shutdown.recv() => return Ok(()),
            };

            let Some(host) = self.store.host_by_address(&peer.ip().to_string()) else {
                warn!(%peer, "connection from unregistered node refused");
                continue;
            };

            let link = NodeLink {
                host,
                peer,
                store: Arc::clone(&self.store),
                nodes: self.nodes.clone(),
                max_line_len: self.max_line_len,
            };
            let shutdown = self.shutdown.subscribe();
            tokio::spawn(async move { link.serve(stream, shutdown).await });
        }
    }
}

/// One connected node.
pub struct NodeLink {
    pub host: Host,
    pub peer: SocketAddr,
    pub store: Arc<MemoryStore>,
    pub nodes: NodeDirectory,
    pub max_line_len: usize,
}

impl NodeLink {
    /// Serve the node until it disconnects, sends a broken frame, or the
    /// process stops.
    pub async fn serve<S>(self, stream: S, mut shutdown: broadcast::Receiver<()>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let span = spans::node(self.host.id, self.peer);
        async move {
            let host = self.host.id;
            let (tx, mut requests) = mpsc::channel::<NetworkMessage>(NODE_QUEUE);
            self.nodes.attach(host, tx.clone());
            self.store.set_host_online(host, true);
            info!("node connected");

            let mut framed = Framed::new(stream, LineCodec::with_max_len(self.max_line_len));
            loop {
                tokio::select! {
                    frame = framed.next() => match frame {
                        Some(Ok(line)) => {
                            let outcome = handle_frame(&line, &self.store, host);
                            crate::metrics::record_node_frame(outcome.as_str());
                        }
                        Some(Err(e)) => {
                            log_read_error(&e);
                            break;
                        }
                        None => {
                            debug!("node closed the connection");
                            break;
                        }
                    },
                    Some(request) = requests.recv() => {
                        let line = match request.encode() {
                            Ok(line) => line,
                            Err(e) => {
                                warn!(error = %e, "failed to encode node request");
                                continue;
                            }
                        };
                        if let Err(e) = framed.send(line).await {
                            warn!(error = %e, "failed to write to node");
                            break;
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }

            self.nodes.detach(host, &tx);
            if !self.nodes.is_connected(host) {
                self.store.set_host_online(host, false);
            }
            info!("node disconnected");
        }
        .instrument(span)
        .await
    }
}

fn log_read_error(e: &ProtocolError) {
    if e.is_fatal() {
        warn!(error = %e, "dropping node after framing error");
    } else {
        debug!(error = %e, "node read error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Delivery, Notification, NotificationHub, Snapshot, StateStore};
    use grid_proto::NodeRequest;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use uuid::Uuid;

    const STATS: &str = r#"{"MessageType":"host_stats","HStats":{"CPUPercent":[12.5],"MEMTotal":16000000,"MEMUsed":8000000,"MEMPercent":50.0,"NetSent":1000,"NetRecv":2000}}"#;

    fn store_with_host() -> Arc<MemoryStore> {
        let snapshot = Snapshot {
            hosts: vec![Host {
                id: 3,
                address: "127.0.0.1".into(),
                name: "sim3".into(),
                online: false,
            }],
            ..Snapshot::default()
        };
        Arc::new(MemoryStore::from_snapshot(snapshot, NotificationHub::new(16)))
    }

    #[tokio::test]
    async fn host_stats_frame_is_published() {
        let store = store_with_host();
        let mut sub = store.hub().subscribe();
        assert_eq!(handle_frame(STATS, &store, 3), FrameOutcome::Stats);
        match sub.recv().await {
            Delivery::Event(Notification::HostStat(status)) => {
                assert_eq!(status.id, 3);
                assert_eq!(status.stat.cpu_percent, vec![12.5]);
                assert_eq!(status.stat.mem_total, 16_000_000);
                assert_eq!(status.stat.net_recv, 2000);
            }
            other => panic!("unexpected delivery {other:?}"),
        }
    }

    #[test]
    fn unknown_and_broken_frames() {
        let store = store_with_host();
        assert_eq!(
            handle_frame(r#"{"MessageType":"unknown_x"}"#, &store, 3),
            FrameOutcome::Invalid
        );
        assert_eq!(
            handle_frame(r#"{"MessageType":"host_stats"}"#, &store, 3),
            FrameOutcome::Invalid
        );
        assert_eq!(handle_frame("{nope", &store, 3), FrameOutcome::Malformed);
    }

    #[tokio::test]
    async fn link_survives_invalid_frames_and_relays_requests() {
        let store = store_with_host();
        let nodes = NodeDirectory::new();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let (server_side, client_side) = tokio::io::duplex(4096);

        let link = NodeLink {
            host: store.host(3).unwrap(),
            peer: "127.0.0.1:5000".parse().unwrap(),
            store: Arc::clone(&store),
            nodes: nodes.clone(),
            max_line_len: 1024,
        };
        let task = tokio::spawn(link.serve(server_side, shutdown_rx));

        let (read_half, mut write_half) = tokio::io::split(client_side);
        write_half
            .write_all(b"{\"MessageType\":\"unknown_x\"}\n")
            .await
            .unwrap();
        write_half.write_all(STATS.as_bytes()).await.unwrap();
        write_half.write_all(b"\n").await.unwrap();

        // Still connected: a request makes it down to the node.
        let region = Uuid::from_u128(5);
        let mut sent = false;
        for _ in 0..50 {
            if nodes.send(3, NodeRequest::StartRegion(region)).await.is_ok() {
                sent = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(sent);
        let mut lines = BufReader::new(read_half).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let msg = NetworkMessage::parse(&line).unwrap();
        assert_eq!(msg.classify(), NodeFrame::Request(NodeRequest::StartRegion(region)));
        assert!(store.host(3).unwrap().online);

        drop(shutdown_tx);
        task.await.unwrap();
        assert!(!nodes.is_connected(3));
        assert!(!store.host(3).unwrap().online);
    }

    #[tokio::test]
    async fn oversized_frame_drops_the_node() {
        let store = store_with_host();
        let nodes = NodeDirectory::new();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let (server_side, mut client_side) = tokio::io::duplex(4096);
        let link = NodeLink {
            host: store.host(3).unwrap(),
            peer: "127.0.0.1:5000".parse().unwrap(),
            store: Arc::clone(&store),
            nodes: nodes.clone(),
            max_line_len: 64,
        };
        let task = tokio::spawn(link.serve(server_side, shutdown_rx));
        client_side.write_all(&[b'x'; 200]).await.unwrap();
        task.await.unwrap();
        assert!(!nodes.is_connected(3));
    }
}
