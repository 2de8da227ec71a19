//! Worker node agent.
//!
//! Keeps one TCP connection to the control plane, streams `host_stats`
//! samples over it and logs the region requests it receives. A lost
//! connection is retried after a fixed delay.

pub mod sampler;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use grid_proto::{HostStat, LineCodec, NetworkMessage, NodeFrame};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{error, info, warn};

use crate::config::NodeAgentConfig;

pub use sampler::Sampler;

/// Samples buffered while disconnected or writing.
pub const SAMPLE_QUEUE: usize = 8;

/// Why a link ended.
#[derive(Debug, PartialEq, Eq)]
pub enum LinkEnd {
    /// The server closed the connection or a read/write failed.
    Disconnected,
    /// The sampler is gone; the agent should stop.
    SamplerStopped,
}

/// Run the agent until the sampler stops.
pub async fn run(config: NodeAgentConfig) {
    let (tx, mut samples) = mpsc::channel(SAMPLE_QUEUE);
    tokio::spawn(sampler::run(Sampler::new(), tx));
    let retry = Duration::from_secs(config.retry_secs);

    loop {
        match TcpStream::connect(&config.server).await {
            Ok(stream) => {
                info!(server = %config.server, "connected to control plane");
                if serve_link(stream, &mut samples).await == LinkEnd::SamplerStopped {
                    return;
                }
                error!("disconnected from control plane");
            }
            Err(e) => {
                warn!(server = %config.server, error = %e, "cannot reach control plane");
            }
        }
        tokio::time::sleep(retry).await;
    }
}

/// Drive one connection: push samples up, log what comes down.
pub async fn serve_link<S>(stream: S, samples: &mut mpsc::Receiver<HostStat>) -> LinkEnd
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, LineCodec::new());
    loop {
        tokio::select! {
            stat = samples.recv() => {
                let Some(stat) = stat else {
                    return LinkEnd::SamplerStopped;
                };
                let line = match NetworkMessage::host_stats(stat).encode() {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "failed to encode sample");
                        continue;
                    }
                };
                if let Err(e) = framed.send(line).await {
                    warn!(error = %e, "failed to send sample");
                    return LinkEnd::Disconnected;
                }
            }
            frame = framed.next() => match frame {
                Some(Ok(line)) => log_frame(&line),
                Some(Err(e)) if e.is_fatal() => {
                    warn!(error = %e, "broken frame from control plane");
                    return LinkEnd::Disconnected;
                }
                Some(Err(e)) => warn!(error = %e, "read error"),
                None => return LinkEnd::Disconnected,
            },
        }
    }
}

fn log_frame(line: &str) {
    match NetworkMessage::parse(line).map(NetworkMessage::classify) {
        Ok(NodeFrame::Request(req)) => {
            info!(
                request = req.verb(),
                region = %req.region(),
                "received request from control plane"
            );
        }
        Ok(NodeFrame::HostStats(_)) | Ok(NodeFrame::Invalid(_)) => {
            info!(frame = %line.trim_end(), "received invalid message from control plane");
        }
        Err(e) => warn!(error = %e, "error decoding control plane message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_proto::NodeRequest;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use uuid::Uuid;

    fn stat() -> HostStat {
        HostStat {
            cpu_percent: vec![5.0],
            mem_total: 1000,
            mem_used: 500,
            mem_percent: 50.0,
            net_sent: 1,
            net_recv: 2,
        }
    }

    #[tokio::test]
    async fn samples_go_up_as_host_stats() {
        let (agent_side, server_side) = tokio::io::duplex(4096);
        let (tx, mut rx) = mpsc::channel(SAMPLE_QUEUE);
        let link = tokio::spawn(async move { serve_link(agent_side, &mut rx).await });

        tx.send(stat()).await.unwrap();
        let (read_half, mut write_half) = tokio::io::split(server_side);
        let mut lines = BufReader::new(read_half).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        assert_eq!(
            NetworkMessage::parse(&line).unwrap().classify(),
            NodeFrame::HostStats(stat())
        );

        // Requests and junk are only logged.
        let req: NetworkMessage = NodeRequest::KillRegion(Uuid::from_u128(9)).into();
        write_half
            .write_all(req.encode().unwrap().as_bytes())
            .await
            .unwrap();
        write_half.write_all(b"garbage\n").await.unwrap();

        drop(tx);
        assert_eq!(link.await.unwrap(), LinkEnd::SamplerStopped);
    }

    #[tokio::test]
    async fn server_close_ends_the_link() {
        let (agent_side, server_side) = tokio::io::duplex(4096);
        let (_tx, mut rx) = mpsc::channel(SAMPLE_QUEUE);
        drop(server_side);
        assert_eq!(serve_link(agent_side, &mut rx).await, LinkEnd::Disconnected);
    }
}
