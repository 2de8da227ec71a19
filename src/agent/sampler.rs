//! Host resource sampling.

use std::time::Duration;

use grid_proto::HostStat;
use sysinfo::{Networks, System};
use tokio::sync::mpsc;
use tracing::debug;

/// Window over which CPU usage and network deltas are measured.
pub const SAMPLE_WINDOW: Duration = Duration::from_secs(1);

/// Samples CPU, memory and network counters of the local machine.
pub struct Sampler {
    system: System,
    networks: Networks,
}

impl Sampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            networks: Networks::new_with_refreshed_list(),
        }
    }

    /// Take one sample. Blocks the task for [`SAMPLE_WINDOW`].
    pub async fn sample(&mut self) -> HostStat {
        self.system.refresh_cpu_usage();
        let (sent_before, recv_before) = self.net_totals();

        tokio::time::sleep(SAMPLE_WINDOW).await;

        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        let (sent_after, recv_after) = self.net_totals();

        let cpu_percent = self
            .system
            .cpus()
            .iter()
            .map(|cpu| f64::from(cpu.cpu_usage()))
            .collect();

        memory_stat(
            cpu_percent,
            self.system.total_memory(),
            self.system.available_memory(),
            sent_after.saturating_sub(sent_before),
            recv_after.saturating_sub(recv_before),
        )
    }

    fn net_totals(&mut self) -> (u64, u64) {
        self.networks.refresh(true);
        self.networks
            .iter()
            .fold((0, 0), |(sent, recv), (_, data)| {
                (
                    sent + data.total_transmitted(),
                    recv + data.total_received(),
                )
            })
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a sample from raw byte counters. Memory is reported in kB.
fn memory_stat(
    cpu_percent: Vec<f64>,
    total_bytes: u64,
    available_bytes: u64,
    net_sent: u64,
    net_recv: u64,
) -> HostStat {
    let used_bytes = total_bytes.saturating_sub(available_bytes);
    let mem_percent = if total_bytes == 0 {
        0.0
    } else {
        used_bytes as f64 * 100.0 / total_bytes as f64
    };
    HostStat {
        cpu_percent,
        mem_total: total_bytes / 1000,
        mem_used: used_bytes / 1000,
        mem_percent,
        net_sent,
        net_recv,
    }
}

/// Sample forever, feeding `out`. Returns once the receiver is gone.
pub async fn run(mut sampler: Sampler, out: mpsc::Sender<HostStat>) {
    loop {
        let stat = sampler.sample().await;
        // A full queue means the link is down; drop the sample.
        match out.try_send(stat) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => debug!("sample queue full"),
            Err(mpsc::error::TrySendError::Closed(_)) => return,
        }
    }
}
