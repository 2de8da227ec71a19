//! Node telemetry envelope.
//!
//! Nodes and the server exchange newline-delimited [`NetworkMessage`] JSON
//! frames over one persistent TCP connection. Nodes send `host_stats`; the
//! server sends `request` frames asking the node to act on a region.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::model::HostStat;

/// `MessageType` of a telemetry sample.
pub const HOST_STATS: &str = "host_stats";
/// `MessageType` of a server request.
pub const REQUEST: &str = "request";

/// One frame on the node channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMessage {
    /// Frame kind.
    #[serde(rename = "MessageType")]
    pub message_type: String,
    /// Telemetry sample, present on `host_stats`.
    #[serde(rename = "HStats", default, skip_serializing_if = "Option::is_none")]
    pub host_stats: Option<HostStat>,
    /// Request verb, present on `request`.
    #[serde(rename = "Request", default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    /// Region the request applies to.
    #[serde(rename = "RegionUUID", default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Uuid>,
}

impl NetworkMessage {
    /// A `host_stats` frame.
    pub fn host_stats(stat: HostStat) -> Self {
        Self {
            message_type: HOST_STATS.to_string(),
            host_stats: Some(stat),
            ..Self::default()
        }
    }

    /// Decode one frame.
    pub fn parse(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line.trim_end())?)
    }

    /// Encode one frame, newline-terminated.
    pub fn encode(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Classify a decoded frame.
    pub fn classify(self) -> NodeFrame {
        match self.message_type.as_str() {
            HOST_STATS => match self.host_stats {
                Some(stat) => NodeFrame::HostStats(stat),
                None => NodeFrame::Invalid(self.message_type),
            },
            REQUEST => match NodeRequest::from_parts(self.request.as_deref(), self.region) {
                Some(req) => NodeFrame::Request(req),
                None => NodeFrame::Invalid(self.message_type),
            },
            _ => NodeFrame::Invalid(self.message_type),
        }
    }
}

/// A classified node frame.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeFrame {
    /// A telemetry sample.
    HostStats(HostStat),
    /// A request from the server.
    Request(NodeRequest),
    /// Unknown type or missing body; carries the offending `MessageType`.
    Invalid(String),
}

/// Region actions the server asks a node to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRequest {
    /// Launch the region process.
    StartRegion(Uuid),
    /// Terminate the region process.
    KillRegion(Uuid),
    /// Release the region from this node.
    RemoveRegion(Uuid),
    /// Attach a console to the region.
    OpenConsole(Uuid),
    /// Detach the region console.
    CloseConsole(Uuid),
}

impl NodeRequest {
    /// The wire verb.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::StartRegion(_) => "start_region",
            Self::KillRegion(_) => "kill_region",
            Self::RemoveRegion(_) => "remove_region",
            Self::OpenConsole(_) => "open_console",
            Self::CloseConsole(_) => "close_console",
        }
    }

    /// Region the request targets.
    pub fn region(&self) -> Uuid {
        match *self {
            Self::StartRegion(r)
            | Self::KillRegion(r)
            | Self::RemoveRegion(r)
            | Self::OpenConsole(r)
            | Self::CloseConsole(r) => r,
        }
    }

    fn from_parts(verb: Option<&str>, region: Option<Uuid>) -> Option<Self> {
        let region = region?;
        Some(match verb? {
            "start_region" => Self::StartRegion(region),
            "kill_region" => Self::KillRegion(region),
            "remove_region" => Self::RemoveRegion(region),
            "open_console" => Self::OpenConsole(region),
            "close_console" => Self::CloseConsole(region),
            _ => return None,
        })
    }
}

impl From<NodeRequest> for NetworkMessage {
    fn from(req: NodeRequest) -> Self {
        Self {
            message_type: REQUEST.to_string(),
            request: Some(req.verb().to_string()),
            region: Some(req.region()),
            ..Self::default()
        }
    }
}
