//! Server push messages.
//!
//! Everything the server sends to a client is one [`ServerMessage`]. The set
//! is closed: adding a message type means adding a variant, and every
//! encoder match stays exhaustive.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::model::{
    Estate, EstateId, Group, Host, HostId, HostStatus, Job, PendingUser, Region, RegionStatus,
    User,
};

/// Deletion notice body: `{ID}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice<T> {
    /// Id of the removed entity.
    #[serde(rename = "ID")]
    pub id: T,
}

/// Command completion body: `{MessageID, Message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    /// Id of the request being answered.
    #[serde(rename = "MessageID")]
    pub message_id: i64,
    /// Human-readable outcome.
    #[serde(rename = "Message")]
    pub message: String,
}

/// A message pushed from the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "MessageType", content = "Message")]
pub enum ServerMessage {
    /// A user account.
    UserUpdate(User),
    /// A pending registration.
    PendingUserUpdate(PendingUser),
    /// A group.
    GroupUpdate(Group),
    /// A job owned by the receiving user.
    JobUpdate(Job),
    /// An estate was created or changed.
    EstateUpdate(Estate),
    /// An estate was removed.
    EstateDeleted(Notice<EstateId>),
    /// A region was created or changed.
    RegionUpdate(Region),
    /// A region was removed.
    RegionDeleted(Notice<Uuid>),
    /// Runtime status of a region.
    RegionStat(RegionStatus),
    /// A host was created or changed.
    HostUpdate(Host),
    /// A host was removed.
    HostDeleted(Notice<HostId>),
    /// Telemetry from a host.
    HostStat(HostStatus),
    /// A command succeeded.
    Success(Signal),
    /// A command failed.
    Error(Signal),
}

impl ServerMessage {
    /// Success signal for request `message_id`.
    pub fn success(message_id: i64, message: impl Into<String>) -> Self {
        Self::Success(Signal {
            message_id,
            message: message.into(),
        })
    }

    /// Error signal for request `message_id`.
    pub fn error(message_id: i64, message: impl Into<String>) -> Self {
        Self::Error(Signal {
            message_id,
            message: message.into(),
        })
    }

    /// The `MessageType` tag this message is encoded with.
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::UserUpdate(_) => "UserUpdate",
            Self::PendingUserUpdate(_) => "PendingUserUpdate",
            Self::GroupUpdate(_) => "GroupUpdate",
            Self::JobUpdate(_) => "JobUpdate",
            Self::EstateUpdate(_) => "EstateUpdate",
            Self::EstateDeleted(_) => "EstateDeleted",
            Self::RegionUpdate(_) => "RegionUpdate",
            Self::RegionDeleted(_) => "RegionDeleted",
            Self::RegionStat(_) => "RegionStat",
            Self::HostUpdate(_) => "HostUpdate",
            Self::HostDeleted(_) => "HostDeleted",
            Self::HostStat(_) => "HostStat",
            Self::Success(_) => "Success",
            Self::Error(_) => "Error",
        }
    }

    /// Encode to a JSON text frame.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
