//! # grid-proto
//!
//! Wire types for the grid control plane.
//!
//! ## Features
//!
//! - Entity model shared by the server, the node agent and clients
//! - Client request envelope with typed payload decoding
//! - Closed set of server push messages, encoded as `{MessageType, Message}`
//! - Node telemetry envelope and a newline-delimited codec for tokio
//!
//! ## Quick Start
//!
//! ```rust
//! use grid_proto::{ClientRequest, RegionPayload};
//!
//! let raw = r#"{"MessageID":7,"MessageType":"StartRegion","Message":{"RegionUUID":"8c0e4a53-3a6a-4a8f-9d43-0a3c7a1b2f10"}}"#;
//! let req = ClientRequest::parse(raw).expect("valid envelope");
//! assert_eq!(req.message_id, 7);
//! let payload: RegionPayload = req.payload().expect("valid payload");
//! assert_eq!(payload.region.to_string(), "8c0e4a53-3a6a-4a8f-9d43-0a3c7a1b2f10");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
#[cfg(feature = "tokio")]
pub mod line;
pub mod model;
pub mod node;
pub mod push;
pub mod request;

pub use self::error::{ProtocolError, Result};
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
pub use self::model::{
    Estate, EstateId, Group, Host, HostId, HostStat, HostStatus, Job, JobId, PendingUser, Region,
    RegionStatus, User, UserId, ADMIN_ACCESS_LEVEL, UNASSIGNED_HOST,
};
pub use self::node::{NetworkMessage, NodeFrame, NodeRequest, HOST_STATS};
pub use self::push::{Notice, ServerMessage, Signal};
pub use self::request::{
    AddressPayload, ClientRequest, IdPayload, LocationPayload, PasswordPayload, RegionPayload,
};
