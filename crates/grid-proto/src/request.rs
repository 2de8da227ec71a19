//! Client request envelope.
//!
//! Every client frame is `{MessageID, MessageType, Message}`. The `Message`
//! body is kept as a JSON value and decoded on demand, so one body can be
//! read through several narrow payload views (a `SetHost` body carries both
//! a `RegionUUID` and an `ID`).

use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Result;
use crate::model::{HostId, UserId};

/// A decoded client command envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientRequest {
    /// Correlation id echoed in the response signal.
    #[serde(rename = "MessageID")]
    pub message_id: i64,
    /// Command name.
    #[serde(rename = "MessageType")]
    pub message_type: String,
    /// Command body, decoded lazily.
    #[serde(rename = "Message", default)]
    pub message: serde_json::Value,
}

impl ClientRequest {
    /// Decode an envelope from a text frame.
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Decode the body into a payload view.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(&self.message)?)
    }
}

/// `{Address}` body of `AddHost`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressPayload {
    /// Network address of the new host.
    #[serde(rename = "Address")]
    pub address: String,
}

/// `{ID}` body: a host, estate or job id depending on the command.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IdPayload {
    /// Numeric id.
    #[serde(rename = "ID")]
    pub id: HostId,
}

/// `{RegionUUID}` body.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RegionPayload {
    /// Target region.
    #[serde(rename = "RegionUUID")]
    pub region: Uuid,
}

/// `{X, Y}` body of `SetLocation`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LocationPayload {
    /// Grid X coordinate.
    #[serde(rename = "X")]
    pub x: i32,
    /// Grid Y coordinate.
    #[serde(rename = "Y")]
    pub y: i32,
}

/// `{UserID, Password}` body of `SetPassword`.
///
/// The plaintext is wiped when the payload is dropped.
#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct PasswordPayload {
    /// Account whose password is changed.
    #[serde(rename = "UserID")]
    #[zeroize(skip)]
    pub user: UserId,
    /// New plaintext password.
    #[serde(rename = "Password")]
    pub password: String,
}

impl std::fmt::Debug for PasswordPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordPayload")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}
