//! Unified error handling for gridd.
//!
//! Every client command ends in exactly one `Success` or `Error` signal.
//! [`HandlerError`] is the failure half: its `Display` text is what the
//! client sees, and [`HandlerError::error_code`] labels metrics.

use thiserror::Error;

// ============================================================================
// Handler Errors (command processing)
// ============================================================================

/// Errors that can occur during command handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("Invalid request")]
    UnknownCommand(String),

    #[error("Invalid format")]
    InvalidFormat,

    #[error("Invalid id format")]
    InvalidIdFormat,

    #[error("Invalid coordinate format")]
    InvalidCoordinates,

    #[error("Permission Denied")]
    PermissionDenied,

    #[error("Host does not exist")]
    HostDoesNotExist,

    #[error("Host not found")]
    HostNotFound,

    #[error("Region not found")]
    RegionNotFound,

    #[error("Region does not exist")]
    RegionDoesNotExist,

    #[error("Estate does not exist")]
    EstateDoesNotExist,

    #[error("Job does not exist")]
    JobDoesNotExist,

    #[error("User does not exist")]
    UserDoesNotExist,

    #[error("Region is already on that host")]
    AlreadyOnHost,

    #[error("Region is not assigned to a host")]
    RegionUnassigned,

    #[error("Password Cannot be blank")]
    BlankPassword,

    /// Failure reported by the host operations gateway, passed through verbatim.
    #[error("{0}")]
    Backend(String),

    #[error("Internal error")]
    Internal(String),
}

impl HandlerError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownCommand(_) => "unknown_command",
            Self::InvalidFormat => "invalid_format",
            Self::InvalidIdFormat => "invalid_id_format",
            Self::InvalidCoordinates => "invalid_coordinates",
            Self::PermissionDenied => "permission_denied",
            Self::HostDoesNotExist | Self::HostNotFound => "host_not_found",
            Self::RegionNotFound | Self::RegionDoesNotExist => "region_not_found",
            Self::EstateDoesNotExist => "estate_not_found",
            Self::JobDoesNotExist => "job_not_found",
            Self::UserDoesNotExist => "user_not_found",
            Self::AlreadyOnHost => "already_on_host",
            Self::RegionUnassigned => "region_unassigned",
            Self::BlankPassword => "blank_password",
            Self::Backend(_) => "backend",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<grid_proto::ProtocolError> for HandlerError {
    fn from(_: grid_proto::ProtocolError) -> Self {
        Self::InvalidFormat
    }
}

/// Result type for command handlers: the success message, or the failure.
pub type HandlerResult = Result<String, HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_client_text() {
        assert_eq!(
            HandlerError::UnknownCommand("Bogus".into()).to_string(),
            "Invalid request"
        );
        assert_eq!(
            HandlerError::AlreadyOnHost.to_string(),
            "Region is already on that host"
        );
        assert_eq!(
            HandlerError::Backend("node refused".into()).to_string(),
            "node refused"
        );
        assert_eq!(
            HandlerError::Internal("hash failed".into()).to_string(),
            "Internal error"
        );
    }

    #[test]
    fn not_found_variants_share_codes() {
        assert_eq!(
            HandlerError::HostNotFound.error_code(),
            HandlerError::HostDoesNotExist.error_code()
        );
        assert_eq!(HandlerError::BlankPassword.error_code(), "blank_password");
    }
}
