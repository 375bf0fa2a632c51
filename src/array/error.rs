//! Error types for array API calls.

use thiserror::Error;

/// HTTP status the array uses for requests that conflict with the current
/// state of an object.
const BAD_REQUEST: u16 = 400;

const NOT_CONNECTED: &str = "is not connected";
const DOES_NOT_EXIST: &str = "does not exist";
const HAS_BEEN_DESTROYED: &str = "has been destroyed";

/// Errors raised by array clients.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ArrayError {
    /// Raised when the array cannot be reached or the connection drops.
    #[error("cannot reach array {target}: {message}")]
    Transport {
        /// Management address of the array.
        target: String,
        /// Message reported by the HTTP client.
        message: String,
    },
    /// Raised when login is rejected.
    #[error("authentication to {target} failed: {message}")]
    Auth {
        /// Management address of the array.
        target: String,
        /// Message returned by the array.
        message: String,
    },
    /// Raised when the array rejects a request.
    #[error("array returned status {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message text returned by the array.
        message: String,
    },
    /// Raised when a response body does not match the expected shape.
    #[error("failed to decode {resource} response: {message}")]
    Decode {
        /// Resource being decoded.
        resource: String,
        /// Decoder error message.
        message: String,
    },
}

impl ArrayError {
    /// Builds an [`ArrayError::Api`] from a status and message.
    #[must_use]
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Returns `true` when the array reports that a host and volume are
    /// already disconnected.
    #[must_use]
    pub fn is_not_connected(&self) -> bool {
        self.is_bad_request_containing(&[NOT_CONNECTED])
    }

    /// Returns `true` when the array reports that a volume is missing or
    /// already destroyed.
    #[must_use]
    pub fn is_volume_gone(&self) -> bool {
        self.is_bad_request_containing(&[DOES_NOT_EXIST, HAS_BEEN_DESTROYED])
    }

    fn is_bad_request_containing(&self, needles: &[&str]) -> bool {
        match self {
            Self::Api { status, message } => {
                *status == BAD_REQUEST && needles.iter().any(|needle| message.contains(needle))
            }
            Self::Transport { .. } | Self::Auth { .. } | Self::Decode { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ArrayError::api(400, "Host h1 is not connected to volume v1."), true)]
    #[case(ArrayError::api(403, "Host h1 is not connected to volume v1."), false)]
    #[case(ArrayError::api(400, "Could not disconnect host."), false)]
    #[case(
        ArrayError::Transport {
            target: String::from("array"),
            message: String::from("is not connected"),
        },
        false
    )]
    fn recognises_not_connected(#[case] err: ArrayError, #[case] expected: bool) {
        assert_eq!(err.is_not_connected(), expected, "error: {err}");
    }

    #[rstest]
    #[case(ArrayError::api(400, "Volume does not exist."), true)]
    #[case(ArrayError::api(400, "Volume v1 has been destroyed."), true)]
    #[case(ArrayError::api(409, "Volume v1 has been destroyed."), false)]
    #[case(ArrayError::api(400, "Volume is in use."), false)]
    fn recognises_missing_volume(#[case] err: ArrayError, #[case] expected: bool) {
        assert_eq!(err.is_volume_gone(), expected, "error: {err}");
    }
}
