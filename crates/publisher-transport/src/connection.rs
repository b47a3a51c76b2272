//! Engine status events and reconnection policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use publisher_ipc::ReconnectConfig;

use crate::{BASE_RECONNECT_DELAY_MS, MAX_RECONNECT_ATTEMPTS};

/// Status code for an accepted connection.
pub const CODE_CONNECT_SUCCESS: &str = "NetConnection.Connect.Success";

/// Status code for a rejected connection.
pub const CODE_CONNECT_FAILED: &str = "NetConnection.Connect.Failed";

/// Status code for a closed connection.
pub const CODE_CONNECT_CLOSED: &str = "NetConnection.Connect.Closed";

/// Status code for an accepted publish request.
pub const CODE_PUBLISH_START: &str = "NetStream.Publish.Start";

/// Events raised by a streaming engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineStatus {
    /// The server accepted the connection.
    ConnectSuccess,

    /// The connection attempt was rejected or could not be made.
    ConnectFailed,

    /// An established connection was closed.
    ConnectClosed,

    /// The server accepted the publish request.
    PublishStart,

    /// Transport fault on an active connection.
    IoError(String),

    /// Any other status code, kept verbatim.
    Other(String),
}

impl EngineStatus {
    /// Map a status code by exact match. Unknown codes become `Other`.
    pub fn from_code(code: &str) -> Self {
        match code {
            CODE_CONNECT_SUCCESS => Self::ConnectSuccess,
            CODE_CONNECT_FAILED => Self::ConnectFailed,
            CODE_CONNECT_CLOSED => Self::ConnectClosed,
            CODE_PUBLISH_START => Self::PublishStart,
            other => Self::Other(other.to_string()),
        }
    }

    /// The status code for this event. I/O errors carry no code.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::ConnectSuccess => Some(CODE_CONNECT_SUCCESS),
            Self::ConnectFailed => Some(CODE_CONNECT_FAILED),
            Self::ConnectClosed => Some(CODE_CONNECT_CLOSED),
            Self::PublishStart => Some(CODE_PUBLISH_START),
            Self::IoError(_) => None,
            Self::Other(code) => Some(code),
        }
    }
}

/// Reconnection policy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Highest retry count at which another attempt is still made.
    pub max_retries: u32,

    /// Delay unit; attempt `k` waits `base_delay * 2^k`.
    pub base_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RECONNECT_ATTEMPTS,
            base_delay: Duration::from_millis(BASE_RECONNECT_DELAY_MS),
        }
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

impl ReconnectPolicy {
    /// Calculate the wait before the attempt made at `retry_count`.
    pub fn delay_for_retry(&self, retry_count: u32) -> Duration {
        let multiplier = 2u32.checked_pow(retry_count).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(multiplier)
    }

    /// Check if another attempt is allowed at `retry_count`.
    pub fn should_retry(&self, retry_count: u32) -> bool {
        retry_count <= self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_policy_delays() {
        let policy = ReconnectPolicy::default();

        assert_eq!(policy.delay_for_retry(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_retry(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_retry(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for_retry(10), Duration::from_secs(1024));
    }

    #[test]
    fn test_reconnect_policy_should_retry() {
        let policy = ReconnectPolicy::default();

        assert!(policy.should_retry(0));
        assert!(policy.should_retry(10));
        assert!(!policy.should_retry(11));
    }

    #[test]
    fn test_status_codes() {
        for status in [
            EngineStatus::ConnectSuccess,
            EngineStatus::ConnectFailed,
            EngineStatus::ConnectClosed,
            EngineStatus::PublishStart,
        ] {
            let code = status.code().unwrap().to_string();
            assert_eq!(EngineStatus::from_code(&code), status);
        }

        assert_eq!(
            EngineStatus::from_code("NetStream.Publish.BadName"),
            EngineStatus::Other("NetStream.Publish.BadName".to_string())
        );
        assert_eq!(EngineStatus::IoError("reset".into()).code(), None);
    }
}
