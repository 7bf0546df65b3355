//! Per-record error taxonomy. Every variant is recovered locally and counted; none stops a run.

use thiserror::Error;

/// Why a line did not become an [`InstallRecord`](crate::InstallRecord).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Line is not valid UTF-8.
    #[error("line is not valid UTF-8")]
    Encoding,

    /// Line does not have exactly five tab-separated fields.
    #[error("expected 5 tab-separated fields, found {found}")]
    MalformedLine {
        /// Number of fields on the line
        found: usize,
    },

    /// Device type or device id is empty.
    #[error("device type or device id is empty")]
    MissingIdentity,
}

/// Why a parsed record could not be turned into a shard write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// No shard is configured for the device type.
    #[error("unknown device type '{device_type}'")]
    UnknownDeviceType {
        /// Device type that has no route
        device_type: String,
    },
}

impl RouteError {
    #[inline]
    pub fn unknown_device_type(device_type: impl Into<String>) -> Self {
        Self::UnknownDeviceType {
            device_type: device_type.into(),
        }
    }
}

/// Failure talking to a shard. Surfaces to writers only as a failed write.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not establish a connection.
    #[error("cannot connect to {addr}: {reason}")]
    Connect { addr: String, reason: String },

    /// Connection exists but the set did not succeed (timeout, reset, remote rejection).
    #[error("cannot write to {addr}: {reason}")]
    Write { addr: String, reason: String },

    /// Shard failed to connect recently and is in its dead-retry window.
    #[error("shard {addr} is marked dead")]
    Dead { addr: String },
}

impl StoreError {
    pub fn connect(addr: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connect {
            addr: addr.into(),
            reason: reason.to_string(),
        }
    }

    pub fn write(addr: impl Into<String>, reason: impl ToString) -> Self {
        Self::Write {
            addr: addr.into(),
            reason: reason.to_string(),
        }
    }

    /// True when the connection should be dropped and re-established.
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Write { .. })
    }
}
