//! Wire shapes for the host/worker query protocol.
//!
//! Line-delimited JSON over a loopback TCP connection. List results are
//! streamed one record per line and terminated by an `end` frame, bounding
//! peak message size and letting the consumer start before the list is
//! complete.

use std::io;

use serde::{Deserialize, Serialize};

use super::PROTOCOL_VERSION;
use crate::core::service::{ReadingInfo, SensorInfo};
use crate::error::{BridgeError, Result};

/// Prefix of the one-line listener announcement the worker prints to stdout:
/// `HWINFO-BRIDGE|<protocol version>|<addr>`.
pub const ANNOUNCE_PREFIX: &str = "HWINFO-BRIDGE";

/// Requests issued by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Hello { cookie: String, version: u32 },
    PollTime,
    Sensors,
    ReadingsForSensor { id: String },
}

/// Reply frames sent by the worker, one JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum Frame {
    HelloOk { version: u32 },
    PollTime { poll_time: u64 },
    Sensor { sensor: SensorInfo },
    Reading { reading: ReadingInfo },
    /// Terminates a streamed list.
    End,
    Error { kind: ErrorKind, message: String },
}

/// Error taxonomy carried across the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unavailable,
    Integrity,
    Protocol,
    NotFound,
    Io,
    Config,
}

impl ErrorKind {
    pub fn classify(err: &BridgeError) -> Self {
        match err {
            BridgeError::Unavailable(_) => ErrorKind::Unavailable,
            BridgeError::Integrity(_) => ErrorKind::Integrity,
            BridgeError::Protocol(_) => ErrorKind::Protocol,
            BridgeError::NotFound(_) => ErrorKind::NotFound,
            BridgeError::Io(_) | BridgeError::Serialization(_) => ErrorKind::Io,
            BridgeError::Config(_) => ErrorKind::Config,
        }
    }

    /// Reconstruct the matching error on the client side.
    pub fn into_error(self, message: String) -> BridgeError {
        match self {
            ErrorKind::Unavailable => BridgeError::Unavailable(message),
            ErrorKind::Integrity => BridgeError::Integrity(message),
            ErrorKind::Protocol => BridgeError::Protocol(message),
            ErrorKind::NotFound => BridgeError::NotFound(message),
            ErrorKind::Io => BridgeError::Io(io::Error::other(message)),
            ErrorKind::Config => BridgeError::Config(message),
        }
    }
}

impl Frame {
    pub fn error(err: &BridgeError) -> Self {
        Frame::Error {
            kind: ErrorKind::classify(err),
            message: err.to_string(),
        }
    }
}

/// Build the stdout announcement for a bound listener address.
pub fn announce_line(addr: &std::net::SocketAddr) -> String {
    format!("{ANNOUNCE_PREFIX}|{PROTOCOL_VERSION}|{addr}")
}

/// Parse and validate a worker announcement, returning the listener address.
pub fn parse_announce(line: &str) -> Result<String> {
    let mut parts = line.trim().split('|');
    let prefix = parts.next().unwrap_or_default();
    if prefix != ANNOUNCE_PREFIX {
        return Err(BridgeError::protocol(format!(
            "unexpected worker announcement: {line:?}"
        )));
    }
    let version: u32 = parts
        .next()
        .unwrap_or_default()
        .parse()
        .map_err(|_| BridgeError::protocol(format!("bad protocol version in {line:?}")))?;
    if version != PROTOCOL_VERSION {
        return Err(BridgeError::protocol(format!(
            "worker speaks protocol v{version}, host requires v{PROTOCOL_VERSION}"
        )));
    }
    let addr = parts
        .next()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| BridgeError::protocol(format!("missing address in {line:?}")))?;
    Ok(addr.to_string())
}
