//! Closed message protocol between host and worker.
//!
//! Every port has a fixed payload shape. Outbound ports are pure signals;
//! inbound ports carry the payloads below.
//!
//! Wire format (JSON lines):
//!
//! ```text
//! host → worker   {"type":"init","config":{...}}
//! host → worker   {"type":"command","port":"ignite"}
//! worker → host   {"port":"writeFile","payload":["out.txt","hello"]}
//! worker → host   {"port":"sendModelDump","payload":{...}}
//! worker → host   {"port":"fault","payload":{"message":"..."}}
//! ```

use igniter_shared::{FileWriteRequest, IgniterError, Result, WorkerConfig};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Outbound (host → worker)
// ---------------------------------------------------------------------------

/// Commands the host sends to the worker. None carry a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutboundCommand {
    /// Start signal.
    Ignite,
    /// Pull the current model snapshot.
    RequestModelDump,
    /// Cooperative stop.
    Interrupt,
}

impl OutboundCommand {
    /// Port name on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignite => "ignite",
            Self::RequestModelDump => "requestModelDump",
            Self::Interrupt => "interrupt",
        }
    }
}

impl std::fmt::Display for OutboundCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Inbound (worker → host)
// ---------------------------------------------------------------------------

/// Events the worker emits to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "port", content = "payload", rename_all = "camelCase")]
pub enum InboundEvent {
    /// Opaque model snapshot, printed for diagnostics.
    SendModelDump(serde_json::Value),
    /// `(filename, contents)` to materialize on disk.
    WriteFile(String, String),
    /// The worker hit an error it cannot recover from.
    Fault { message: String },
}

/// Names of the inbound ports, used as subscription keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundPort {
    SendModelDump,
    WriteFile,
    Fault,
}

impl InboundPort {
    /// Port name on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SendModelDump => "sendModelDump",
            Self::WriteFile => "writeFile",
            Self::Fault => "fault",
        }
    }
}

impl std::fmt::Display for InboundPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl InboundEvent {
    /// The port this event travels on.
    pub fn port(&self) -> InboundPort {
        match self {
            Self::SendModelDump(_) => InboundPort::SendModelDump,
            Self::WriteFile(..) => InboundPort::WriteFile,
            Self::Fault { .. } => InboundPort::Fault,
        }
    }

    pub fn write_file(filename: impl Into<String>, contents: impl Into<String>) -> Self {
        Self::WriteFile(filename.into(), contents.into())
    }

    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            message: message.into(),
        }
    }

    /// Decode one wire line.
    pub fn decode(line: &str) -> Result<Self> {
        serde_json::from_str(line.trim()).map_err(|e| {
            IgniterError::protocol(format!(
                "invalid worker message: {e} (got: {})",
                line.chars().take(200).collect::<String>()
            ))
        })
    }
}

impl From<FileWriteRequest> for InboundEvent {
    fn from(req: FileWriteRequest) -> Self {
        Self::WriteFile(req.filename, req.contents)
    }
}

// ---------------------------------------------------------------------------
// Host envelope
// ---------------------------------------------------------------------------

/// Everything the host writes to a process worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    /// First line: the worker's sole initialization input.
    Init { config: WorkerConfig },
    /// A command on one of the outbound ports.
    Command { port: OutboundCommand },
}

impl HostMessage {
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| IgniterError::protocol(format!("failed to serialize request: {e}")))
    }

    pub fn decode(line: &str) -> Result<Self> {
        serde_json::from_str(line.trim())
            .map_err(|e| IgniterError::protocol(format!("invalid host message: {e}")))
    }
}
