//! Audio session and endpoint abstractions
//!
//! This module defines the narrow capability interface the mixer core needs
//! from the operating system: enumerating per-application sessions and
//! physical endpoints, and reading/writing their volume and mute flags.
//! Implementations for specific platforms live in the `infra` crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors reported by an audio session provider
#[derive(Debug, Error)]
pub enum AudioError {
    /// No live session matches the requested process
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Requested audio endpoint was not found
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// An external helper command failed, exited non-zero or timed out
    #[error("External command failed: {0}")]
    ExternalCommand(String),

    /// Error reported by the OS audio stack
    #[error("OS error: {0}")]
    OsError(String),

    /// The provider does not implement the requested capability
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;

/// Unique identifier for an audio endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Data-flow direction of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceDirection {
    Output,
    Input,
}

impl DeviceDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceDirection::Output => "output",
            DeviceDirection::Input => "input",
        }
    }
}

impl fmt::Display for DeviceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "output" | "out" => Ok(DeviceDirection::Output),
            "input" | "in" => Ok(DeviceDirection::Input),
            other => Err(format!("unknown direction '{}' (expected output or input)", other)),
        }
    }
}

/// Snapshot of one OS audio session as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Executable name including any platform suffix (e.g. `Discord.exe`)
    pub process_name: String,
    pub pid: u32,
    /// OS-native volume in the 0.0-1.0 range
    pub volume_scalar: f32,
    pub is_muted: bool,
}

/// Endpoint identity as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub id: DeviceId,
    pub friendly_name: String,
}

/// Opaque process icon, passed through to the presentation layer untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessIcon {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Platform audio session provider
///
/// Every call reflects live OS state; implementations must not cache across
/// calls. A session that disappears between two calls is reported as
/// [`AudioError::SessionNotFound`], never as a panic.
pub trait AudioSessionProvider: Send + Sync {
    /// List all audio sessions that belong to a process
    fn list_sessions(&self) -> Result<Vec<SessionInfo>>;

    /// List active endpoints for one direction
    fn list_devices(&self, direction: DeviceDirection) -> Result<Vec<EndpointInfo>>;

    /// Id of the OS default endpoint for one direction, if any
    fn default_device(&self, direction: DeviceDirection) -> Result<Option<DeviceId>>;

    fn session_volume(&self, pid: u32) -> Result<f32>;

    fn set_session_volume(&self, pid: u32, scalar: f32) -> Result<()>;

    fn session_mute(&self, pid: u32) -> Result<bool>;

    fn set_session_mute(&self, pid: u32, muted: bool) -> Result<()>;

    fn device_volume(&self, id: &DeviceId) -> Result<f32>;

    fn set_device_volume(&self, id: &DeviceId, scalar: f32) -> Result<()>;

    fn device_mute(&self, id: &DeviceId) -> Result<bool>;

    fn set_device_mute(&self, id: &DeviceId, muted: bool) -> Result<()>;

    /// Make `id` the OS default endpoint for `direction` (best-effort)
    fn set_default_device(&self, id: &DeviceId, direction: DeviceDirection) -> Result<()>;

    /// Icon of the process owning a session. Absence is not an error.
    fn process_icon(&self, pid: u32) -> Option<ProcessIcon>;

    /// Route a session's output to a specific endpoint
    fn route_session(&self, pid: u32, device: &DeviceId) -> Result<()> {
        Err(AudioError::Unsupported(format!(
            "routing session {} to {} is not available on this platform",
            pid, device
        )))
    }
}
