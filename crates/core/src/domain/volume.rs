//! Volume and mute command façade
//!
//! One contract ([`VolumeControl`]) for the three kinds of target the mixer
//! drives: application sessions, endpoints (including the master endpoint)
//! and virtual channels. Percentages are integers in 0..=100 at the boundary;
//! the OS side always sees a 0.0-1.0 scalar.
//!
//! Controllers are short-lived views. They resolve their OS handle on
//! construction, perform one or more operations and are dropped; nothing
//! they read outlives the call chain.

use crate::domain::audio::{AudioError, AudioSessionProvider, DeviceDirection, DeviceId};
use crate::domain::channel::{ChannelId, ChannelStore};
use crate::domain::query::display_name;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Integer volume percentage, always within 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct VolumeLevel(u8);

impl VolumeLevel {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 100;
    pub const DEFAULT_CHANNEL: u8 = 80;

    /// Clamp any integer into the percentage range
    pub fn new(level: i64) -> Self {
        Self(level.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Convert to the OS scalar domain
    pub fn to_scalar(&self) -> f32 {
        self.0 as f32 / 100.0
    }

    /// Convert from the OS scalar domain, rounding to the nearest percent
    pub fn from_scalar(scalar: f32) -> Self {
        if !scalar.is_finite() {
            return Self(Self::MIN);
        }
        Self::new((scalar * 100.0).round() as i64)
    }
}

impl Default for VolumeLevel {
    fn default() -> Self {
        Self(Self::DEFAULT_CHANNEL)
    }
}

impl From<i64> for VolumeLevel {
    fn from(level: i64) -> Self {
        Self::new(level)
    }
}

impl From<VolumeLevel> for u8 {
    fn from(level: VolumeLevel) -> Self {
        level.0
    }
}

impl fmt::Display for VolumeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Read-only volume/mute snapshot of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeState {
    pub volume: VolumeLevel,
    pub is_muted: bool,
}

/// Kind of target a command was addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    Application,
    Device,
    Channel,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetKind::Application => "Application",
            TargetKind::Device => "Device",
            TargetKind::Channel => "Channel",
        };
        f.write_str(name)
    }
}

/// Failure taxonomy surfaced by the façade
#[derive(Debug, Error)]
pub enum ControlError {
    /// Channel id, application name or device id does not resolve
    #[error("{kind} not found: {name}")]
    NotFound { kind: TargetKind, name: String },

    /// The provider or an external command failed
    #[error("External failure: {0}")]
    External(String),
}

impl ControlError {
    pub fn not_found(kind: TargetKind, name: impl Into<String>) -> Self {
        ControlError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ControlError::NotFound { .. })
    }
}

impl From<AudioError> for ControlError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::SessionNotFound(name) => ControlError::not_found(TargetKind::Application, name),
            AudioError::DeviceNotFound(name) => ControlError::not_found(TargetKind::Device, name),
            other => ControlError::External(other.to_string()),
        }
    }
}

pub type ControlResult<T> = std::result::Result<T, ControlError>;

/// Shared contract for every volume target
pub trait VolumeControl {
    /// Clamp `level` into 0..=100, apply it and return the value now in effect
    fn set_volume(&mut self, level: i64) -> ControlResult<VolumeLevel>;

    /// Flip the mute flag and return the new value
    fn toggle_mute(&mut self) -> ControlResult<bool>;

    /// Current volume and mute flag
    fn state(&self) -> ControlResult<VolumeState>;
}

/// True when `process_name` is the application called `name`, either by its
/// full executable name or by its display name. Case-sensitive.
pub fn matches_app(process_name: &str, name: &str) -> bool {
    process_name == name || display_name(process_name) == name
}

/// Volume control bound to one application session
pub struct AppVolumeController<'a> {
    provider: &'a dyn AudioSessionProvider,
    name: String,
    pid: Option<u32>,
    volume: Option<VolumeLevel>,
}

impl<'a> AppVolumeController<'a> {
    /// Resolve `name` against the live session list
    ///
    /// An application that is not running yields a controller with no
    /// handle; every operation on it reports NotFound.
    pub fn new(provider: &'a dyn AudioSessionProvider, name: &str) -> ControlResult<Self> {
        let session = provider
            .list_sessions()?
            .into_iter()
            .find(|s| matches_app(&s.process_name, name));

        let (pid, volume) = match session {
            Some(s) => (Some(s.pid), Some(VolumeLevel::from_scalar(s.volume_scalar))),
            None => (None, None),
        };

        Ok(Self {
            provider,
            name: name.to_string(),
            pid,
            volume,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Volume read when the handle was last resolved or written
    pub fn volume(&self) -> Option<VolumeLevel> {
        self.volume
    }

    fn handle(&self) -> ControlResult<u32> {
        self.pid
            .ok_or_else(|| ControlError::not_found(TargetKind::Application, self.name.clone()))
    }
}

impl VolumeControl for AppVolumeController<'_> {
    fn set_volume(&mut self, level: i64) -> ControlResult<VolumeLevel> {
        let pid = self.handle()?;
        let requested = VolumeLevel::new(level);

        self.provider.set_session_volume(pid, requested.to_scalar())?;
        let applied = VolumeLevel::from_scalar(self.provider.session_volume(pid)?);
        self.volume = Some(applied);

        info!(app = %self.name, pid, volume = applied.get(), "Application volume set");
        Ok(applied)
    }

    fn toggle_mute(&mut self) -> ControlResult<bool> {
        let pid = self.handle()?;

        let current = self.provider.session_mute(pid)?;
        self.provider.set_session_mute(pid, !current)?;
        let muted = self.provider.session_mute(pid)?;

        info!(app = %self.name, pid, muted, "Application mute toggled");
        Ok(muted)
    }

    fn state(&self) -> ControlResult<VolumeState> {
        let pid = self.handle()?;
        Ok(VolumeState {
            volume: VolumeLevel::from_scalar(self.provider.session_volume(pid)?),
            is_muted: self.provider.session_mute(pid)?,
        })
    }
}

/// Volume control bound to one endpoint
pub struct DeviceVolumeController<'a> {
    provider: &'a dyn AudioSessionProvider,
    label: String,
    id: Option<DeviceId>,
}

impl<'a> DeviceVolumeController<'a> {
    /// Resolve `id` against the live endpoint list for `direction`
    pub fn new(
        provider: &'a dyn AudioSessionProvider,
        id: &DeviceId,
        direction: DeviceDirection,
    ) -> ControlResult<Self> {
        let found = provider
            .list_devices(direction)?
            .into_iter()
            .any(|d| d.id == *id);

        Ok(Self {
            provider,
            label: id.as_str().to_string(),
            id: found.then(|| id.clone()),
        })
    }

    /// Bind to the OS default endpoint for `direction`
    pub fn master(
        provider: &'a dyn AudioSessionProvider,
        direction: DeviceDirection,
    ) -> ControlResult<Self> {
        let id = provider.default_device(direction)?;
        debug!(?id, %direction, "Resolved master endpoint");

        Ok(Self {
            provider,
            label: format!("default {} device", direction),
            id,
        })
    }

    pub fn device_id(&self) -> Option<&DeviceId> {
        self.id.as_ref()
    }

    fn handle(&self) -> ControlResult<&DeviceId> {
        self.id
            .as_ref()
            .ok_or_else(|| ControlError::not_found(TargetKind::Device, self.label.clone()))
    }
}

impl VolumeControl for DeviceVolumeController<'_> {
    fn set_volume(&mut self, level: i64) -> ControlResult<VolumeLevel> {
        let id = self.handle()?;
        let requested = VolumeLevel::new(level);

        self.provider.set_device_volume(id, requested.to_scalar())?;
        let applied = VolumeLevel::from_scalar(self.provider.device_volume(id)?);

        info!(device = %id, volume = applied.get(), "Device volume set");
        Ok(applied)
    }

    fn toggle_mute(&mut self) -> ControlResult<bool> {
        let id = self.handle()?;

        let current = self.provider.device_mute(id)?;
        self.provider.set_device_mute(id, !current)?;
        let muted = self.provider.device_mute(id)?;

        info!(device = %id, muted, "Device mute toggled");
        Ok(muted)
    }

    fn state(&self) -> ControlResult<VolumeState> {
        let id = self.handle()?;
        Ok(VolumeState {
            volume: VolumeLevel::from_scalar(self.provider.device_volume(id)?),
            is_muted: self.provider.device_mute(id)?,
        })
    }
}

/// Volume control bound to one virtual channel
pub struct ChannelVolumeControl<'a> {
    store: &'a mut ChannelStore,
    id: ChannelId,
}

impl<'a> ChannelVolumeControl<'a> {
    pub fn new(store: &'a mut ChannelStore, id: ChannelId) -> Self {
        Self { store, id }
    }

    fn not_found(&self) -> ControlError {
        ControlError::not_found(TargetKind::Channel, self.id.as_str())
    }
}

impl VolumeControl for ChannelVolumeControl<'_> {
    fn set_volume(&mut self, level: i64) -> ControlResult<VolumeLevel> {
        self.store
            .set_channel_volume(&self.id, level)
            .ok_or_else(|| self.not_found())
    }

    fn toggle_mute(&mut self) -> ControlResult<bool> {
        self.store
            .toggle_channel_mute(&self.id)
            .ok_or_else(|| self.not_found())
    }

    fn state(&self) -> ControlResult<VolumeState> {
        self.store
            .channel(&self.id)
            .map(|ch| VolumeState {
                volume: ch.volume,
                is_muted: ch.is_muted,
            })
            .ok_or_else(|| self.not_found())
    }
}
