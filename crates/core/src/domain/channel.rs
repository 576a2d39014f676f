//! Virtual channels and the channel store
//!
//! Channels are mixer strips defined by the application itself, independent
//! of OS sessions. The store owns every channel, keeps the two built-in
//! channels alive, and implements the per-type solo state machine:
//!
//! - enabling solo on a channel solos it, unmutes it, and forces every other
//!   channel of the same type to `muted, not solo`;
//! - disabling solo clears it and unmutes every channel of the same type.
//!
//! Channels of the other type are never touched by a solo transition.

use crate::domain::audio::DeviceId;
use crate::domain::volume::VolumeLevel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, trace, warn};

pub const MAIN_OUTPUT_ID: &str = "main_output";
pub const MAIN_INPUT_ID: &str = "main_input";

const MAIN_OUTPUT_NAME: &str = "Principal";
const MAIN_INPUT_NAME: &str = "Microfone";
const MAIN_OUTPUT_COLOR: &str = "#2563eb";
const MAIN_INPUT_COLOR: &str = "#dc2626";
const DEFAULT_DEVICE: &str = "default";

/// Unique identifier for a channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn main_output() -> Self {
        Self::new(MAIN_OUTPUT_ID)
    }

    pub fn main_input() -> Self {
        Self::new(MAIN_INPUT_ID)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the ids reserved by the two built-in channels
    pub fn is_builtin(&self) -> bool {
        self.0 == MAIN_OUTPUT_ID || self.0 == MAIN_INPUT_ID
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Channel direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Output,
    Input,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Output => "output",
            ChannelType::Input => "input",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "output" => Ok(ChannelType::Output),
            "input" => Ok(ChannelType::Input),
            other => Err(format!("unknown channel type '{}' (expected output or input)", other)),
        }
    }
}

/// Solo-related state of a single channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoloState {
    Normal,
    Soloed,
    MutedByOtherSolo,
}

/// Deterministic display color for a channel name
///
/// FNV-1a over the UTF-8 bytes, reduced to a hue in 0..=360. The same name
/// always yields the same color, across runs and platforms.
pub fn name_color(name: &str) -> String {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let hash = name
        .bytes()
        .fold(FNV_OFFSET, |h, b| (h ^ b as u64).wrapping_mul(FNV_PRIME));

    format!("hsl({}, 70%, 50%)", hash % 361)
}

/// Virtual mixer strip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ChannelRecord", from = "ChannelRecord")]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelType,
    pub volume: VolumeLevel,
    pub is_muted: bool,
    pub is_solo: bool,
    pub color: String,
    pub(crate) is_main: bool,
    pub(crate) connected_apps: Vec<String>,
    pub(crate) output_device_id: Option<DeviceId>,
    pub(crate) input_device_id: Option<DeviceId>,
}

impl Channel {
    /// Create a user channel with default attributes
    pub fn new(id: ChannelId, name: impl Into<String>, kind: ChannelType) -> Self {
        let name = name.into();
        Self {
            id,
            color: name_color(&name),
            name,
            kind,
            volume: VolumeLevel::default(),
            is_muted: false,
            is_solo: false,
            is_main: false,
            connected_apps: Vec::new(),
            output_device_id: None,
            input_device_id: None,
        }
    }

    /// Built-in output channel, bound to the default output device
    pub fn main_output() -> Self {
        let mut channel = Self::new(ChannelId::main_output(), MAIN_OUTPUT_NAME, ChannelType::Output);
        channel.is_main = true;
        channel.color = MAIN_OUTPUT_COLOR.to_string();
        channel.output_device_id = Some(DeviceId::new(DEFAULT_DEVICE));
        channel
    }

    /// Built-in input channel, bound to the default input device
    pub fn main_input() -> Self {
        let mut channel = Self::new(ChannelId::main_input(), MAIN_INPUT_NAME, ChannelType::Input);
        channel.is_main = true;
        channel.color = MAIN_INPUT_COLOR.to_string();
        channel.input_device_id = Some(DeviceId::new(DEFAULT_DEVICE));
        channel
    }

    /// The built-in channel reserved under `id`, if any
    pub fn builtin(id: &ChannelId) -> Option<Self> {
        match id.as_str() {
            MAIN_OUTPUT_ID => Some(Self::main_output()),
            MAIN_INPUT_ID => Some(Self::main_input()),
            _ => None,
        }
    }

    pub fn is_main(&self) -> bool {
        self.is_main
    }

    pub fn connected_apps(&self) -> &[String] {
        &self.connected_apps
    }

    pub fn output_device_id(&self) -> Option<&DeviceId> {
        self.output_device_id.as_ref()
    }

    pub fn input_device_id(&self) -> Option<&DeviceId> {
        self.input_device_id.as_ref()
    }
}

/// Flat record of a channel, as presented to callers and persisted to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChannelType,
    #[serde(default)]
    pub volume: VolumeLevel,
    #[serde(default)]
    pub is_muted: bool,
    #[serde(default)]
    pub is_solo: bool,
    #[serde(default)]
    pub is_main: bool,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub connected_apps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_device: Option<String>,
}

impl From<&Channel> for ChannelRecord {
    fn from(channel: &Channel) -> Self {
        Self {
            id: channel.id.as_str().to_string(),
            name: channel.name.clone(),
            kind: channel.kind,
            volume: channel.volume,
            is_muted: channel.is_muted,
            is_solo: channel.is_solo,
            is_main: channel.is_main,
            color: channel.color.clone(),
            connected_apps: channel.connected_apps.clone(),
            output_device: channel.output_device_id.as_ref().map(|d| d.as_str().to_string()),
            input_device: channel.input_device_id.as_ref().map(|d| d.as_str().to_string()),
        }
    }
}

impl From<Channel> for ChannelRecord {
    fn from(channel: Channel) -> Self {
        Self::from(&channel)
    }
}

impl ChannelRecord {
    /// Rebuild the channel this record describes
    pub fn to_channel(&self) -> Channel {
        let mut connected_apps: Vec<String> = Vec::with_capacity(self.connected_apps.len());
        for app in &self.connected_apps {
            if !connected_apps.contains(app) {
                connected_apps.push(app.clone());
            }
        }

        Channel {
            id: ChannelId::new(self.id.clone()),
            name: self.name.clone(),
            kind: self.kind,
            volume: self.volume,
            is_muted: self.is_muted,
            is_solo: self.is_solo,
            color: if self.color.is_empty() {
                name_color(&self.name)
            } else {
                self.color.clone()
            },
            is_main: self.is_main,
            connected_apps,
            output_device_id: self.output_device.clone().map(DeviceId::new),
            input_device_id: self.input_device.clone().map(DeviceId::new),
        }
    }
}

impl From<ChannelRecord> for Channel {
    fn from(record: ChannelRecord) -> Self {
        record.to_channel()
    }
}

/// Channels partitioned by type, built-ins first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelGroups {
    pub output_channels: Vec<Channel>,
    pub input_channels: Vec<Channel>,
}

/// Owner of every channel
///
/// Insertion order is preserved; it is the tie-breaker for listing.
#[derive(Debug, Clone)]
pub struct ChannelStore {
    channels: Vec<Channel>,
    last_id_millis: u64,
}

impl ChannelStore {
    /// Create a store holding only the two built-in channels
    pub fn new() -> Self {
        Self {
            channels: vec![Channel::main_output(), Channel::main_input()],
            last_id_millis: 0,
        }
    }

    /// Hydrate a store from persisted records
    ///
    /// Duplicate ids keep their first occurrence, `is_main` is only honored
    /// on the built-in ids, and missing built-ins are recreated.
    pub fn from_records(records: impl IntoIterator<Item = ChannelRecord>) -> Self {
        let mut channels: Vec<Channel> = Vec::new();

        for record in records {
            let mut channel = record.to_channel();

            if channels.iter().any(|c| c.id == channel.id) {
                warn!(channel = %channel.id, "Duplicate channel id in records, skipping");
                continue;
            }

            if channel.is_main && !channel.id.is_builtin() {
                warn!(channel = %channel.id, "Only built-in channels can be main, demoting");
                channel.is_main = false;
            }
            if let Some(builtin) = Channel::builtin(&channel.id) {
                if channel.kind != builtin.kind {
                    warn!(
                        channel = %channel.id,
                        kind = %channel.kind,
                        expected = %builtin.kind,
                        "Built-in channel has the wrong type, resetting"
                    );
                    channel = Channel {
                        volume: channel.volume,
                        is_muted: channel.is_muted,
                        is_solo: channel.is_solo,
                        connected_apps: channel.connected_apps,
                        ..builtin
                    };
                }
                channel.is_main = true;
            }

            channels.push(channel);
        }

        if !channels.iter().any(|c| c.id.as_str() == MAIN_INPUT_ID) {
            debug!("Restoring missing built-in input channel");
            channels.insert(0, Channel::main_input());
        }
        if !channels.iter().any(|c| c.id.as_str() == MAIN_OUTPUT_ID) {
            debug!("Restoring missing built-in output channel");
            channels.insert(0, Channel::main_output());
        }

        Self {
            channels,
            last_id_millis: 0,
        }
    }

    /// Records for every channel, in insertion order
    pub fn records(&self) -> Vec<ChannelRecord> {
        self.channels.iter().map(ChannelRecord::from).collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Get all channels in insertion order
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    /// Get a reference to a channel
    pub fn channel(&self, id: &ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == *id)
    }

    fn channel_mut(&mut self, id: &ChannelId) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.id == *id)
    }

    fn next_id(&mut self) -> ChannelId {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        let mut millis = now.max(self.last_id_millis + 1);
        while self.channel(&ChannelId::new(format!("channel_{}", millis))).is_some() {
            millis += 1;
        }
        self.last_id_millis = millis;

        ChannelId::new(format!("channel_{}", millis))
    }

    /// Create and register a new user channel
    pub fn create_channel(&mut self, name: &str, kind: ChannelType) -> Channel {
        let id = self.next_id();
        let channel = Channel::new(id, name, kind);

        info!(channel = %channel.id, name, %kind, "Channel created");
        self.channels.push(channel.clone());
        channel
    }

    /// Remove a user channel. Built-ins and unknown ids are left alone.
    pub fn remove_channel(&mut self, id: &ChannelId) -> bool {
        match self.channels.iter().position(|c| c.id == *id) {
            Some(index) if !self.channels[index].is_main => {
                self.channels.remove(index);
                info!(channel = %id, "Channel removed");
                true
            }
            Some(_) => {
                warn!(channel = %id, "Refusing to remove built-in channel");
                false
            }
            None => {
                warn!(channel = %id, "Cannot remove channel: not found");
                false
            }
        }
    }

    /// Partition by type; within each partition built-ins come first and
    /// insertion order is otherwise preserved
    pub fn list_by_type(&self) -> ChannelGroups {
        let partition = |kind: ChannelType| {
            let mut channels: Vec<Channel> = self
                .channels
                .iter()
                .filter(|c| c.kind == kind)
                .cloned()
                .collect();
            channels.sort_by_key(|c| !c.is_main);
            channels
        };

        ChannelGroups {
            output_channels: partition(ChannelType::Output),
            input_channels: partition(ChannelType::Input),
        }
    }

    /// Set a channel's volume, clamped into 0..=100
    pub fn set_channel_volume(&mut self, id: &ChannelId, level: i64) -> Option<VolumeLevel> {
        let Some(channel) = self.channel_mut(id) else {
            warn!(channel = %id, "Cannot set volume: channel not found");
            return None;
        };

        channel.volume = VolumeLevel::new(level);
        trace!(channel = %id, volume = channel.volume.get(), "Channel volume set");
        Some(channel.volume)
    }

    /// Toggle mute, returning the new state
    pub fn toggle_channel_mute(&mut self, id: &ChannelId) -> Option<bool> {
        let Some(channel) = self.channel_mut(id) else {
            warn!(channel = %id, "Cannot toggle mute: channel not found");
            return None;
        };

        channel.is_muted = !channel.is_muted;
        debug!(channel = %id, muted = channel.is_muted, "Channel mute toggled");
        Some(channel.is_muted)
    }

    /// Toggle solo, returning the new solo flag of the target
    pub fn toggle_channel_solo(&mut self, id: &ChannelId) -> Option<bool> {
        let Some((kind, was_solo)) = self.channel(id).map(|c| (c.kind, c.is_solo)) else {
            warn!(channel = %id, "Cannot toggle solo: channel not found");
            return None;
        };

        if was_solo {
            self.disable_solo(id, kind);
            Some(false)
        } else {
            self.enable_solo(id, kind);
            Some(true)
        }
    }

    fn enable_solo(&mut self, id: &ChannelId, kind: ChannelType) {
        for channel in self.channels.iter_mut().filter(|c| c.kind == kind) {
            let is_target = channel.id == *id;
            channel.is_solo = is_target;
            channel.is_muted = !is_target;
        }
        debug!(channel = %id, %kind, "Solo enabled");
    }

    fn disable_solo(&mut self, id: &ChannelId, kind: ChannelType) {
        for channel in self.channels.iter_mut().filter(|c| c.kind == kind) {
            if channel.id == *id {
                channel.is_solo = false;
            } else {
                channel.is_muted = false;
            }
        }
        debug!(channel = %id, %kind, "Solo disabled");
    }

    /// Where a channel sits in the solo state machine
    pub fn solo_state(&self, id: &ChannelId) -> Option<SoloState> {
        let channel = self.channel(id)?;

        if channel.is_solo {
            return Some(SoloState::Soloed);
        }

        let sibling_solo = self
            .channels
            .iter()
            .any(|c| c.kind == channel.kind && c.id != channel.id && c.is_solo);

        Some(if channel.is_muted && sibling_solo {
            SoloState::MutedByOtherSolo
        } else {
            SoloState::Normal
        })
    }

    /// Add an application to a channel; adding an existing member is a no-op
    pub fn add_app_to_channel(&mut self, id: &ChannelId, app_name: &str) -> bool {
        let Some(channel) = self.channel_mut(id) else {
            warn!(channel = %id, app = app_name, "Cannot add app: channel not found");
            return false;
        };

        if !channel.connected_apps.iter().any(|a| a == app_name) {
            channel.connected_apps.push(app_name.to_string());
            debug!(channel = %id, app = app_name, "App connected to channel");
        }
        true
    }

    /// Remove an application from a channel
    pub fn remove_app_from_channel(&mut self, id: &ChannelId, app_name: &str) -> bool {
        let Some(channel) = self.channel_mut(id) else {
            warn!(channel = %id, app = app_name, "Cannot remove app: channel not found");
            return false;
        };

        match channel.connected_apps.iter().position(|a| a == app_name) {
            Some(index) => {
                channel.connected_apps.remove(index);
                debug!(channel = %id, app = app_name, "App disconnected from channel");
                true
            }
            None => {
                debug!(channel = %id, app = app_name, "App was not connected to channel");
                false
            }
        }
    }
}

impl Default for ChannelStore {
    fn default() -> Self {
        Self::new()
    }
}
