//! Command bus over the mixer service
//!
//! Every presentation operation is expressible as a [`Command`]; front ends
//! build one, hand it to a [`CommandExecutor`] and render the
//! [`CommandResult`] as-is.

use crate::domain::audio::{DeviceDirection, DeviceId};
use crate::domain::channel::{Channel, ChannelGroups, ChannelId, ChannelType};
use crate::domain::query::{AppView, DeviceGroups};
use crate::domain::service::MixerService;
use crate::domain::volume::VolumeState;
use serde::Serialize;
use tracing::trace;

/// Command types for runtime mixer control
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ListChannels,
    GetChannel {
        id: ChannelId,
    },
    CreateChannel {
        name: String,
        kind: ChannelType,
    },
    RemoveChannel {
        id: ChannelId,
    },
    SetChannelVolume {
        id: ChannelId,
        level: i64,
    },
    ToggleChannelMute {
        id: ChannelId,
    },
    ToggleChannelSolo {
        id: ChannelId,
    },
    AddAppToChannel {
        id: ChannelId,
        app: String,
    },
    RemoveAppFromChannel {
        id: ChannelId,
        app: String,
    },
    ListApps,
    SetAppVolume {
        app: String,
        level: i64,
    },
    ToggleAppMute {
        app: String,
    },
    ToggleAppSolo {
        app: String,
    },
    GetAppState {
        app: String,
    },
    GetMasterState,
    SetMasterVolume {
        level: i64,
    },
    ToggleMasterMute,
    ListDevices,
    ListVirtualCables,
    SetDeviceVolume {
        id: DeviceId,
        direction: DeviceDirection,
        level: i64,
    },
    ToggleDeviceMute {
        id: DeviceId,
        direction: DeviceDirection,
    },
    GetDeviceState {
        id: DeviceId,
        direction: DeviceDirection,
    },
    SetDefaultDevice {
        id: DeviceId,
        direction: DeviceDirection,
    },
    RouteAppToDevice {
        app: String,
        device: DeviceId,
    },
}

impl Command {
    /// Whether executing the command can change the channel set
    pub fn mutates_channels(&self) -> bool {
        matches!(
            self,
            Command::CreateChannel { .. }
                | Command::RemoveChannel { .. }
                | Command::SetChannelVolume { .. }
                | Command::ToggleChannelMute { .. }
                | Command::ToggleChannelSolo { .. }
                | Command::AddAppToChannel { .. }
                | Command::RemoveAppFromChannel { .. }
        )
    }
}

/// Result of command execution, in presentation form
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandResult {
    Channel(Option<Channel>),
    Channels(ChannelGroups),
    Apps(Vec<AppView>),
    Devices(DeviceGroups),
    Volume(Option<u8>),
    Flag(Option<bool>),
    Done(bool),
    State(Option<VolumeState>),
}

/// Trait for command execution
#[async_trait::async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: Command) -> CommandResult;
}

#[async_trait::async_trait]
impl CommandExecutor for MixerService {
    async fn execute(&self, command: Command) -> CommandResult {
        trace!(?command, "Executing command");

        match command {
            Command::ListChannels => CommandResult::Channels(self.list_channels()),
            Command::GetChannel { id } => CommandResult::Channel(self.get_channel(&id)),
            Command::CreateChannel { name, kind } => {
                CommandResult::Channel(Some(self.create_channel(&name, kind)))
            }
            Command::RemoveChannel { id } => CommandResult::Done(self.remove_channel(&id)),
            Command::SetChannelVolume { id, level } => {
                CommandResult::Volume(self.set_channel_volume(&id, level).map(u8::from))
            }
            Command::ToggleChannelMute { id } => CommandResult::Flag(self.toggle_channel_mute(&id)),
            Command::ToggleChannelSolo { id } => CommandResult::Flag(self.toggle_channel_solo(&id)),
            Command::AddAppToChannel { id, app } => {
                CommandResult::Done(self.add_app_to_channel(&id, &app))
            }
            Command::RemoveAppFromChannel { id, app } => {
                CommandResult::Done(self.remove_app_from_channel(&id, &app))
            }
            Command::ListApps => CommandResult::Apps(self.get_audio_apps()),
            Command::SetAppVolume { app, level } => {
                CommandResult::Volume(self.set_app_volume(&app, level).map(u8::from))
            }
            Command::ToggleAppMute { app } => CommandResult::Flag(self.toggle_app_mute(&app)),
            Command::ToggleAppSolo { app } => CommandResult::Flag(self.toggle_app_solo(&app)),
            Command::GetAppState { app } => CommandResult::State(self.get_app_state(&app)),
            Command::GetMasterState => CommandResult::State(self.get_master_state()),
            Command::SetMasterVolume { level } => {
                CommandResult::Volume(self.set_master_volume(level).map(u8::from))
            }
            Command::ToggleMasterMute => CommandResult::Flag(self.toggle_master_mute()),
            Command::ListDevices => CommandResult::Devices(self.get_devices()),
            Command::ListVirtualCables => CommandResult::Devices(self.get_virtual_cables()),
            Command::SetDeviceVolume {
                id,
                direction,
                level,
            } => CommandResult::Done(self.set_device_volume(&id, direction, level)),
            Command::ToggleDeviceMute { id, direction } => {
                CommandResult::Flag(self.toggle_device_mute(&id, direction))
            }
            Command::GetDeviceState { id, direction } => {
                CommandResult::State(self.get_device_state(&id, direction))
            }
            Command::SetDefaultDevice { id, direction } => {
                CommandResult::Done(self.set_default_device(&id, direction))
            }
            Command::RouteAppToDevice { app, device } => {
                CommandResult::Done(self.route_app_to_device(&app, &device))
            }
        }
    }
}
