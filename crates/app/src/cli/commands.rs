//! Command-line surface

use clap::{Parser, Subcommand};
use sonus_core::domain::{ChannelId, ChannelType, Command, DeviceDirection, DeviceId};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sonus")]
#[command(about = "Per-application volume mixer with virtual channels", long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration directory (defaults to the platform config dir)
    #[arg(long, value_name = "DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Seed endpoints from the host's real audio devices
    #[arg(long, global = true)]
    pub host_devices: bool,

    #[command(subcommand)]
    pub command: Option<Action>,
}

/// One line typed into the interactive shell
#[derive(Parser, Debug)]
#[command(name = "sonus", no_binary_name = true, disable_help_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub action: Action,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Action {
    /// List running applications with audio
    Apps,
    /// List output and input devices
    Devices,
    /// List devices that look like virtual audio cables
    Cables,
    /// List channels grouped by type
    Channels,
    /// Show one channel
    Channel { id: String },
    /// Create a channel
    ChannelCreate {
        name: String,
        #[arg(value_name = "output|input")]
        kind: ChannelType,
    },
    /// Remove a user channel
    ChannelRemove { id: String },
    /// Set a channel's volume (0-100, clamped)
    ChannelVolume {
        id: String,
        #[arg(allow_negative_numbers = true)]
        level: i64,
    },
    /// Toggle a channel's mute flag
    ChannelMute { id: String },
    /// Toggle solo on a channel
    ChannelSolo { id: String },
    /// Attach an application to a channel
    ChannelAddApp { id: String, app: String },
    /// Detach an application from a channel
    ChannelRemoveApp { id: String, app: String },
    /// Set an application's volume (0-100, clamped)
    AppVolume {
        app: String,
        #[arg(allow_negative_numbers = true)]
        level: i64,
    },
    /// Toggle an application's mute flag
    AppMute { app: String },
    /// Toggle solo on an application
    AppSolo { app: String },
    /// Show an application's volume and mute flag
    AppState { app: String },
    /// Route an application to an output device
    AppRoute { app: String, device: String },
    /// Show the master volume and mute flag
    Master,
    /// Set the master volume (0-100, clamped)
    MasterVolume {
        #[arg(allow_negative_numbers = true)]
        level: i64,
    },
    /// Toggle the master mute flag
    MasterMute,
    /// Set a device's volume (0-100, clamped)
    DeviceVolume {
        id: String,
        #[arg(value_name = "output|input")]
        direction: DeviceDirection,
        #[arg(allow_negative_numbers = true)]
        level: i64,
    },
    /// Toggle a device's mute flag
    DeviceMute {
        id: String,
        #[arg(value_name = "output|input")]
        direction: DeviceDirection,
    },
    /// Show a device's volume and mute flag
    DeviceState {
        id: String,
        #[arg(value_name = "output|input")]
        direction: DeviceDirection,
    },
    /// Make a device the system default
    DeviceDefault {
        id: String,
        #[arg(value_name = "output|input")]
        direction: DeviceDirection,
    },
    /// Save the current channels as a named profile
    ProfileSave { name: String },
    /// Replace the channels with a saved profile
    ProfileLoad { name: String },
    /// Delete a saved profile
    ProfileDelete { name: String },
    /// List saved profiles
    Profiles,
    /// Re-print the application list on the refresh interval
    Watch,
    /// Read commands from stdin, one per line
    Shell,
}

/// What the front end does with an [`Action`]
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Mixer(Command),
    ProfileSave(String),
    ProfileLoad(String),
    ProfileDelete(String),
    Profiles,
    Watch,
    Shell,
}

impl From<Action> for Request {
    fn from(action: Action) -> Self {
        let mixer = Request::Mixer;
        match action {
            Action::Apps => mixer(Command::ListApps),
            Action::Devices => mixer(Command::ListDevices),
            Action::Cables => mixer(Command::ListVirtualCables),
            Action::Channels => mixer(Command::ListChannels),
            Action::Channel { id } => mixer(Command::GetChannel {
                id: ChannelId::new(id),
            }),
            Action::ChannelCreate { name, kind } => mixer(Command::CreateChannel { name, kind }),
            Action::ChannelRemove { id } => mixer(Command::RemoveChannel {
                id: ChannelId::new(id),
            }),
            Action::ChannelVolume { id, level } => mixer(Command::SetChannelVolume {
                id: ChannelId::new(id),
                level,
            }),
            Action::ChannelMute { id } => mixer(Command::ToggleChannelMute {
                id: ChannelId::new(id),
            }),
            Action::ChannelSolo { id } => mixer(Command::ToggleChannelSolo {
                id: ChannelId::new(id),
            }),
            Action::ChannelAddApp { id, app } => mixer(Command::AddAppToChannel {
                id: ChannelId::new(id),
                app,
            }),
            Action::ChannelRemoveApp { id, app } => mixer(Command::RemoveAppFromChannel {
                id: ChannelId::new(id),
                app,
            }),
            Action::AppVolume { app, level } => mixer(Command::SetAppVolume { app, level }),
            Action::AppMute { app } => mixer(Command::ToggleAppMute { app }),
            Action::AppSolo { app } => mixer(Command::ToggleAppSolo { app }),
            Action::AppState { app } => mixer(Command::GetAppState { app }),
            Action::AppRoute { app, device } => mixer(Command::RouteAppToDevice {
                app,
                device: DeviceId::new(device),
            }),
            Action::Master => mixer(Command::GetMasterState),
            Action::MasterVolume { level } => mixer(Command::SetMasterVolume { level }),
            Action::MasterMute => mixer(Command::ToggleMasterMute),
            Action::DeviceVolume {
                id,
                direction,
                level,
            } => mixer(Command::SetDeviceVolume {
                id: DeviceId::new(id),
                direction,
                level,
            }),
            Action::DeviceMute { id, direction } => mixer(Command::ToggleDeviceMute {
                id: DeviceId::new(id),
                direction,
            }),
            Action::DeviceState { id, direction } => mixer(Command::GetDeviceState {
                id: DeviceId::new(id),
                direction,
            }),
            Action::DeviceDefault { id, direction } => mixer(Command::SetDefaultDevice {
                id: DeviceId::new(id),
                direction,
            }),
            Action::ProfileSave { name } => Request::ProfileSave(name),
            Action::ProfileLoad { name } => Request::ProfileLoad(name),
            Action::ProfileDelete { name } => Request::ProfileDelete(name),
            Action::Profiles => Request::Profiles,
            Action::Watch => Request::Watch,
            Action::Shell => Request::Shell,
        }
    }
}
