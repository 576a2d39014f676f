//! Domain entities and business rules

pub mod audio;
pub mod channel;
pub mod command;
pub mod config;
pub mod query;
pub mod service;
pub mod solo;
pub mod volume;

#[cfg(test)]
pub(crate) mod testing;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{
    AudioError, AudioSessionProvider, DeviceDirection, DeviceId, EndpointInfo, ProcessIcon,
    SessionInfo,
};
pub use channel::{
    Channel, ChannelGroups, ChannelId, ChannelRecord, ChannelStore, ChannelType, SoloState,
};
pub use command::{Command, CommandExecutor, CommandResult};
pub use config::{
    AppConfig, AudioSettings, ConfigError, ConfigManager, Profile, ProfileEvent, ProfileManager,
    ProfileWatcher, SonusConfig,
};
pub use query::{AppView, DeviceGroups, DeviceView};
pub use solo::AppSoloCoordinator;
pub use volume::{ControlError, TargetKind, VolumeControl, VolumeLevel, VolumeState};
