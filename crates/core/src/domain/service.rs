//! Mixer service: the presentation contract
//!
//! `MixerService` owns the channel store and the application solo selection
//! behind one mutex, holds the injected session provider, and is the only
//! place where a [`ControlError`] is turned into the primitive `Option` /
//! `bool` outcome the presentation layer sees. Every such conversion logs
//! exactly once: `warn!` for a target that does not resolve, `error!` for a
//! collaborator fault.

use crate::domain::audio::{AudioError, AudioSessionProvider, DeviceDirection, DeviceId};
use crate::domain::channel::{
    Channel, ChannelGroups, ChannelId, ChannelRecord, ChannelStore, ChannelType,
};
use crate::domain::config::AudioSettings;
use crate::domain::query::{self, AppView, DeviceGroups};
use crate::domain::solo::AppSoloCoordinator;
use crate::domain::volume::{
    AppVolumeController, ChannelVolumeControl, ControlError, ControlResult,
    DeviceVolumeController, TargetKind, VolumeControl, VolumeLevel, VolumeState,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

/// State serialized behind the service mutex
#[derive(Debug)]
struct MixerState {
    channels: ChannelStore,
    solo: AppSoloCoordinator,
}

/// Mixer control core shared by every presentation surface
pub struct MixerService {
    provider: Arc<dyn AudioSessionProvider>,
    settings: AudioSettings,
    state: Mutex<MixerState>,
}

impl MixerService {
    /// Service with only the two built-in channels
    pub fn new(provider: Arc<dyn AudioSessionProvider>, settings: AudioSettings) -> Self {
        Self::with_channels(provider, settings, ChannelStore::new())
    }

    pub fn with_channels(
        provider: Arc<dyn AudioSessionProvider>,
        settings: AudioSettings,
        channels: ChannelStore,
    ) -> Self {
        debug!(channels = channels.len(), "Mixer service created");
        Self {
            provider,
            settings,
            state: Mutex::new(MixerState {
                channels,
                solo: AppSoloCoordinator::new(),
            }),
        }
    }

    /// Service hydrated from persisted channel records
    pub fn from_records(
        provider: Arc<dyn AudioSessionProvider>,
        settings: AudioSettings,
        records: impl IntoIterator<Item = ChannelRecord>,
    ) -> Self {
        Self::with_channels(provider, settings, ChannelStore::from_records(records))
    }

    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    fn state(&self) -> MutexGuard<'_, MixerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn provider(&self) -> &dyn AudioSessionProvider {
        self.provider.as_ref()
    }

    // ----- channels -----

    pub fn create_channel(&self, name: &str, kind: ChannelType) -> Channel {
        self.state().channels.create_channel(name, kind)
    }

    pub fn remove_channel(&self, id: &ChannelId) -> bool {
        self.state().channels.remove_channel(id)
    }

    pub fn get_channel(&self, id: &ChannelId) -> Option<Channel> {
        self.state().channels.channel(id).cloned()
    }

    pub fn list_channels(&self) -> ChannelGroups {
        self.state().channels.list_by_type()
    }

    pub fn set_channel_volume(&self, id: &ChannelId, level: i64) -> Option<VolumeLevel> {
        self.state().channels.set_channel_volume(id, level)
    }

    pub fn toggle_channel_mute(&self, id: &ChannelId) -> Option<bool> {
        self.state().channels.toggle_channel_mute(id)
    }

    pub fn toggle_channel_solo(&self, id: &ChannelId) -> Option<bool> {
        self.state().channels.toggle_channel_solo(id)
    }

    pub fn get_channel_state(&self, id: &ChannelId) -> Option<VolumeState> {
        let mut state = self.state();
        let control = ChannelVolumeControl::new(&mut state.channels, id.clone());
        settle("get channel state", control.state())
    }

    pub fn add_app_to_channel(&self, id: &ChannelId, app_name: &str) -> bool {
        self.state().channels.add_app_to_channel(id, app_name)
    }

    pub fn remove_app_from_channel(&self, id: &ChannelId, app_name: &str) -> bool {
        self.state().channels.remove_app_from_channel(id, app_name)
    }

    /// Persistable records for every channel, in insertion order
    pub fn channel_records(&self) -> Vec<ChannelRecord> {
        self.state().channels.records()
    }

    /// Replace the channel set, keeping the built-ins guaranteed
    pub fn apply_channel_records(&self, records: impl IntoIterator<Item = ChannelRecord>) {
        let store = ChannelStore::from_records(records);
        info!(channels = store.len(), "Channel layout applied");
        self.state().channels = store;
    }

    // ----- applications -----

    /// Every visible application, annotated with the solo selection
    pub fn get_audio_apps(&self) -> Vec<AppView> {
        let state = self.state();
        let result = query::audio_apps(
            self.provider(),
            &self.settings.excluded_processes,
            state.solo.soloed_app(),
            self.settings.show_app_icons,
        );
        settle("list audio apps", result.map_err(ControlError::from)).unwrap_or_default()
    }

    pub fn toggle_app_solo(&self, app_name: &str) -> Option<bool> {
        let mut state = self.state();
        let result =
            state
                .solo
                .toggle_app_solo(self.provider(), &self.settings.excluded_processes, app_name);
        settle("toggle app solo", result)
    }

    pub fn soloed_app(&self) -> Option<String> {
        self.state().solo.soloed_app().map(str::to_string)
    }

    pub fn set_app_volume(&self, app_name: &str, level: i64) -> Option<VolumeLevel> {
        let result = AppVolumeController::new(self.provider(), app_name)
            .and_then(|mut app| app.set_volume(level));
        settle("set app volume", result)
    }

    pub fn toggle_app_mute(&self, app_name: &str) -> Option<bool> {
        let result = AppVolumeController::new(self.provider(), app_name)
            .and_then(|mut app| app.toggle_mute());
        settle("toggle app mute", result)
    }

    pub fn get_app_state(&self, app_name: &str) -> Option<VolumeState> {
        let result =
            AppVolumeController::new(self.provider(), app_name).and_then(|app| app.state());
        settle("get app state", result)
    }

    // ----- master -----

    pub fn get_master_state(&self) -> Option<VolumeState> {
        let result = DeviceVolumeController::master(self.provider(), DeviceDirection::Output)
            .and_then(|master| master.state());
        settle("get master state", result)
    }

    pub fn set_master_volume(&self, level: i64) -> Option<VolumeLevel> {
        let result = DeviceVolumeController::master(self.provider(), DeviceDirection::Output)
            .and_then(|mut master| master.set_volume(level));
        settle("set master volume", result)
    }

    pub fn toggle_master_mute(&self) -> Option<bool> {
        let result = DeviceVolumeController::master(self.provider(), DeviceDirection::Output)
            .and_then(|mut master| master.toggle_mute());
        settle("toggle master mute", result)
    }

    // ----- devices -----

    /// Endpoints of both directions; a direction that cannot be enumerated
    /// comes back empty
    pub fn get_devices(&self) -> DeviceGroups {
        let list = |direction| {
            settle(
                "list devices",
                query::device_views(
                    self.provider(),
                    direction,
                    &self.settings.virtual_cable_keywords,
                )
                .map_err(ControlError::from),
            )
            .unwrap_or_default()
        };

        DeviceGroups {
            output_devices: list(DeviceDirection::Output),
            input_devices: list(DeviceDirection::Input),
        }
    }

    /// Endpoints whose names match a virtual-cable keyword, the candidate
    /// targets for routing an application
    pub fn get_virtual_cables(&self) -> DeviceGroups {
        let cables = self.get_devices().virtual_only();
        debug!(
            outputs = cables.output_devices.len(),
            inputs = cables.input_devices.len(),
            "Virtual cables listed"
        );
        cables
    }

    pub fn set_device_volume(&self, id: &DeviceId, direction: DeviceDirection, level: i64) -> bool {
        let result = DeviceVolumeController::new(self.provider(), id, direction)
            .and_then(|mut device| device.set_volume(level));
        settle("set device volume", result).is_some()
    }

    pub fn toggle_device_mute(&self, id: &DeviceId, direction: DeviceDirection) -> Option<bool> {
        let result = DeviceVolumeController::new(self.provider(), id, direction)
            .and_then(|mut device| device.toggle_mute());
        settle("toggle device mute", result)
    }

    pub fn get_device_state(&self, id: &DeviceId, direction: DeviceDirection) -> Option<VolumeState> {
        let result = DeviceVolumeController::new(self.provider(), id, direction)
            .and_then(|device| device.state());
        settle("get device state", result)
    }

    /// Make `id` the OS default endpoint for `direction`
    pub fn set_default_device(&self, id: &DeviceId, direction: DeviceDirection) -> bool {
        let result = self.resolve_device(id, direction).and_then(|id| {
            self.provider().set_default_device(&id, direction)?;
            info!(device = %id, %direction, "Default device changed");
            Ok(())
        });
        settle("set default device", result).is_some()
    }

    /// Route an application's output to a specific endpoint
    pub fn route_app_to_device(&self, app_name: &str, device_id: &DeviceId) -> bool {
        let result = AppVolumeController::new(self.provider(), app_name).and_then(|app| {
            let pid = app
                .pid()
                .ok_or_else(|| ControlError::not_found(TargetKind::Application, app_name))?;
            let device = self.resolve_device(device_id, DeviceDirection::Output)?;
            match self.provider().route_session(pid, &device) {
                Ok(()) => {
                    info!(app = app_name, pid, device = %device, "Application routed");
                    Ok(true)
                }
                Err(AudioError::Unsupported(reason)) => {
                    warn!(app = app_name, %reason, "Per-application routing unavailable");
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        });
        settle("route app to device", result).unwrap_or(false)
    }

    fn resolve_device(&self, id: &DeviceId, direction: DeviceDirection) -> ControlResult<DeviceId> {
        let found = self
            .provider()
            .list_devices(direction)?
            .into_iter()
            .any(|d| d.id == *id);

        if found {
            Ok(id.clone())
        } else {
            Err(ControlError::not_found(TargetKind::Device, id.as_str()))
        }
    }
}

/// Collapse a control result into its presentation form, logging the failure
fn settle<T>(operation: &str, result: ControlResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e @ ControlError::NotFound { .. }) => {
            warn!(operation, error = %e, "Target not found");
            None
        }
        Err(e) => {
            error!(operation, error = %e, "Operation failed");
            None
        }
    }
}
