//! In-memory audio session provider
//!
//! Holds sessions and endpoints the way the OS would, answers every
//! [`AudioSessionProvider`] call from that state, and records the session
//! mute commands it receives. Failures can be injected per session so the
//! partial-failure and vanished-session paths of the mixer can be exercised.

use super::cpal_backend::CpalDeviceCatalog;
use super::device_switch::ShellDeviceSwitcher;
use sonus_core::domain::audio::{
    AudioError, AudioSessionProvider, DeviceDirection, DeviceId, EndpointInfo, ProcessIcon,
    Result, SessionInfo,
};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, trace};

/// One mute command issued to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuteCommand {
    pub pid: u32,
    pub muted: bool,
}

#[derive(Debug, Clone)]
struct SimSession {
    process_name: String,
    pid: u32,
    volume: f32,
    muted: bool,
    icon: Option<ProcessIcon>,
}

#[derive(Debug, Clone)]
struct SimEndpoint {
    id: DeviceId,
    name: String,
    direction: DeviceDirection,
    volume: f32,
    muted: bool,
}

#[derive(Debug, Default)]
struct SimState {
    sessions: Vec<SimSession>,
    endpoints: Vec<SimEndpoint>,
    default_output: Option<DeviceId>,
    default_input: Option<DeviceId>,
    failing: HashSet<u32>,
    mute_log: Vec<MuteCommand>,
}

impl SimState {
    fn session_mut(&mut self, pid: u32) -> Result<&mut SimSession> {
        if self.failing.contains(&pid) {
            return Err(AudioError::OsError(format!("session {} is not responding", pid)));
        }
        self.sessions
            .iter_mut()
            .find(|s| s.pid == pid)
            .ok_or_else(|| AudioError::SessionNotFound(pid.to_string()))
    }

    fn endpoint_mut(&mut self, id: &DeviceId) -> Result<&mut SimEndpoint> {
        self.endpoints
            .iter_mut()
            .find(|e| e.id == *id)
            .ok_or_else(|| AudioError::DeviceNotFound(id.to_string()))
    }

    fn default_slot(&mut self, direction: DeviceDirection) -> &mut Option<DeviceId> {
        match direction {
            DeviceDirection::Output => &mut self.default_output,
            DeviceDirection::Input => &mut self.default_input,
        }
    }
}

/// Session provider backed by in-memory state
#[derive(Debug, Default)]
pub struct SimulatedProvider {
    state: Mutex<SimState>,
    switcher: Option<ShellDeviceSwitcher>,
}

impl SimulatedProvider {
    /// Provider with no sessions and no endpoints
    pub fn new() -> Self {
        Self::default()
    }

    /// A few familiar applications, an OS helper, and one endpoint per direction
    pub fn demo() -> Self {
        let provider = Self::new();
        provider.add_demo_sessions();
        provider.add_endpoint("speakers", "Speakers", DeviceDirection::Output, 0.7);
        provider.add_endpoint("microphone", "Microphone", DeviceDirection::Input, 0.8);
        provider.set_default("speakers", DeviceDirection::Output);
        provider.set_default("microphone", DeviceDirection::Input);
        provider
    }

    /// Demo sessions with endpoints taken from the host's real devices
    pub fn with_catalog(catalog: &CpalDeviceCatalog) -> Result<Self> {
        let provider = Self::new();
        provider.add_demo_sessions();

        for direction in [DeviceDirection::Output, DeviceDirection::Input] {
            for endpoint in catalog.endpoints(direction)? {
                provider.add_endpoint(
                    endpoint.id.as_str(),
                    &endpoint.friendly_name,
                    direction,
                    1.0,
                );
            }
            if let Some(default) = catalog.default_endpoint(direction) {
                provider.set_default(default.id.as_str(), direction);
            }
        }

        info!("Simulated provider seeded from host devices");
        Ok(provider)
    }

    /// Delegate default-device changes to the PowerShell switcher
    pub fn with_switcher(mut self, switcher: ShellDeviceSwitcher) -> Self {
        self.switcher = Some(switcher);
        self
    }

    fn add_demo_sessions(&self) {
        self.add_session("Discord.exe", 4012, 0.8);
        self.add_session("Spotify.exe", 5120, 0.65);
        self.add_session("chrome.exe", 6204, 1.0);
        self.add_session("chrome.exe", 6231, 0.5);
        self.add_session("svchost.exe", 812, 1.0);
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_session(&self, process_name: &str, pid: u32, volume: f32) {
        debug!(process = process_name, pid, "Adding simulated session");
        self.state().sessions.push(SimSession {
            process_name: process_name.to_string(),
            pid,
            volume: volume.clamp(0.0, 1.0),
            muted: false,
            icon: None,
        });
    }

    pub fn set_icon(&self, pid: u32, icon: ProcessIcon) {
        if let Some(session) = self.state().sessions.iter_mut().find(|s| s.pid == pid) {
            session.icon = Some(icon);
        }
    }

    /// Simulate the process exiting
    pub fn remove_session(&self, pid: u32) {
        self.state().sessions.retain(|s| s.pid != pid);
    }

    /// Make every call addressed to `pid` fail with an OS error
    pub fn fail_session(&self, pid: u32) {
        self.state().failing.insert(pid);
    }

    pub fn add_endpoint(&self, id: &str, name: &str, direction: DeviceDirection, volume: f32) {
        self.state().endpoints.push(SimEndpoint {
            id: DeviceId::new(id),
            name: name.to_string(),
            direction,
            volume: volume.clamp(0.0, 1.0),
            muted: false,
        });
    }

    pub fn set_default(&self, id: &str, direction: DeviceDirection) {
        *self.state().default_slot(direction) = Some(DeviceId::new(id));
    }

    /// Every session mute command received so far, in order
    pub fn mute_log(&self) -> Vec<MuteCommand> {
        self.state().mute_log.clone()
    }

    pub fn clear_mute_log(&self) {
        self.state().mute_log.clear();
    }
}

impl AudioSessionProvider for SimulatedProvider {
    fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        Ok(self
            .state()
            .sessions
            .iter()
            .map(|s| SessionInfo {
                process_name: s.process_name.clone(),
                pid: s.pid,
                volume_scalar: s.volume,
                is_muted: s.muted,
            })
            .collect())
    }

    fn list_devices(&self, direction: DeviceDirection) -> Result<Vec<EndpointInfo>> {
        Ok(self
            .state()
            .endpoints
            .iter()
            .filter(|e| e.direction == direction)
            .map(|e| EndpointInfo {
                id: e.id.clone(),
                friendly_name: e.name.clone(),
            })
            .collect())
    }

    fn default_device(&self, direction: DeviceDirection) -> Result<Option<DeviceId>> {
        Ok(self.state().default_slot(direction).clone())
    }

    fn session_volume(&self, pid: u32) -> Result<f32> {
        Ok(self.state().session_mut(pid)?.volume)
    }

    fn set_session_volume(&self, pid: u32, scalar: f32) -> Result<()> {
        self.state().session_mut(pid)?.volume = scalar.clamp(0.0, 1.0);
        trace!(pid, scalar, "Session volume written");
        Ok(())
    }

    fn session_mute(&self, pid: u32) -> Result<bool> {
        Ok(self.state().session_mut(pid)?.muted)
    }

    fn set_session_mute(&self, pid: u32, muted: bool) -> Result<()> {
        let mut state = self.state();
        state.session_mut(pid)?.muted = muted;
        state.mute_log.push(MuteCommand { pid, muted });
        trace!(pid, muted, "Session mute written");
        Ok(())
    }

    fn device_volume(&self, id: &DeviceId) -> Result<f32> {
        Ok(self.state().endpoint_mut(id)?.volume)
    }

    fn set_device_volume(&self, id: &DeviceId, scalar: f32) -> Result<()> {
        self.state().endpoint_mut(id)?.volume = scalar.clamp(0.0, 1.0);
        Ok(())
    }

    fn device_mute(&self, id: &DeviceId) -> Result<bool> {
        Ok(self.state().endpoint_mut(id)?.muted)
    }

    fn set_device_mute(&self, id: &DeviceId, muted: bool) -> Result<()> {
        self.state().endpoint_mut(id)?.muted = muted;
        Ok(())
    }

    fn set_default_device(&self, id: &DeviceId, direction: DeviceDirection) -> Result<()> {
        self.state().endpoint_mut(id)?;

        if let Some(switcher) = &self.switcher {
            switcher.switch(id, direction)?;
        }

        *self.state().default_slot(direction) = Some(id.clone());
        Ok(())
    }

    fn process_icon(&self, pid: u32) -> Option<ProcessIcon> {
        let icon = self
            .state()
            .sessions
            .iter()
            .find(|s| s.pid == pid)
            .and_then(|s| s.icon.clone());
        if icon.is_none() {
            trace!(pid, "No icon for session");
        }
        icon
    }

    fn route_session(&self, pid: u32, device: &DeviceId) -> Result<()> {
        let mut state = self.state();
        state.session_mut(pid)?;
        state.endpoint_mut(device)?;
        debug!(pid, device = %device, "Routing request on simulated provider");
        Err(AudioError::Unsupported(
            "per-application routing is not simulated".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_demo_layout() {
        let provider = SimulatedProvider::demo();

        assert_eq!(provider.list_sessions().unwrap().len(), 5);
        assert_eq!(provider.list_devices(DeviceDirection::Output).unwrap().len(), 1);
        assert_eq!(
            provider.default_device(DeviceDirection::Input).unwrap(),
            Some(DeviceId::new("microphone"))
        );
    }

    #[test]
    fn test_session_volume_clamped() {
        let provider = SimulatedProvider::demo();

        provider.set_session_volume(4012, 1.5).unwrap();
        assert_eq!(provider.session_volume(4012).unwrap(), 1.0);
    }

    #[test]
    fn test_mute_log_records_commands() {
        let provider = SimulatedProvider::demo();

        provider.set_session_mute(4012, true).unwrap();
        provider.set_session_mute(5120, false).unwrap();

        assert_eq!(
            provider.mute_log(),
            vec![
                MuteCommand { pid: 4012, muted: true },
                MuteCommand { pid: 5120, muted: false },
            ]
        );
        provider.clear_mute_log();
        assert!(provider.mute_log().is_empty());
    }

    #[test]
    fn test_removed_and_failing_sessions() {
        let provider = SimulatedProvider::demo();

        provider.remove_session(4012);
        assert!(matches!(
            provider.session_mute(4012),
            Err(AudioError::SessionNotFound(_))
        ));

        provider.fail_session(5120);
        assert!(matches!(
            provider.set_session_mute(5120, true),
            Err(AudioError::OsError(_))
        ));
        assert!(provider.mute_log().is_empty());
    }

    #[test]
    fn test_set_default_device() {
        let provider = SimulatedProvider::demo();
        provider.add_endpoint("hdmi", "HDMI", DeviceDirection::Output, 1.0);

        provider
            .set_default_device(&DeviceId::new("hdmi"), DeviceDirection::Output)
            .unwrap();
        assert_eq!(
            provider.default_device(DeviceDirection::Output).unwrap(),
            Some(DeviceId::new("hdmi"))
        );

        assert!(matches!(
            provider.set_default_device(&DeviceId::new("nope"), DeviceDirection::Output),
            Err(AudioError::DeviceNotFound(_))
        ));
    }

    #[test]
    fn test_switcher_failure_keeps_default() {
        let switcher = ShellDeviceSwitcher::new(Duration::from_secs(1))
            .with_program("sonus-definitely-not-a-real-program");
        let provider = SimulatedProvider::demo().with_switcher(switcher);
        provider.add_endpoint("hdmi", "HDMI", DeviceDirection::Output, 1.0);

        let result = provider.set_default_device(&DeviceId::new("hdmi"), DeviceDirection::Output);

        assert!(matches!(result, Err(AudioError::ExternalCommand(_))));
        assert_eq!(
            provider.default_device(DeviceDirection::Output).unwrap(),
            Some(DeviceId::new("speakers"))
        );
    }

    #[test]
    fn test_icons() {
        let provider = SimulatedProvider::demo();
        provider.set_icon(
            4012,
            ProcessIcon {
                mime_type: "image/png".to_string(),
                bytes: vec![1, 2, 3],
            },
        );

        assert!(provider.process_icon(4012).is_some());
        assert!(provider.process_icon(5120).is_none());
    }

    #[test]
    fn test_routing_is_unsupported() {
        let provider = SimulatedProvider::demo();
        assert!(matches!(
            provider.route_session(4012, &DeviceId::new("speakers")),
            Err(AudioError::Unsupported(_))
        ));
    }
}
