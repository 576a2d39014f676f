//! In-crate fake provider for unit tests

use crate::domain::audio::{
    AudioError, AudioSessionProvider, DeviceDirection, DeviceId, EndpointInfo, ProcessIcon,
    Result, SessionInfo,
};
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub(crate) struct FakeDevice {
    pub id: DeviceId,
    pub name: String,
    pub direction: DeviceDirection,
    pub volume: f32,
    pub muted: bool,
}

#[derive(Debug, Default)]
struct FakeState {
    sessions: Vec<SessionInfo>,
    devices: Vec<FakeDevice>,
    default_output: Option<DeviceId>,
    default_input: Option<DeviceId>,
    failing: HashSet<u32>,
    vanished: HashSet<u32>,
    unreadable_devices: HashSet<DeviceId>,
    mute_log: Vec<(u32, bool)>,
}

#[derive(Debug, Default)]
pub(crate) struct FakeProvider {
    state: Mutex<FakeState>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discord, Spotify and an excluded helper, plus one endpoint per direction
    pub fn seeded() -> Self {
        let provider = Self::new();
        provider.add_session("Discord.exe", 100, 0.5);
        provider.add_session("Spotify.exe", 200, 0.8);
        provider.add_session("svchost.exe", 300, 1.0);
        provider.add_device("spk", "Speakers", DeviceDirection::Output, 0.6);
        provider.add_device("mic", "Microphone", DeviceDirection::Input, 0.9);
        provider.set_default("spk", DeviceDirection::Output);
        provider.set_default("mic", DeviceDirection::Input);
        provider
    }

    pub fn add_session(&self, name: &str, pid: u32, volume: f32) {
        self.lock().sessions.push(SessionInfo {
            process_name: name.to_string(),
            pid,
            volume_scalar: volume,
            is_muted: false,
        });
    }

    pub fn add_device(&self, id: &str, name: &str, direction: DeviceDirection, volume: f32) {
        self.lock().devices.push(FakeDevice {
            id: DeviceId::new(id),
            name: name.to_string(),
            direction,
            volume,
            muted: false,
        });
    }

    pub fn set_default(&self, id: &str, direction: DeviceDirection) {
        let mut state = self.lock();
        match direction {
            DeviceDirection::Output => state.default_output = Some(DeviceId::new(id)),
            DeviceDirection::Input => state.default_input = Some(DeviceId::new(id)),
        }
    }

    pub fn fail_session(&self, pid: u32) {
        self.lock().failing.insert(pid);
    }

    /// Keep listing `pid` while every handle call reports it gone
    pub fn vanish_session(&self, pid: u32) {
        self.lock().vanished.insert(pid);
    }

    pub fn unreadable_device(&self, id: &str) {
        self.lock().unreadable_devices.insert(DeviceId::new(id));
    }

    pub fn remove_session(&self, pid: u32) {
        self.lock().sessions.retain(|s| s.pid != pid);
    }

    pub fn mute_log(&self) -> Vec<(u32, bool)> {
        self.lock().mute_log.clone()
    }

    pub fn session_muted(&self, pid: u32) -> Option<bool> {
        self.lock()
            .sessions
            .iter()
            .find(|s| s.pid == pid)
            .map(|s| s.is_muted)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn with_session<T>(&self, pid: u32, f: impl FnOnce(&mut SessionInfo) -> T) -> Result<T> {
        let mut state = self.lock();
        if state.failing.contains(&pid) {
            return Err(AudioError::OsError(format!("session {} failed", pid)));
        }
        if state.vanished.contains(&pid) {
            return Err(AudioError::SessionNotFound(pid.to_string()));
        }
        state
            .sessions
            .iter_mut()
            .find(|s| s.pid == pid)
            .map(f)
            .ok_or_else(|| AudioError::SessionNotFound(pid.to_string()))
    }

    fn with_device<T>(&self, id: &DeviceId, f: impl FnOnce(&mut FakeDevice) -> T) -> Result<T> {
        let mut state = self.lock();
        if state.unreadable_devices.contains(id) {
            return Err(AudioError::OsError(format!("device {} unreadable", id)));
        }
        state
            .devices
            .iter_mut()
            .find(|d| d.id == *id)
            .map(f)
            .ok_or_else(|| AudioError::DeviceNotFound(id.to_string()))
    }
}

impl AudioSessionProvider for FakeProvider {
    fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        Ok(self.lock().sessions.clone())
    }

    fn list_devices(&self, direction: DeviceDirection) -> Result<Vec<EndpointInfo>> {
        Ok(self
            .lock()
            .devices
            .iter()
            .filter(|d| d.direction == direction)
            .map(|d| EndpointInfo {
                id: d.id.clone(),
                friendly_name: d.name.clone(),
            })
            .collect())
    }

    fn default_device(&self, direction: DeviceDirection) -> Result<Option<DeviceId>> {
        let state = self.lock();
        Ok(match direction {
            DeviceDirection::Output => state.default_output.clone(),
            DeviceDirection::Input => state.default_input.clone(),
        })
    }

    fn session_volume(&self, pid: u32) -> Result<f32> {
        self.with_session(pid, |s| s.volume_scalar)
    }

    fn set_session_volume(&self, pid: u32, scalar: f32) -> Result<()> {
        self.with_session(pid, |s| s.volume_scalar = scalar)
    }

    fn session_mute(&self, pid: u32) -> Result<bool> {
        self.with_session(pid, |s| s.is_muted)
    }

    fn set_session_mute(&self, pid: u32, muted: bool) -> Result<()> {
        self.with_session(pid, |s| s.is_muted = muted)?;
        self.lock().mute_log.push((pid, muted));
        Ok(())
    }

    fn device_volume(&self, id: &DeviceId) -> Result<f32> {
        self.with_device(id, |d| d.volume)
    }

    fn set_device_volume(&self, id: &DeviceId, scalar: f32) -> Result<()> {
        self.with_device(id, |d| d.volume = scalar)
    }

    fn device_mute(&self, id: &DeviceId) -> Result<bool> {
        self.with_device(id, |d| d.muted)
    }

    fn set_device_mute(&self, id: &DeviceId, muted: bool) -> Result<()> {
        self.with_device(id, |d| d.muted = muted)
    }

    fn set_default_device(&self, id: &DeviceId, direction: DeviceDirection) -> Result<()> {
        self.with_device(id, |_| ())?;
        self.set_default(id.as_str(), direction);
        Ok(())
    }

    fn process_icon(&self, pid: u32) -> Option<ProcessIcon> {
        (pid == 100).then(|| ProcessIcon {
            mime_type: "image/png".to_string(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        })
    }
}
