//! Query and aggregation for presentation
//!
//! Merges live provider data into flat views: applications deduplicated by
//! display name with internal OS helpers filtered out, and endpoints grouped
//! by direction with the default endpoint and virtual cables flagged.

use crate::domain::audio::{
    AudioSessionProvider, DeviceDirection, DeviceId, ProcessIcon, Result, SessionInfo,
};
use crate::domain::volume::VolumeLevel;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Platform executable suffix stripped from display names
pub const EXECUTABLE_SUFFIX: &str = ".exe";

/// Volume reported for an endpoint whose volume cannot be read
const FALLBACK_DEVICE_VOLUME: i64 = 50;

/// Application name as shown to the user: the executable name without the
/// platform suffix (matched case-insensitively, case of the name preserved)
pub fn display_name(process_name: &str) -> &str {
    let split = process_name.len().saturating_sub(EXECUTABLE_SUFFIX.len());
    match (process_name.get(..split), process_name.get(split..)) {
        (Some(stem), Some(suffix))
            if !stem.is_empty() && suffix.eq_ignore_ascii_case(EXECUTABLE_SUFFIX) =>
        {
            stem
        }
        _ => process_name,
    }
}

/// True when the process name contains any denylisted fragment
pub fn is_excluded(process_name: &str, excluded: &[String]) -> bool {
    let lower = process_name.to_lowercase();
    excluded
        .iter()
        .any(|fragment| !fragment.is_empty() && lower.contains(&fragment.to_lowercase()))
}

/// True when an endpoint name looks like a virtual audio cable
pub fn is_virtual_cable(device_name: &str, keywords: &[String]) -> bool {
    let lower = device_name.to_lowercase();
    keywords
        .iter()
        .any(|keyword| !keyword.is_empty() && lower.contains(&keyword.to_lowercase()))
}

/// Sessions that belong to user-facing applications
pub fn visible_sessions<'a>(
    sessions: &'a [SessionInfo],
    excluded: &'a [String],
) -> impl Iterator<Item = &'a SessionInfo> + 'a {
    sessions
        .iter()
        .filter(move |s| !is_excluded(&s.process_name, excluded))
}

/// Distinct display names of the user-facing applications, in session order
pub fn app_names(sessions: &[SessionInfo], excluded: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for session in visible_sessions(sessions, excluded) {
        let name = display_name(&session.process_name);
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// One running application with audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppView {
    pub name: String,
    pub pid: u32,
    pub volume: VolumeLevel,
    pub is_muted: bool,
    pub is_solo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<ProcessIcon>,
}

/// Every enumerated application, annotated with the current solo selection
pub fn audio_apps(
    provider: &dyn AudioSessionProvider,
    excluded: &[String],
    soloed: Option<&str>,
    with_icons: bool,
) -> Result<Vec<AppView>> {
    let sessions = provider.list_sessions()?;
    let mut apps: Vec<AppView> = Vec::new();

    for session in visible_sessions(&sessions, excluded) {
        let name = display_name(&session.process_name);
        if apps.iter().any(|a| a.name == name) {
            continue;
        }

        apps.push(AppView {
            name: name.to_string(),
            pid: session.pid,
            volume: VolumeLevel::from_scalar(session.volume_scalar),
            is_muted: session.is_muted,
            is_solo: soloed == Some(name),
            icon: if with_icons {
                provider.process_icon(session.pid)
            } else {
                None
            },
        });
    }

    debug!(count = apps.len(), total = sessions.len(), "Enumerated audio apps");
    Ok(apps)
}

/// One endpoint with its live volume state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceView {
    pub id: DeviceId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DeviceDirection,
    pub volume: VolumeLevel,
    pub is_muted: bool,
    pub is_default: bool,
    #[serde(default)]
    pub is_virtual: bool,
}

/// Endpoints grouped by direction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceGroups {
    pub output_devices: Vec<DeviceView>,
    pub input_devices: Vec<DeviceView>,
}

impl DeviceGroups {
    /// Keep only the endpoints flagged as virtual cables
    pub fn virtual_only(self) -> Self {
        let keep = |views: Vec<DeviceView>| views.into_iter().filter(|d| d.is_virtual).collect();
        Self {
            output_devices: keep(self.output_devices),
            input_devices: keep(self.input_devices),
        }
    }
}

/// Endpoints of one direction, each with volume, mute, default and
/// virtual-cable flags
pub fn device_views(
    provider: &dyn AudioSessionProvider,
    direction: DeviceDirection,
    virtual_keywords: &[String],
) -> Result<Vec<DeviceView>> {
    let endpoints = provider.list_devices(direction)?;
    let default_id = provider.default_device(direction).unwrap_or_else(|e| {
        debug!(%direction, error = %e, "Default device unavailable");
        None
    });

    let views = endpoints
        .into_iter()
        .map(|endpoint| {
            let volume = match provider.device_volume(&endpoint.id) {
                Ok(scalar) => VolumeLevel::from_scalar(scalar),
                Err(e) => {
                    debug!(device = %endpoint.id, error = %e, "Device volume unreadable, using fallback");
                    VolumeLevel::new(FALLBACK_DEVICE_VOLUME)
                }
            };
            let is_muted = provider.device_mute(&endpoint.id).unwrap_or(false);

            DeviceView {
                is_default: default_id.as_ref() == Some(&endpoint.id),
                is_virtual: is_virtual_cable(&endpoint.friendly_name, virtual_keywords),
                id: endpoint.id,
                name: endpoint.friendly_name,
                kind: direction,
                volume,
                is_muted,
            }
        })
        .collect();

    Ok(views)
}
