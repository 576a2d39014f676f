//! Application solo, volume and device control through the mixer service

use sonus_core::domain::{
    AudioSessionProvider, AudioSettings, Command, CommandExecutor, CommandResult, DeviceDirection,
    DeviceId, VolumeLevel,
};
use sonus_core::MixerService;
use sonus_infra::{MuteCommand, SimulatedProvider};
use std::sync::Arc;

const DISCORD: u32 = 4012;
const SPOTIFY: u32 = 5120;
const CHROME_A: u32 = 6204;
const CHROME_B: u32 = 6231;
const SVCHOST: u32 = 812;

fn setup() -> (Arc<SimulatedProvider>, MixerService) {
    let provider = Arc::new(SimulatedProvider::demo());
    let service = MixerService::new(provider.clone(), AudioSettings::default());
    (provider, service)
}

fn muted(provider: &SimulatedProvider, pid: u32) -> bool {
    provider.session_mute(pid).unwrap()
}

// ============================================================================
// APPLICATION SOLO
// ============================================================================

#[test]
fn test_solo_mutes_every_other_app() {
    let (provider, service) = setup();

    assert_eq!(service.toggle_app_solo("Discord"), Some(true));

    assert!(!muted(&provider, DISCORD));
    assert!(muted(&provider, SPOTIFY));
    assert!(muted(&provider, CHROME_A));
    assert!(muted(&provider, CHROME_B));
    assert!(!muted(&provider, SVCHOST), "excluded helpers are left alone");
}

#[test]
fn test_solo_twice_restores_everything() {
    let (provider, service) = setup();

    assert_eq!(service.toggle_app_solo("Spotify"), Some(true));
    assert_eq!(service.toggle_app_solo("Spotify"), Some(false));

    assert_eq!(service.soloed_app(), None);
    for pid in [DISCORD, SPOTIFY, CHROME_A, CHROME_B] {
        assert!(!muted(&provider, pid), "pid {} still muted", pid);
    }
}

#[test]
fn test_switching_solo_target() {
    let (provider, service) = setup();

    service.toggle_app_solo("Discord");
    assert_eq!(service.toggle_app_solo("chrome"), Some(true));

    assert_eq!(service.soloed_app().as_deref(), Some("chrome"));
    assert!(muted(&provider, DISCORD));
    assert!(!muted(&provider, CHROME_A));
    assert!(!muted(&provider, CHROME_B));

    let apps = service.get_audio_apps();
    let soloed: Vec<_> = apps.iter().filter(|a| a.is_solo).map(|a| a.name.as_str()).collect();
    assert_eq!(soloed, vec!["chrome"]);
}

#[test]
fn test_solo_unknown_app_issues_no_commands() {
    let (provider, service) = setup();

    assert_eq!(service.toggle_app_solo("Winamp"), None);
    assert_eq!(service.toggle_app_solo("svchost"), None);
    assert!(provider.mute_log().is_empty());
}

#[test]
fn test_solo_partial_failure_is_not_rolled_back() {
    let (provider, service) = setup();
    provider.fail_session(CHROME_A);

    assert_eq!(service.toggle_app_solo("Discord"), None);
    assert_eq!(
        provider.mute_log(),
        vec![
            MuteCommand {
                pid: DISCORD,
                muted: false
            },
            MuteCommand {
                pid: SPOTIFY,
                muted: true
            },
        ]
    );
    assert!(muted(&provider, SPOTIFY));
}

#[test]
fn test_app_list_dedups_and_filters() {
    let (_, service) = setup();

    let names: Vec<String> = service.get_audio_apps().into_iter().map(|a| a.name).collect();
    assert_eq!(names, vec!["Discord", "Spotify", "chrome"]);
}

// ============================================================================
// VOLUME FAÇADE
// ============================================================================

#[test]
fn test_app_volume_clamps() {
    let (provider, service) = setup();

    assert_eq!(service.set_app_volume("Discord", 150), Some(VolumeLevel::new(100)));
    assert_eq!(provider.session_volume(DISCORD).unwrap(), 1.0);

    assert_eq!(service.set_app_volume("Discord", -10), Some(VolumeLevel::new(0)));
    assert_eq!(provider.session_volume(DISCORD).unwrap(), 0.0);
}

#[test]
fn test_app_vanishing_between_calls() {
    let (provider, service) = setup();

    assert!(service.get_app_state("Spotify").is_some());
    provider.remove_session(SPOTIFY);

    assert_eq!(service.toggle_app_mute("Spotify"), None);
    assert_eq!(service.set_app_volume("Spotify", 40), None);
}

#[test]
fn test_master_volume() {
    let (_, service) = setup();

    let before = service.get_master_state().unwrap();
    assert_eq!(before.volume, VolumeLevel::new(70));
    assert!(!before.is_muted);

    assert_eq!(service.set_master_volume(33), Some(VolumeLevel::new(33)));
    assert_eq!(service.toggle_master_mute(), Some(true));
    assert_eq!(service.toggle_master_mute(), Some(false));
}

#[test]
fn test_device_listing_and_default_switch() {
    let (provider, service) = setup();
    provider.add_endpoint("headset", "USB Headset", DeviceDirection::Output, 0.4);

    let devices = service.get_devices();
    assert_eq!(devices.output_devices.len(), 2);
    assert_eq!(devices.input_devices.len(), 1);
    assert!(devices.output_devices.iter().any(|d| d.is_default && d.name == "Speakers"));

    let headset = DeviceId::new("headset");
    assert!(service.set_default_device(&headset, DeviceDirection::Output));
    assert!(!service.set_default_device(&headset, DeviceDirection::Input));

    let devices = service.get_devices();
    let default: Vec<_> = devices
        .output_devices
        .iter()
        .filter(|d| d.is_default)
        .map(|d| d.id.clone())
        .collect();
    assert_eq!(default, vec![headset]);
}

#[tokio::test]
async fn test_virtual_cables_are_flagged_and_listed() {
    let (provider, service) = setup();
    provider.add_endpoint(
        "vb-cable",
        "CABLE Input (VB-Audio Virtual Cable)",
        DeviceDirection::Output,
        1.0,
    );

    let devices = service.get_devices();
    let flagged: Vec<_> = devices
        .output_devices
        .iter()
        .map(|d| (d.id.as_str(), d.is_virtual))
        .collect();
    assert_eq!(flagged, vec![("speakers", false), ("vb-cable", true)]);

    let CommandResult::Devices(cables) = service.execute(Command::ListVirtualCables).await else {
        panic!("virtual cable listing returned the wrong result");
    };
    assert_eq!(cables.output_devices.len(), 1);
    assert_eq!(cables.output_devices[0].name, "CABLE Input (VB-Audio Virtual Cable)");
    assert!(cables.input_devices.is_empty());
}

#[tokio::test]
async fn test_command_bus_device_volume() {
    let (provider, service) = setup();

    let result = service
        .execute(Command::SetDeviceVolume {
            id: DeviceId::new("microphone"),
            direction: DeviceDirection::Input,
            level: 250,
        })
        .await;
    assert_eq!(result, CommandResult::Done(true));
    assert_eq!(provider.device_volume(&DeviceId::new("microphone")).unwrap(), 1.0);

    let result = service
        .execute(Command::GetDeviceState {
            id: DeviceId::new("microphone"),
            direction: DeviceDirection::Output,
        })
        .await;
    assert_eq!(result, CommandResult::State(None));
}

#[test]
fn test_routing_reports_unsupported() {
    let (_, service) = setup();
    assert!(!service.route_app_to_device("Discord", &DeviceId::new("speakers")));
    assert!(!service.route_app_to_device("Winamp", &DeviceId::new("speakers")));
}
