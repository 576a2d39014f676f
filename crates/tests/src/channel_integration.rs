//! Channel store behaviour through the mixer service

use sonus_core::domain::{
    AudioSettings, ChannelId, ChannelType, Command, CommandExecutor, CommandResult, SoloState,
    VolumeLevel,
};
use sonus_core::MixerService;
use sonus_infra::SimulatedProvider;
use std::sync::Arc;

fn service() -> MixerService {
    MixerService::new(Arc::new(SimulatedProvider::demo()), AudioSettings::default())
}

#[test]
fn test_builtins_present_and_permanent() {
    let service = service();

    let groups = service.list_channels();
    assert_eq!(groups.output_channels.len(), 1);
    assert_eq!(groups.input_channels.len(), 1);
    assert_eq!(groups.output_channels[0].name, "Principal");
    assert_eq!(groups.input_channels[0].name, "Microfone");

    assert!(!service.remove_channel(&ChannelId::main_output()));
    assert!(!service.remove_channel(&ChannelId::main_input()));
    assert!(service.get_channel(&ChannelId::main_output()).is_some());
}

#[test]
fn test_created_channels_are_unique_and_listed_after_main() {
    let service = service();

    let a = service.create_channel("Music", ChannelType::Output);
    let b = service.create_channel("Music", ChannelType::Output);
    let c = service.create_channel("Voice", ChannelType::Input);

    assert_ne!(a.id, b.id);
    assert_eq!(a.color, b.color);
    assert_eq!(a.volume, VolumeLevel::new(80));

    let groups = service.list_channels();
    let outputs: Vec<_> = groups.output_channels.iter().map(|c| c.id.clone()).collect();
    assert_eq!(outputs, vec![ChannelId::main_output(), a.id, b.id]);
    assert_eq!(groups.input_channels[1].id, c.id);
}

#[test]
fn test_solo_scoped_to_type() {
    let service = service();
    let music = service.create_channel("Music", ChannelType::Output).id;
    let chat = service.create_channel("Chat", ChannelType::Output).id;
    let voice = service.create_channel("Voice", ChannelType::Input).id;

    assert_eq!(service.toggle_channel_solo(&music), Some(true));

    let main = service.get_channel(&ChannelId::main_output()).unwrap();
    assert!(main.is_muted && !main.is_solo);
    assert!(service.get_channel(&chat).unwrap().is_muted);
    let music_ch = service.get_channel(&music).unwrap();
    assert!(music_ch.is_solo && !music_ch.is_muted);

    // inputs are untouched
    assert!(!service.get_channel(&voice).unwrap().is_muted);
    assert!(!service.get_channel(&ChannelId::main_input()).unwrap().is_muted);
}

#[test]
fn test_solo_moves_between_siblings() {
    let service = service();
    let music = service.create_channel("Music", ChannelType::Output).id;
    let chat = service.create_channel("Chat", ChannelType::Output).id;

    service.toggle_channel_solo(&music);
    assert_eq!(service.toggle_channel_solo(&chat), Some(true));

    let soloed: Vec<_> = service
        .list_channels()
        .output_channels
        .into_iter()
        .filter(|c| c.is_solo)
        .map(|c| c.id)
        .collect();
    assert_eq!(soloed, vec![chat.clone()]);
    assert!(service.get_channel(&music).unwrap().is_muted);

    assert_eq!(service.toggle_channel_solo(&chat), Some(false));
    for channel in service.list_channels().output_channels {
        assert!(!channel.is_muted && !channel.is_solo, "{} left muted", channel.id);
    }
}

#[test]
fn test_solo_disable_unmutes_independently_muted_sibling() {
    let service = service();
    let music = service.create_channel("Music", ChannelType::Output).id;
    let chat = service.create_channel("Chat", ChannelType::Output).id;

    service.toggle_channel_mute(&chat);
    service.toggle_channel_solo(&music);
    service.toggle_channel_solo(&music);

    assert!(!service.get_channel(&chat).unwrap().is_muted);
}

#[test]
fn test_channel_volume_and_mute() {
    let service = service();
    let music = service.create_channel("Music", ChannelType::Output).id;

    assert_eq!(service.set_channel_volume(&music, 1000), Some(VolumeLevel::new(100)));
    assert_eq!(service.set_channel_volume(&music, -1), Some(VolumeLevel::new(0)));
    assert_eq!(service.toggle_channel_mute(&music), Some(true));
    assert_eq!(service.toggle_channel_mute(&music), Some(false));

    let ghost = ChannelId::new("channel_0");
    assert_eq!(service.set_channel_volume(&ghost, 10), None);
    assert_eq!(service.toggle_channel_mute(&ghost), None);
    assert_eq!(service.toggle_channel_solo(&ghost), None);
}

#[test]
fn test_connected_apps() {
    let service = service();
    let music = service.create_channel("Music", ChannelType::Output).id;

    assert!(service.add_app_to_channel(&music, "Spotify"));
    assert!(service.add_app_to_channel(&music, "Spotify"));
    assert_eq!(service.get_channel(&music).unwrap().connected_apps(), ["Spotify"]);

    assert!(service.remove_app_from_channel(&music, "Spotify"));
    assert!(!service.remove_app_from_channel(&music, "Spotify"));
    assert!(!service.add_app_to_channel(&ChannelId::new("ghost"), "Spotify"));
}

#[test]
fn test_channel_solo_does_not_touch_os_sessions() {
    let provider = Arc::new(SimulatedProvider::demo());
    let service = MixerService::new(provider.clone(), AudioSettings::default());
    let music = service.create_channel("Music", ChannelType::Output).id;

    service.add_app_to_channel(&music, "Spotify");
    service.toggle_channel_solo(&music);

    assert!(provider.mute_log().is_empty());
    assert_eq!(service.soloed_app(), None);
}

#[tokio::test]
async fn test_command_bus_channel_flow() {
    let service = service();

    let CommandResult::Channel(Some(voice)) = service
        .execute(Command::CreateChannel {
            name: "Voice".to_string(),
            kind: ChannelType::Input,
        })
        .await
    else {
        panic!("channel creation returned no channel");
    };

    let result = service
        .execute(Command::ToggleChannelSolo {
            id: voice.id.clone(),
        })
        .await;
    assert_eq!(result, CommandResult::Flag(Some(true)));

    let store_state = service
        .list_channels()
        .input_channels
        .iter()
        .find(|c| c.is_main())
        .map(|c| c.is_muted);
    assert_eq!(store_state, Some(true));

    let result = service
        .execute(Command::RemoveChannel { id: voice.id })
        .await;
    assert_eq!(result, CommandResult::Done(true));
}

#[test]
fn test_solo_state_reporting() {
    use sonus_core::domain::ChannelStore;

    let mut store = ChannelStore::new();
    let music = store.create_channel("Music", ChannelType::Output).id;
    store.toggle_channel_solo(&music);

    assert_eq!(store.solo_state(&music), Some(SoloState::Soloed));
    assert_eq!(
        store.solo_state(&ChannelId::main_output()),
        Some(SoloState::MutedByOtherSolo)
    );
    assert_eq!(store.solo_state(&ChannelId::main_input()), Some(SoloState::Normal));
}
