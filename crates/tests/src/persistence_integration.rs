//! Channels surviving a save/load cycle through config and profiles

use sonus_core::domain::{
    AudioSettings, ChannelId, ChannelType, ConfigError, ConfigManager, ProfileManager,
};
use sonus_core::MixerService;
use sonus_infra::SimulatedProvider;
use std::sync::Arc;
use tempfile::TempDir;

fn service_from(records: Vec<sonus_core::domain::ChannelRecord>) -> MixerService {
    MixerService::from_records(
        Arc::new(SimulatedProvider::demo()),
        AudioSettings::default(),
        records,
    )
}

#[tokio::test]
async fn test_channels_round_trip_through_config() {
    let temp_dir = TempDir::new().unwrap();
    let manager = ConfigManager::new(temp_dir.path().to_path_buf());
    let mut config = manager.load().await;

    let service = service_from(config.channels.clone());
    let games = service.create_channel("Games", ChannelType::Output).id;
    service.set_channel_volume(&games, 42);
    service.add_app_to_channel(&games, "steam");
    service.toggle_channel_solo(&games);

    config.channels = service.channel_records();
    manager.save(&config).await.unwrap();

    let reloaded = manager.load().await;
    let restored = service_from(reloaded.channels);

    let channel = restored.get_channel(&games).unwrap();
    assert_eq!(channel.volume.get(), 42);
    assert!(channel.is_solo);
    assert_eq!(channel.connected_apps(), ["steam"]);
    assert!(restored.get_channel(&ChannelId::main_output()).unwrap().is_muted);
    assert_eq!(restored.list_channels(), service.list_channels());
}

#[tokio::test]
async fn test_new_ids_do_not_collide_after_reload() {
    let temp_dir = TempDir::new().unwrap();
    let manager = ConfigManager::new(temp_dir.path().to_path_buf());
    let mut config = manager.load().await;

    let first = service_from(config.channels.clone());
    let existing = first.create_channel("A", ChannelType::Input).id;
    config.channels = first.channel_records();
    manager.save(&config).await.unwrap();

    let second = service_from(manager.load().await.channels);
    let created = second.create_channel("B", ChannelType::Input).id;

    assert_ne!(created, existing);
    assert_eq!(second.list_channels().input_channels.len(), 3);
}

#[tokio::test]
async fn test_profile_apply() {
    let temp_dir = TempDir::new().unwrap();
    let profiles = ProfileManager::new(temp_dir.path().join("profiles"));

    let service = service_from(Vec::new());
    service.create_channel("Stream", ChannelType::Output);
    service.create_channel("Mic FX", ChannelType::Input);
    profiles
        .save_profile("Streaming", service.channel_records())
        .await
        .unwrap();

    let fresh = service_from(Vec::new());
    assert_eq!(fresh.channel_records().len(), 2);

    let profile = profiles.load_profile("Streaming").await.unwrap();
    fresh.apply_channel_records(profile.channels);

    assert_eq!(fresh.channel_records(), service.channel_records());
    assert!(matches!(
        profiles.load_profile("Missing").await,
        Err(ConfigError::ProfileNotFound(_))
    ));
}
