//! Walk through configuration and channel profiles
//!
//! Run with: cargo run --package sonus-core --example profile_demo

use sonus_core::domain::channel::{ChannelStore, ChannelType};
use sonus_core::domain::config::{ConfigManager, ProfileManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("sonus_core=debug,info")
        .init();

    let dir = std::env::temp_dir().join("sonus-profile-demo");
    let manager = ConfigManager::new(dir.clone());

    let mut config = manager.load().await;
    println!("Loaded {} channels from {}", config.channels.len(), manager.config_path().display());

    let mut store = ChannelStore::from_records(config.channels.clone());
    let games = store.create_channel("Games", ChannelType::Output).id;
    store.add_app_to_channel(&games, "steam");
    store.toggle_channel_solo(&games);

    for channel in store.list_by_type().output_channels {
        println!(
            "  {:<12} {:>4}  muted={:<5} solo={:<5} {}",
            channel.name, channel.volume, channel.is_muted, channel.is_solo, channel.color
        );
    }

    let profiles = ProfileManager::new(manager.profile_dir(&config));
    profiles.save_profile("gaming", store.records()).await?;
    println!("Profiles: {:?}", profiles.list_profiles().await?);

    let restored = profiles.load_profile("gaming").await?;
    config.channels = restored.channels;
    manager.save(&config).await?;

    profiles.delete_profile("gaming").await?;
    manager.clear().await?;
    Ok(())
}
