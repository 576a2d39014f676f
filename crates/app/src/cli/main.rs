//! Sonus CLI Application

mod commands;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use commands::{Cli, Request, ShellLine};
use serde::Serialize;
use sonus_core::domain::{
    AppConfig, AudioSessionProvider, AudioSettings, CommandExecutor, ConfigManager, ProfileEvent,
    ProfileManager, ProfileWatcher, SonusConfig,
};
use sonus_core::MixerService;
use sonus_infra::{CpalDeviceCatalog, ShellDeviceSwitcher, SimulatedProvider};
use std::fs::OpenOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Everything a request needs, for one process lifetime
struct App {
    service: MixerService,
    manager: ConfigManager,
    profiles: ProfileManager,
    config: SonusConfig,
    /// Profile last loaded or saved; the shell re-applies it when its file
    /// changes on disk
    active_profile: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_dir = match &cli.config_dir {
        Some(dir) => dir.clone(),
        None => ConfigManager::default_config_dir()?,
    };
    let manager = ConfigManager::new(config_dir);
    let mut config = manager.load().await;
    config.apply_env_overrides();

    init_tracing(cli.verbose, &config.app)?;
    info!("Sonus starting");

    let provider = build_provider(cli.host_devices, &config.audio)?;
    let service = MixerService::from_records(provider, config.audio.clone(), config.channels.clone());
    let profiles = ProfileManager::new(manager.profile_dir(&config));

    let mut app = App {
        service,
        manager,
        profiles,
        config,
        active_profile: None,
    };

    match cli.command {
        Some(action) => app.handle(action.into()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

/// Logs go to stderr, and to `log_file` as well when configured
fn init_tracing(verbose: bool, app: &AppConfig) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&app.log_level))
    };

    let file_layer = match &app.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

fn build_provider(
    host_devices: bool,
    audio: &AudioSettings,
) -> anyhow::Result<Arc<dyn AudioSessionProvider>> {
    let provider = if host_devices {
        SimulatedProvider::with_catalog(&CpalDeviceCatalog::new())
            .context("failed to read host audio devices")?
    } else {
        SimulatedProvider::demo()
    };

    let provider = if audio.use_shell_device_switch {
        let timeout = Duration::from_secs(audio.device_switch_timeout_secs);
        debug!(?timeout, "Default-device switching through PowerShell");
        provider.with_switcher(ShellDeviceSwitcher::new(timeout))
    } else {
        provider
    };

    Ok(Arc::new(provider))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

impl App {
    async fn handle(&mut self, request: Request) -> anyhow::Result<()> {
        match request {
            Request::Watch => self.watch().await,
            Request::Shell => self.shell().await,
            request => self.dispatch(request).await,
        }
    }

    /// Run a one-shot request and print its result
    async fn dispatch(&mut self, request: Request) -> anyhow::Result<()> {
        match request {
            Request::Mixer(command) => {
                let persist = command.mutates_channels();
                let result = self.service.execute(command).await;
                if persist {
                    self.persist_channels().await?;
                }
                print_json(&result)
            }
            Request::ProfileSave(name) => {
                self.profiles
                    .save_profile(&name, self.service.channel_records())
                    .await?;
                self.active_profile = Some(name.clone());
                print_json(&serde_json::json!({ "saved": name }))
            }
            Request::ProfileLoad(name) => {
                let profile = self.profiles.load_profile(&name).await?;
                self.service.apply_channel_records(profile.channels);
                self.persist_channels().await?;
                self.active_profile = Some(profile.name);
                print_json(&self.service.list_channels())
            }
            Request::ProfileDelete(name) => {
                self.profiles.delete_profile(&name).await?;
                if self.active_profile.as_deref() == Some(name.as_str()) {
                    self.active_profile = None;
                }
                print_json(&serde_json::json!({ "deleted": name }))
            }
            Request::Profiles => print_json(&self.profiles.list_profiles().await?),
            Request::Watch | Request::Shell => {
                anyhow::bail!("not available inside the shell")
            }
        }
    }

    async fn persist_channels(&mut self) -> anyhow::Result<()> {
        self.config.channels = self.service.channel_records();
        self.manager
            .save(&self.config)
            .await
            .context("failed to save channels")
    }

    /// Print the application list every refresh interval until Ctrl-C
    async fn watch(&self) -> anyhow::Result<()> {
        let secs = self.config.app.auto_refresh_interval_secs;
        if secs == 0 {
            anyhow::bail!("auto refresh is disabled (auto_refresh_interval_secs = 0)");
        }

        let mut ticker = tokio::time::interval(Duration::from_secs(secs));
        loop {
            tokio::select! {
                _ = ticker.tick() => print_json(&self.service.get_audio_apps())?,
                _ = tokio::signal::ctrl_c() => break,
            }
        }
        Ok(())
    }

    /// Re-apply the active profile after its file was edited on disk
    async fn follow_profile(&mut self, event: ProfileEvent) -> anyhow::Result<()> {
        if self.active_profile.as_deref() != Some(event.profile()) {
            return Ok(());
        }

        match event {
            ProfileEvent::Changed(name) => {
                let profile = self.profiles.load_profile(&name).await?;
                self.service.apply_channel_records(profile.channels);
                self.persist_channels().await?;
                info!(profile = %name, "Active profile reloaded from disk");
            }
            ProfileEvent::Removed(name) => {
                warn!(profile = %name, "Active profile deleted on disk, keeping current channels");
                self.active_profile = None;
            }
        }
        Ok(())
    }

    /// Interactive mode: one command per line until EOF, `exit` or `quit`
    async fn shell(&mut self) -> anyhow::Result<()> {
        let watcher = match ProfileWatcher::new(self.profiles.profile_dir().to_path_buf()).await {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!(error = %e, "Profile watcher unavailable");
                None
            }
        };
        let mut events = watcher.as_ref().map(ProfileWatcher::subscribe);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = tokio::select! {
                line = lines.next_line() => match line? {
                    Some(line) => line,
                    None => break,
                },
                event = next_profile_event(&mut events) => {
                    if let Err(e) = self.follow_profile(event).await {
                        warn!(error = %format!("{:#}", e), "Active profile not reloaded");
                    }
                    continue;
                }
            };

            let words: Vec<&str> = line.split_whitespace().collect();
            match words.as_slice() {
                [] => continue,
                ["exit"] | ["quit"] => break,
                _ => {}
            }

            let action = match ShellLine::try_parse_from(words.iter().copied()) {
                Ok(parsed) => parsed.action,
                Err(e) => {
                    eprintln!("{}", e);
                    continue;
                }
            };

            if let Err(e) = self.dispatch(Request::from(action)).await {
                eprintln!("error: {:#}", e);
            }
        }

        drop(watcher);
        Ok(())
    }
}

/// Next profile event; pends forever once the watcher is gone
async fn next_profile_event(events: &mut Option<broadcast::Receiver<ProfileEvent>>) -> ProfileEvent {
    loop {
        let Some(receiver) = events.as_mut() else {
            return std::future::pending().await;
        };
        match receiver.recv().await {
            Ok(event) => return event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "Profile events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => *events = None,
        }
    }
}
