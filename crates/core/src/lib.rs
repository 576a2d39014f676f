//! Sonus Mixer control core
//!
//! Channel store, application solo coordination and volume/mute commands
//! layered over a platform audio session provider. Platform implementations
//! of [`domain::audio::AudioSessionProvider`] live in the `sonus-infra` crate.

pub mod domain;

pub use domain::service::MixerService;
