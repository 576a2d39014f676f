//! Session provider and endpoint implementations
//!
//! - `simulated`: in-memory [`AudioSessionProvider`](sonus_core::domain::audio::AudioSessionProvider)
//! - `cpal_backend`: host endpoint catalog through CPAL
//! - `device_switch`: PowerShell default-device switch

pub mod cpal_backend;
pub mod device_switch;
pub mod simulated;

pub use cpal_backend::CpalDeviceCatalog;
pub use device_switch::{ShellDeviceSwitcher, SwitchError};
pub use simulated::{MuteCommand, SimulatedProvider};
