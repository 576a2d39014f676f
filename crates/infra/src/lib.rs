pub mod audio;

pub use audio::{CpalDeviceCatalog, MuteCommand, ShellDeviceSwitcher, SimulatedProvider};
