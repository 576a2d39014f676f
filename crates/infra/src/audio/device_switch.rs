//! Default-device switching through PowerShell
//!
//! Windows exposes no public API for changing the default endpoint, so the
//! switch is delegated to the `AudioDeviceCmdlets` PowerShell module. The
//! child process runs under a timeout and is killed if it overruns.

use sonus_core::domain::audio::{AudioError, DeviceDirection, DeviceId};
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

const FORBIDDEN_ID_CHARS: &[char] = &['"', '`', '$', ';', '\n', '\r'];

/// Errors from one switch attempt
#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("Device id rejected: {0:?}")]
    InvalidId(String),

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Device switch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Device switch exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("Device switch runtime error: {0}")]
    Runtime(String),
}

impl From<SwitchError> for AudioError {
    fn from(err: SwitchError) -> Self {
        AudioError::ExternalCommand(err.to_string())
    }
}

/// Runs the PowerShell default-device switch
#[derive(Debug, Clone)]
pub struct ShellDeviceSwitcher {
    program: String,
    timeout: Duration,
}

impl ShellDeviceSwitcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "powershell".to_string(),
            timeout,
        }
    }

    /// Use a different executable in place of `powershell`
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The PowerShell script that switches to `id`
    ///
    /// Input endpoints also become the default communications device.
    pub fn script(id: &DeviceId, direction: DeviceDirection) -> Result<String, SwitchError> {
        let raw = id.as_str();
        if raw.is_empty() || raw.contains(FORBIDDEN_ID_CHARS) {
            return Err(SwitchError::InvalidId(raw.to_string()));
        }

        let mut script = format!(
            "Import-Module AudioDeviceCmdlets -Force; Set-AudioDevice -ID \"{}\"",
            raw
        );
        if direction == DeviceDirection::Input {
            script.push_str(" -CommunicationDefault");
        }
        Ok(script)
    }

    /// Switch the default endpoint, awaiting the child process
    pub async fn switch_async(
        &self,
        id: &DeviceId,
        direction: DeviceDirection,
    ) -> Result<(), SwitchError> {
        let script = Self::script(id, direction)?;
        debug!(device = %id, %direction, program = %self.program, "Launching device switch");

        let mut command = Command::new(&self.program);
        command
            .args(["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command", &script])
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| SwitchError::Timeout(self.timeout))?
            .map_err(|source| SwitchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(device = %id, status = %output.status, "Device switch failed");
            return Err(SwitchError::Failed {
                status: output.status,
                stderr,
            });
        }

        info!(device = %id, %direction, "Default device switched");
        Ok(())
    }

    /// Blocking form of [`switch_async`](Self::switch_async)
    ///
    /// Runs on a dedicated thread with its own runtime, so it is safe to call
    /// from synchronous code whether or not a tokio runtime is active.
    pub fn switch(&self, id: &DeviceId, direction: DeviceDirection) -> Result<(), SwitchError> {
        let switcher = self.clone();
        let id = id.clone();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| SwitchError::Runtime(e.to_string()))?;
            runtime.block_on(switcher.switch_async(&id, direction))
        })
        .join()
        .map_err(|_| SwitchError::Runtime("device switch thread panicked".to_string()))?
    }
}
