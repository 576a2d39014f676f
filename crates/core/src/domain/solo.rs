//! Application solo coordination
//!
//! At most one running application is soloed at a time. Soloing an
//! application unmutes it and mutes every other enumerated application at
//! the OS level; toggling the same application again clears the selection
//! and unmutes everything. This is independent of channel solo, which only
//! touches in-memory channel attributes.

use crate::domain::audio::{AudioError, AudioSessionProvider};
use crate::domain::query::{app_names, display_name, visible_sessions};
use crate::domain::volume::{ControlError, ControlResult, TargetKind};
use tracing::{debug, info, trace};

/// Owner of the global application solo selection
#[derive(Debug, Clone, Default)]
pub struct AppSoloCoordinator {
    soloed: Option<String>,
}

impl AppSoloCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently soloed application, if any
    pub fn soloed_app(&self) -> Option<&str> {
        self.soloed.as_deref()
    }

    pub fn is_soloed(&self, app_name: &str) -> bool {
        self.soloed.as_deref() == Some(app_name)
    }

    /// Toggle solo on `app_name`, returning whether it is now soloed
    ///
    /// Fails with NotFound, issuing no mute commands, when the application
    /// is not currently enumerated. A failure part-way through the mute
    /// fan-out is returned as-is; applications already processed keep the
    /// state they were given.
    pub fn toggle_app_solo(
        &mut self,
        provider: &dyn AudioSessionProvider,
        excluded: &[String],
        app_name: &str,
    ) -> ControlResult<bool> {
        let sessions = provider.list_sessions()?;

        if !app_names(&sessions, excluded).iter().any(|n| n == app_name) {
            return Err(ControlError::not_found(TargetKind::Application, app_name));
        }

        let soloing = !self.is_soloed(app_name);
        self.soloed = soloing.then(|| app_name.to_string());

        for session in visible_sessions(&sessions, excluded) {
            let mute = soloing && display_name(&session.process_name) != app_name;

            match provider.set_session_mute(session.pid, mute) {
                Ok(()) => trace!(pid = session.pid, mute, "Session mute applied"),
                Err(AudioError::SessionNotFound(_)) => {
                    debug!(pid = session.pid, "Session ended during solo fan-out, skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }

        if soloing {
            info!(app = app_name, "Application soloed");
        } else {
            info!(app = app_name, "Application solo cleared");
        }
        Ok(soloing)
    }

    /// Forget the selection without touching OS mute state
    pub fn clear(&mut self) {
        self.soloed = None;
    }
}
