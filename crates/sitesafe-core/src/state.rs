//! Application context and status snapshot types.

use serde::Serialize;

use crate::models::{Project, User};

/// Whether the device can currently reach the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    #[default]
    Online,
    Offline,
}

impl Connectivity {
    pub const fn from_online(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }

    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Session-wide state: connectivity, the signed-in user and the active
/// project. Owned by [`crate::services::SafetyApp`]; nothing else mutates it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppContext {
    pub connectivity: Connectivity,
    pub current_user: Option<User>,
    pub selected_project: Option<Project>,
}

/// Banner state shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Offline,
    Syncing,
    /// Online with reports still queued
    Pending,
    Synced,
}

/// Point-in-time view of connectivity and queue depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub online: bool,
    pub pending: usize,
    pub dead_letters: usize,
    /// Unreadable database files moved aside; queued reports may be in them.
    pub quarantined: usize,
    pub state: SyncState,
}

impl StatusSnapshot {
    pub const fn new(online: bool, pending: usize, dead_letters: usize, syncing: bool) -> Self {
        let state = if !online {
            SyncState::Offline
        } else if syncing {
            SyncState::Syncing
        } else if pending > 0 {
            SyncState::Pending
        } else {
            SyncState::Synced
        };
        Self {
            online,
            pending,
            dead_letters,
            quarantined: 0,
            state,
        }
    }

    #[must_use]
    pub const fn with_quarantined(mut self, quarantined: usize) -> Self {
        self.quarantined = quarantined;
        self
    }

    /// Warning shown while quarantined database backups exist.
    pub fn recovery_notice(&self) -> Option<String> {
        (self.quarantined > 0).then(|| {
            format!(
                "{} unreadable database file{} moved aside; reports queued before then were not sent",
                self.quarantined,
                plural(self.quarantined)
            )
        })
    }

    /// One-line banner text, or `None` when there is nothing to show.
    pub fn banner(&self) -> Option<String> {
        match self.state {
            SyncState::Offline if self.pending > 0 => Some(format!(
                "Offline mode: {} report{} pending",
                self.pending,
                plural(self.pending)
            )),
            SyncState::Offline => Some("Offline mode".to_string()),
            SyncState::Syncing => Some("Syncing reports...".to_string()),
            SyncState::Pending => Some(format!(
                "{} report{} pending upload",
                self.pending,
                plural(self.pending)
            )),
            SyncState::Synced => None,
        }
    }
}

const fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_state_follows_connectivity_and_queue() {
        assert_eq!(StatusSnapshot::new(false, 3, 0, false).state, SyncState::Offline);
        assert_eq!(StatusSnapshot::new(true, 3, 0, true).state, SyncState::Syncing);
        assert_eq!(StatusSnapshot::new(true, 3, 0, false).state, SyncState::Pending);
        assert_eq!(StatusSnapshot::new(true, 0, 0, false).state, SyncState::Synced);
    }

    #[test]
    fn banner_text() {
        assert_eq!(
            StatusSnapshot::new(false, 1, 0, false).banner().as_deref(),
            Some("Offline mode: 1 report pending")
        );
        assert_eq!(
            StatusSnapshot::new(true, 2, 0, false).banner().as_deref(),
            Some("2 reports pending upload")
        );
        assert!(StatusSnapshot::new(true, 0, 0, false).banner().is_none());
    }

    #[test]
    fn recovery_notice_only_when_backups_exist() {
        let snapshot = StatusSnapshot::new(true, 0, 0, false);
        assert!(snapshot.recovery_notice().is_none());

        let snapshot = snapshot.with_quarantined(1);
        assert_eq!(snapshot.state, SyncState::Synced);
        assert_eq!(
            snapshot.recovery_notice().as_deref(),
            Some("1 unreadable database file moved aside; reports queued before then were not sent")
        );
    }
}
