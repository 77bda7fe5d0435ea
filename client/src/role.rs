//! Host/Follower role for the local participant.
//!
//! The relay only tells a participant its id. Participant 1 is the host by
//! default; a locally forced host flag overrides that for this participant's
//! own behavior and nobody else's. Until the first assignment arrives the
//! participant runs standalone as its own host.

use log::{info, warn};
use shared::{default_name, HOST_PARTICIPANT_ID};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Runs the simulation and owns the world.
    Host,
    /// Mirrors the host through snapshots.
    Follower,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Host => f.write_str("host"),
            Role::Follower => f.write_str("follower"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoleState {
    force_host: bool,
    participant_id: Option<u32>,
    name: Option<String>,
    role: Role,
}

impl RoleState {
    pub fn new(force_host: bool) -> Self {
        Self {
            force_host,
            participant_id: None,
            name: None,
            role: Role::Host,
        }
    }

    /// Re-evaluates the role for a fresh assignment and returns it.
    pub fn on_assign(&mut self, participant_id: u32, name: Option<String>) -> Role {
        let role = if participant_id == HOST_PARTICIPANT_ID || self.force_host {
            Role::Host
        } else {
            Role::Follower
        };

        if self.force_host && participant_id != HOST_PARTICIPANT_ID {
            warn!(
                "Forced host holds participant id {}; the relay only accepts state from id {}, so no snapshots will be sent",
                participant_id, HOST_PARTICIPANT_ID
            );
        }

        let name = name.unwrap_or_else(|| default_name(participant_id));
        info!("Assigned participant {} ({}) as {}", participant_id, name, role);

        self.participant_id = Some(participant_id);
        self.name = Some(name);
        self.role = role;
        role
    }

    /// Forgets the assignment. The role is kept so the local world keeps
    /// behaving the way it did while connected.
    pub fn on_disconnected(&mut self) {
        self.participant_id = None;
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }

    pub fn is_assigned(&self) -> bool {
        self.participant_id.is_some()
    }

    pub fn participant_id(&self) -> Option<u32> {
        self.participant_id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn force_host(&self) -> bool {
        self.force_host
    }

    /// Whether this participant's snapshots would be accepted by the relay.
    pub fn emits_state(&self) -> bool {
        self.is_host() && self.participant_id == Some(HOST_PARTICIPANT_ID)
    }

    /// Controller slot local button edges are written to.
    pub fn local_slot(&self) -> u32 {
        self.participant_id.unwrap_or(HOST_PARTICIPANT_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unassigned_is_standalone_host() {
        let state = RoleState::new(false);
        assert_eq!(state.role(), Role::Host);
        assert!(!state.is_assigned());
        assert!(!state.emits_state());
        assert_eq!(state.local_slot(), 1);
    }

    #[test]
    fn test_id_one_is_host() {
        let mut state = RoleState::new(false);
        assert_eq!(state.on_assign(1, None), Role::Host);
        assert!(state.emits_state());
        assert_eq!(state.name(), Some("Player1"));
    }

    #[test]
    fn test_other_ids_follow() {
        let mut state = RoleState::new(false);
        for id in 2..=4 {
            assert_eq!(state.on_assign(id, Some(format!("P{}", id))), Role::Follower);
            assert!(!state.emits_state());
            assert_eq!(state.local_slot(), id);
        }
    }

    #[test]
    fn test_forced_host_with_other_id_does_not_emit() {
        let mut state = RoleState::new(true);
        assert_eq!(state.on_assign(3, None), Role::Host);
        assert!(state.is_host());
        assert!(!state.emits_state());
    }

    #[test]
    fn test_role_is_reevaluated_on_every_assign() {
        let mut state = RoleState::new(false);
        state.on_assign(2, None);
        assert_eq!(state.role(), Role::Follower);
        state.on_assign(1, None);
        assert_eq!(state.role(), Role::Host);
    }

    #[test]
    fn test_disconnect_keeps_role() {
        let mut state = RoleState::new(false);
        state.on_assign(2, None);
        state.on_disconnected();
        assert!(!state.is_assigned());
        assert_eq!(state.role(), Role::Follower);
        assert_eq!(state.local_slot(), 1);
    }
}
