//! Participant state machine.
//!
//! A `Session` owns the local world, the controllers and the role, and is
//! driven by three kinds of events: frames from the relay, local button
//! edges, and ticks. It never touches a socket; whatever needs to go out is
//! returned as a [`Message`] for the network driver to send.

use crate::capture::{capture, SnapshotScheduler};
use crate::reconcile::{ApplyReport, Reconciler, StalePolicy};
use crate::role::{Role, RoleState};
use log::{debug, info, warn};
use shared::{Button, Controllers, Message, ProtocolError, World, WorldSnapshot, SNAPSHOT_INTERVAL_MS};

/// Gameplay logic plugged into a host.
///
/// Only the host runs a simulation. Followers see its effects exclusively
/// through snapshots.
pub trait Simulation: Send {
    /// Called once, the first time this participant ticks as host.
    fn start(&mut self, world: &mut World, controllers: &mut Controllers);

    /// Called every host tick before velocities are integrated.
    fn update(&mut self, world: &mut World, controllers: &Controllers, dt: f64);
}

/// A host with no gameplay: the world only changes through controller-bound
/// velocities.
#[derive(Debug, Default)]
pub struct NoSimulation;

impl Simulation for NoSimulation {
    fn start(&mut self, _world: &mut World, _controllers: &mut Controllers) {}

    fn update(&mut self, _world: &mut World, _controllers: &Controllers, _dt: f64) {}
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Act as host regardless of the assigned participant id.
    pub force_host: bool,
    pub snapshot_interval_ms: u64,
    pub stale_policy: StalePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            force_host: false,
            snapshot_interval_ms: SNAPSHOT_INTERVAL_MS,
            stale_policy: StalePolicy::AcceptAll,
        }
    }
}

pub struct Session {
    role: RoleState,
    world: World,
    controllers: Controllers,
    simulation: Box<dyn Simulation>,
    simulation_started: bool,
    scheduler: SnapshotScheduler,
    reconciler: Reconciler,
    connected: bool,
}

impl Session {
    pub fn new(config: SessionConfig, simulation: Box<dyn Simulation>) -> Self {
        Self {
            role: RoleState::new(config.force_host),
            world: World::new(),
            controllers: Controllers::new(),
            simulation,
            simulation_started: false,
            scheduler: SnapshotScheduler::new(config.snapshot_interval_ms),
            reconciler: Reconciler::new(config.stale_policy),
            connected: false,
        }
    }

    /// A session without gameplay logic.
    pub fn passive(config: SessionConfig) -> Self {
        Self::new(config, Box::new(NoSimulation))
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn controllers(&self) -> &Controllers {
        &self.controllers
    }

    pub fn role(&self) -> Role {
        self.role.role()
    }

    pub fn is_host(&self) -> bool {
        self.role.is_host()
    }

    pub fn participant_id(&self) -> Option<u32> {
        self.role.participant_id()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn scheduler(&self) -> &SnapshotScheduler {
        &self.scheduler
    }

    pub fn on_connected(&mut self) {
        info!("Connected to relay, waiting for assignment");
        self.connected = true;
    }

    pub fn on_disconnected(&mut self) {
        if self.connected {
            info!("Disconnected from relay");
        }
        self.connected = false;
        self.role.on_disconnected();
        self.reconciler.reset();
    }

    /// Decodes and handles one text frame from the relay.
    pub fn handle_frame(&mut self, frame: &str) -> Result<(), ProtocolError> {
        let message = Message::decode(frame)?;
        self.handle_message(message);
        Ok(())
    }

    /// Applies the effect of one relay message to local state.
    pub fn handle_message(&mut self, message: Message) {
        match message {
            Message::Assign {
                participant_id,
                name,
            } => {
                let role = self.role.on_assign(participant_id, name);
                if role == Role::Follower {
                    self.reconciler.reset();
                }
            }
            Message::Input {
                sender,
                button,
                pressed,
            } => {
                if !self.role.is_host() {
                    debug!("Ignoring input from participant {}: not host", sender);
                    return;
                }
                if !self.controllers.apply(sender, button, pressed) {
                    warn!("Ignoring input from unknown participant {}", sender);
                }
            }
            Message::State { sender, snapshot } => {
                if self.role.is_host() {
                    debug!("Ignoring state from participant {}: this participant is host", sender);
                    return;
                }
                self.apply_snapshot(&snapshot);
            }
        }
    }

    /// Routes a local button edge.
    ///
    /// Standalone and host participants apply it to their own controller
    /// right away, since the relay never echoes a frame to its sender. An
    /// assigned follower returns it as an `input` message for the host.
    pub fn local_input(&mut self, button: Button, pressed: bool) -> Option<Message> {
        if self.connected && self.role.is_assigned() && !self.role.is_host() {
            return Some(Message::input(button, pressed));
        }
        let slot = self.role.local_slot();
        self.controllers.apply(slot, button, pressed);
        None
    }

    /// Advances one frame.
    ///
    /// A host sweeps last frame's tombstones, steers controller-bound actors,
    /// runs the simulation and integrates velocities. When connected as
    /// participant 1 it returns a `state` message whenever a snapshot is due.
    /// A follower does nothing here.
    pub fn tick(&mut self, now_ms: u64, dt: f64) -> Option<Message> {
        if !self.role.is_host() {
            return None;
        }

        if !self.simulation_started {
            self.simulation.start(&mut self.world, &mut self.controllers);
            self.simulation_started = true;
        }

        self.world.sweep_destroyed();
        self.controllers.update_velocities(&mut self.world);
        self.simulation.update(&mut self.world, &self.controllers, dt);
        self.world.step(dt);

        if !self.connected || !self.role.emits_state() {
            return None;
        }
        let participant_id = self.role.participant_id()?;
        let snapshot = self.scheduler.poll(&self.world, now_ms)?;
        Some(Message::state(participant_id, snapshot))
    }

    /// Snapshot of the local world as it stands, for debug saves.
    pub fn current_snapshot(&self, capture_time_ms: u64) -> WorldSnapshot {
        capture(&self.world, capture_time_ms, self.scheduler.last_sequence())
    }

    fn apply_snapshot(&mut self, snapshot: &WorldSnapshot) -> Option<ApplyReport> {
        let report = self.reconciler.apply(&mut self.world, snapshot)?;
        if report.created > 0 || report.removed > 0 {
            debug!(
                "Snapshot {}: {} created, {} updated, {} removed",
                snapshot.sequence, report.created, report.updated, report.removed
            );
        }
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ActorKind, ActorRecord, DataBag, ActorFlags};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn assigned(id: u32, config: SessionConfig) -> Session {
        let mut session = Session::passive(config);
        session.on_connected();
        session.handle_message(Message::assign(id));
        session
    }

    fn player_record(id: u32, x: f64, y: f64) -> ActorRecord {
        ActorRecord {
            id,
            kind: ActorKind::PLAYER,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            width: 16,
            height: 16,
            flags: ActorFlags::empty(),
            data: DataBag::new(),
            pixels: None,
        }
    }

    struct CountingSimulation {
        starts: Arc<AtomicU32>,
        updates: Arc<AtomicU32>,
    }

    impl Simulation for CountingSimulation {
        fn start(&mut self, world: &mut World, _controllers: &mut Controllers) {
            self.starts.fetch_add(1, Ordering::SeqCst);
            world.spawn(ActorKind::PLAYER, None);
        }

        fn update(&mut self, _world: &mut World, _controllers: &Controllers, _dt: f64) {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_host_emits_state_on_first_tick() {
        let mut session = assigned(1, SessionConfig::default());
        session.world_mut().spawn(ActorKind::PLAYER, None);

        match session.tick(0, 1.0 / 60.0) {
            Some(Message::State { sender, snapshot }) => {
                assert_eq!(sender, 1);
                assert_eq!(snapshot.actors.len(), 1);
                assert_eq!(snapshot.sequence, 1);
            }
            other => panic!("Expected state message, got {:?}", other),
        }
        assert!(session.tick(5, 0.005).is_none());
        assert!(session.tick(16, 0.011).is_some());
    }

    #[test]
    fn test_standalone_host_simulates_without_sending() {
        let mut session = Session::passive(SessionConfig::default());
        let id = session.world_mut().spawn(ActorKind::PLAYER, None);
        session.world_mut().get_mut(id).unwrap().vx = 10.0;

        assert!(session.tick(0, 1.0).is_none());
        assert_eq!(session.world().get(id).unwrap().x, 10.0);
        assert_eq!(session.world().runtime_ms, 1000);
    }

    #[test]
    fn test_follower_never_simulates() {
        let mut session = assigned(2, SessionConfig::default());
        session.handle_message(Message::state(
            1,
            WorldSnapshot {
                actors: vec![ActorRecord {
                    vx: 50.0,
                    ..player_record(1, 10.0, 10.0)
                }],
                ..Default::default()
            },
        ));

        assert!(session.tick(0, 1.0).is_none());
        assert_eq!(session.world().get(1).unwrap().x, 10.0);
    }

    #[test]
    fn test_follower_mirrors_host_snapshots() {
        let mut session = assigned(2, SessionConfig::default());
        session.handle_message(Message::state(
            1,
            WorldSnapshot {
                actors: vec![player_record(1, 10.0, 10.0)],
                ..Default::default()
            },
        ));
        let actor = session.world().get(1).unwrap();
        assert_eq!((actor.x, actor.y, actor.kind), (10.0, 10.0, ActorKind::PLAYER));
        assert_eq!(session.world().len(), 1);

        session.handle_message(Message::state(1, WorldSnapshot::default()));
        assert!(session.world().is_empty());
    }

    #[test]
    fn test_host_ignores_state() {
        let mut session = assigned(1, SessionConfig::default());
        session.world_mut().spawn(ActorKind::PLAYER, None);
        session.handle_message(Message::state(1, WorldSnapshot::default()));
        assert_eq!(session.world().len(), 1);
    }

    #[test]
    fn test_host_applies_remote_input() {
        let mut session = assigned(1, SessionConfig::default());
        session.handle_message(Message::Input {
            sender: 3,
            button: Button::B,
            pressed: true,
        });
        assert!(session.controllers().get(3).unwrap().is_pressed(Button::B));

        session.handle_message(Message::Input {
            sender: 3,
            button: Button::B,
            pressed: false,
        });
        assert!(!session.controllers().get(3).unwrap().is_pressed(Button::B));
    }

    #[test]
    fn test_follower_drops_input() {
        let mut session = assigned(2, SessionConfig::default());
        session.handle_message(Message::Input {
            sender: 3,
            button: Button::Left,
            pressed: true,
        });
        assert!(!session.controllers().get(3).unwrap().is_pressed(Button::Left));
    }

    #[test]
    fn test_unknown_input_sender_is_ignored() {
        let mut session = assigned(1, SessionConfig::default());
        session.handle_message(Message::Input {
            sender: 9,
            button: Button::A,
            pressed: true,
        });
        assert!(session.controllers().get(9).is_none());
    }

    #[test]
    fn test_local_input_routing() {
        let mut host = assigned(1, SessionConfig::default());
        assert!(host.local_input(Button::Up, true).is_none());
        assert!(host.controllers().get(1).unwrap().is_pressed(Button::Up));

        let mut follower = assigned(2, SessionConfig::default());
        assert_eq!(
            follower.local_input(Button::Up, true),
            Some(Message::input(Button::Up, true))
        );
        assert!(!follower.controllers().get(2).unwrap().is_pressed(Button::Up));

        let mut standalone = Session::passive(SessionConfig::default());
        assert!(standalone.local_input(Button::A, true).is_none());
        assert!(standalone.controllers().get(1).unwrap().is_pressed(Button::A));
    }

    #[test]
    fn test_forced_host_with_other_id_simulates_but_does_not_send() {
        let config = SessionConfig {
            force_host: true,
            ..Default::default()
        };
        let mut session = assigned(2, config);
        let id = session.world_mut().spawn(ActorKind::PLAYER, None);
        session.world_mut().get_mut(id).unwrap().vy = 4.0;

        assert!(session.is_host());
        assert!(session.tick(0, 1.0).is_none());
        assert_eq!(session.world().get(id).unwrap().y, 4.0);
    }

    #[test]
    fn test_simulation_starts_once_and_only_on_host() {
        let starts = Arc::new(AtomicU32::new(0));
        let updates = Arc::new(AtomicU32::new(0));
        let simulation = CountingSimulation {
            starts: Arc::clone(&starts),
            updates: Arc::clone(&updates),
        };
        let mut session = Session::new(SessionConfig::default(), Box::new(simulation));
        session.on_connected();
        session.handle_message(Message::assign(2));

        session.tick(0, 0.016);
        assert_eq!(starts.load(Ordering::SeqCst), 0);

        session.handle_message(Message::assign(1));
        session.tick(16, 0.016);
        session.tick(32, 0.016);
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(updates.load(Ordering::SeqCst), 2);
        assert_eq!(session.world().len(), 1);
    }

    #[test]
    fn test_tombstones_are_sent_once_then_swept() {
        let config = SessionConfig {
            snapshot_interval_ms: 0,
            ..Default::default()
        };
        let mut session = assigned(1, config);
        let id = session.world_mut().spawn(ActorKind::ENEMY, None);
        {
            let actor = session.world_mut().get_mut(id).unwrap();
            actor.set_position(-100.0, 50.0);
            actor.set_flag(ActorFlags::AUTO_DESTROY, true);
        }

        match session.tick(0, 0.016) {
            Some(Message::State { snapshot, .. }) => {
                assert_eq!(snapshot.actors.len(), 1);
                assert!(snapshot.actors[0].flags.contains(ActorFlags::DESTROYED));
            }
            other => panic!("Expected state message, got {:?}", other),
        }

        match session.tick(16, 0.016) {
            Some(Message::State { snapshot, .. }) => assert!(snapshot.actors.is_empty()),
            other => panic!("Expected state message, got {:?}", other),
        }
    }

    #[test]
    fn test_handle_frame_rejects_garbage() {
        let mut session = Session::passive(SessionConfig::default());
        assert!(session.handle_frame("{\"type\":\"nope\"}").is_err());
        assert!(session.handle_frame(&Message::assign(2).encode().unwrap()).is_ok());
        assert_eq!(session.participant_id(), Some(2));
    }

    #[test]
    fn test_disconnect_returns_to_local_input() {
        let mut session = assigned(2, SessionConfig::default());
        session.on_disconnected();
        assert!(!session.is_connected());
        assert!(session.local_input(Button::Right, true).is_none());
    }
}
