//! The arena aggregate
//!
//! A [`Board`] owns the playfield, the stepper and every queue. Other threads
//! only touch it through the input channel (player events) and the outbound
//! channels (envelopes and protocol messages); everything else is called from
//! the thread that runs the frame loop.

pub mod description;
pub mod input;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use glam::DVec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

pub use description::{BallSpec, BoardDescription, GadgetSpec, KeyBindingSpec, TriggerLinkSpec};
pub use input::{InputEvent, KeyAction, KeyEvent};

use crate::config::EngineConfig;
use crate::error::{BoardError, BoardResult};
use crate::sim::ball::{Ball, BallId, random_color};
use crate::sim::gadget::{Gadget, GadgetId, Portal};
use crate::sim::{GravityField, Physics, Playfield, Simulation, StepReport, Wall, WallSide};
use crate::snapshot::BoardSnapshot;
use crate::transport::{Channel, Envelope, ProtocolMessage, is_valid_name};

/// Colour seed for boards whose description does not pick one
const DEFAULT_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// How far outside the arena a ball handed over by a neighbour may start
const ARRIVAL_MARGIN: f64 = 1.0;

#[derive(Debug)]
pub struct Board {
    name: String,
    config: EngineConfig,
    playfield: Playfield,
    simulation: Simulation,
    key_bindings: HashMap<KeyEvent, Vec<GadgetId>>,
    saved_balls: Vec<Ball>,
    rng: Pcg32,

    // === Queues ===
    input: Channel<InputEvent>,
    transport: Channel<Envelope>,
    outbound: Channel<Envelope>,
    messages: Channel<ProtocolMessage>,
}

impl Board {
    /// An empty board: four solid walls and nothing else
    pub fn new(name: &str, physics: Physics, config: &EngineConfig) -> BoardResult<Self> {
        if !is_valid_name(name) {
            return Err(BoardError::InvalidName(name.to_string()));
        }
        config.validate()?;

        let capacity = config.queue_capacity;
        let transport = Channel::new(capacity);
        let playfield = Playfield::new(config.size(), transport.sender());

        Ok(Self {
            name: name.to_string(),
            config: config.clone(),
            playfield,
            simulation: Simulation::new(physics, config),
            key_bindings: HashMap::new(),
            saved_balls: Vec::new(),
            rng: Pcg32::seed_from_u64(DEFAULT_SEED),
            input: Channel::new(capacity),
            transport,
            outbound: Channel::new(capacity),
            messages: Channel::new(capacity),
        })
    }

    /// Build a board from a parsed description and remember its balls for
    /// [`restart`](Self::restart)
    pub fn from_description(desc: &BoardDescription, config: &EngineConfig) -> BoardResult<Self> {
        let mut board = Self::new(&desc.name, desc.physics, config)?;
        if let Some(seed) = desc.seed {
            board.rng = Pcg32::seed_from_u64(seed);
        }

        for spec in &desc.gadgets {
            board.add_gadget(spec.build(config)?)?;
        }
        for link in &desc.links {
            board.create_trigger_link(&link.source, &link.target)?;
        }
        for binding in &desc.key_bindings {
            board.bind_key(binding.key.parse()?, &binding.gadget)?;
        }
        for ball in &desc.balls {
            board.add_ball(ball.pos(), ball.vel())?;
        }
        board.save_configuration();

        log::info!(
            "Board {} built: {} gadget(s), {} ball(s), {} trigger link(s)",
            board.name,
            board.gadget_count(),
            board.ball_count(),
            board.playfield.triggers().link_count()
        );
        Ok(board)
    }

    pub fn from_json(json: &str, config: &EngineConfig) -> BoardResult<Self> {
        Self::from_description(&BoardDescription::from_json(json)?, config)
    }

    // === Construction ===

    /// Add a ball inside the arena
    pub fn add_ball(&mut self, pos: DVec2, vel: DVec2) -> BoardResult<BallId> {
        self.check_ball(pos, vel, 0.0)?;
        let ball = self.make_ball(pos, vel);
        Ok(self.playfield.add_ball(ball))
    }

    /// Reject non-finite state and positions more than `margin` outside
    /// the arena
    fn check_ball(&self, pos: DVec2, vel: DVec2, margin: f64) -> BoardResult<()> {
        let size = self.config.size();
        if !pos.is_finite() || !vel.is_finite() {
            return Err(BoardError::InvalidBall(format!(
                "non-finite state at {pos} moving {vel}"
            )));
        }
        if pos.x < -margin || pos.y < -margin || pos.x > size + margin || pos.y > size + margin {
            return Err(BoardError::InvalidBall(format!(
                "({}, {}) is outside the {size}x{size} arena",
                pos.x, pos.y
            )));
        }
        Ok(())
    }

    fn make_ball(&mut self, pos: DVec2, vel: DVec2) -> Ball {
        Ball::new(pos, vel)
            .with_radius(self.config.ball_radius)
            .with_terminal_speed(self.config.terminal_velocity)
            .with_color(random_color(&mut self.rng))
    }

    /// Add a gadget. Local portals open as soon as both ends exist.
    pub fn add_gadget(&mut self, gadget: Gadget) -> BoardResult<GadgetId> {
        let id = self.playfield.add_gadget(gadget)?;
        self.open_local_portals();
        Ok(id)
    }

    fn open_local_portals(&mut self) {
        let portals: HashSet<String> = self.portal_names().into_iter().collect();
        for gadget in self.playfield.gadgets_mut() {
            let name = gadget.name().to_string();
            let Some(portal) = gadget.as_portal_mut() else {
                continue;
            };
            if portal.is_local() && !portal.is_open() && portals.contains(portal.target_portal()) {
                portal.open();
                log::info!("Portal {name} opened (local exit {})", portal.target_portal());
            }
        }
    }

    /// Hitting `source` will run `target`'s action
    pub fn create_trigger_link(&mut self, source: &str, target: &str) -> BoardResult<()> {
        let (source, target) = (self.gadget_id(source)?, self.gadget_id(target)?);
        self.playfield.triggers_mut().link(source, target);
        Ok(())
    }

    /// Returns false if there was no such link
    pub fn remove_trigger_link(&mut self, source: &str, target: &str) -> BoardResult<bool> {
        let (source, target) = (self.gadget_id(source)?, self.gadget_id(target)?);
        Ok(self.playfield.triggers_mut().unlink(source, target))
    }

    /// Run `gadget`'s action whenever `key` arrives on the input channel
    pub fn bind_key(&mut self, key: KeyEvent, gadget: &str) -> BoardResult<()> {
        let id = self.gadget_id(gadget)?;
        let bound = self.key_bindings.entry(key).or_default();
        if !bound.contains(&id) {
            bound.push(id);
        }
        Ok(())
    }

    fn gadget_id(&self, name: &str) -> BoardResult<GadgetId> {
        self.playfield
            .gadget_id(name)
            .ok_or_else(|| BoardError::UnknownGadget(name.to_string()))
    }

    /// Remember the current free balls as the restart configuration
    pub fn save_configuration(&mut self) {
        self.saved_balls = self
            .playfield
            .balls()
            .iter()
            .filter(|b| !b.in_stasis())
            .cloned()
            .collect();
    }

    /// Back to the saved configuration: gadgets reset, pending transport
    /// dropped, balls replaced and gravity undistorted
    pub fn restart(&mut self) {
        for gadget in self.playfield.gadgets_mut() {
            gadget.reset();
        }
        self.transport.clear();
        self.playfield.clear_balls();
        for ball in self.saved_balls.clone() {
            self.playfield.add_ball(ball);
        }
        self.simulation.reset_gravity();
        log::info!("Board {} restarted with {} ball(s)", self.name, self.ball_count());
    }

    // === Frame ===

    /// Run one frame: apply queued input, simulate `dt` seconds, then route
    /// every ball that left through a wall or portal
    pub fn advance(&mut self, dt: f64) -> StepReport {
        self.apply_input();
        let report = self.simulation.advance(&mut self.playfield, dt);
        self.route_transport();
        report
    }

    fn apply_input(&mut self) {
        // Only the last pointer event of a frame matters
        let mut pointer: Option<Option<DVec2>> = None;
        for event in self.input.drain() {
            match event {
                InputEvent::Key(key) => {
                    self.press_key(&key);
                }
                InputEvent::PointerDrag { x, y } => pointer = Some(Some(DVec2::new(x, y))),
                InputEvent::PointerRelease => pointer = Some(None),
            }
        }
        match pointer {
            Some(Some(point)) => self.distort_gravity(point.x, point.y),
            Some(None) => self.reset_gravity(),
            None => {}
        }
    }

    /// Run the action of every gadget bound to `key`; returns how many ran
    pub fn press_key(&mut self, key: &KeyEvent) -> usize {
        let Some(bound) = self.key_bindings.get(key) else {
            return 0;
        };
        for &id in bound {
            self.playfield.trigger_action(id);
        }
        bound.len()
    }

    fn route_transport(&mut self) {
        for envelope in self.transport.drain() {
            let id = envelope.ball.id();
            if envelope.is_local() {
                self.respawn_local(id, envelope.gadget.as_deref().unwrap_or_default());
            } else {
                self.send_remote(envelope);
            }
        }
    }

    fn respawn_local(&mut self, id: BallId, target: &str) {
        let exit = self
            .playfield
            .gadget_id(target)
            .and_then(|g| self.playfield.gadget(g))
            .and_then(Gadget::as_portal)
            .cloned();
        let Some(ball) = self.playfield.ball_mut(id) else {
            return;
        };
        match exit {
            Some(portal) => {
                let vel = ball.carried_vel();
                portal.emit(ball, vel);
                log::debug!("ball {id:?} teleported to portal {target}");
            }
            None => {
                log::warn!("No exit portal {target:?} on this board, releasing ball in place");
                ball.release();
            }
        }
    }

    fn send_remote(&mut self, envelope: Envelope) {
        let Some(ball) = self.playfield.remove_ball(envelope.ball.id()) else {
            return;
        };
        let envelope = Envelope { ball, ..envelope };
        if let Err(err) = self.outbound.try_send(envelope) {
            let lost = err.into_inner();
            log::warn!(
                "Outbound queue full, ball for {} lost",
                lost.board.as_deref().unwrap_or_default()
            );
        }
    }

    // === Network-facing ===

    /// A ball that crossed a wall from a neighbour, already in this board's
    /// coordinates (just outside the transparent edge)
    pub fn receive_ball(&mut self, pos: DVec2, vel: DVec2) -> BoardResult<BallId> {
        self.check_ball(pos, vel, ARRIVAL_MARGIN)?;
        let ball = self.make_ball(pos, vel);
        Ok(self.playfield.add_ball(ball))
    }

    /// A ball arriving at portal `name` from another board
    pub fn spawn_from_portal(&mut self, name: &str, vel: DVec2) -> BoardResult<BallId> {
        if !vel.is_finite() {
            return Err(BoardError::InvalidBall(format!("non-finite velocity {vel}")));
        }
        let portal = self.portal(name)?.clone();
        let mut ball = self.make_ball(portal.center(), DVec2::ZERO);
        portal.emit(&mut ball, vel);
        Ok(self.playfield.add_ball(ball))
    }

    fn portal(&self, name: &str) -> BoardResult<&Portal> {
        let id = self.gadget_id(name)?;
        self.playfield
            .gadget(id)
            .and_then(Gadget::as_portal)
            .ok_or_else(|| BoardError::InvalidParameter {
                gadget: name.to_string(),
                reason: "not a portal".to_string(),
            })
    }

    fn portal_mut(&mut self, name: &str) -> BoardResult<&mut Portal> {
        let id = self.gadget_id(name)?;
        self.playfield
            .gadget_mut(id)
            .and_then(Gadget::as_portal_mut)
            .ok_or_else(|| BoardError::InvalidParameter {
                gadget: name.to_string(),
                reason: "not a portal".to_string(),
            })
    }

    /// Make the wall on `side` a window onto `board`.
    ///
    /// Re-linking a wall that already leads to a different board first tells
    /// the old neighbour with a DELINK message.
    pub fn connect_wall(&mut self, side: WallSide, board: &str) -> BoardResult<()> {
        if !is_valid_name(board) {
            return Err(BoardError::InvalidName(board.to_string()));
        }
        if let Some(old) = self.playfield.wall(side).link().filter(|old| *old != board) {
            let delink = ProtocolMessage::Delink {
                sender: self.name.clone(),
                receiver: old.to_string(),
                other: self.name.clone(),
                side: side.opposite(),
            };
            self.post_message(delink);
        }
        self.playfield.wall_mut(side).connect(board);
        self.playfield.discard_clipping(side);
        log::info!("Board {}: {side} wall linked to {board}", self.name);
        Ok(())
    }

    /// Make the wall on `side` solid again if it leads to `board`. Balls
    /// left overlapping the restored edge are discarded.
    pub fn disconnect_wall(&mut self, side: WallSide, board: &str) -> bool {
        if self.playfield.wall(side).link() != Some(board) {
            return false;
        }
        self.playfield.wall_mut(side).disconnect();
        self.playfield.discard_clipping(side);
        log::info!("Board {}: {side} wall unlinked from {board}", self.name);
        true
    }

    /// Drop every wall link and portal leading to `board`
    pub fn disconnect_board(&mut self, board: &str) {
        for side in WallSide::ALL {
            self.disconnect_wall(side, board);
        }
        self.close_portals(board);
    }

    /// Solid walls everywhere and only local portals open
    pub fn disconnect_all(&mut self) {
        for side in WallSide::ALL {
            if let Some(board) = self.playfield.wall(side).link().map(str::to_string) {
                self.disconnect_wall(side, &board);
            }
        }
        self.close_non_local_portals();
    }

    /// Open the portals leading to any of `portals` on `board`; returns how
    /// many opened
    pub fn open_portals<S: AsRef<str>>(&mut self, board: &str, portals: &[S]) -> usize {
        let wanted: HashSet<&str> = portals.iter().map(|p| p.as_ref()).collect();
        self.update_portals(true, |p| {
            p.target_board() == Some(board) && wanted.contains(p.target_portal())
        })
    }

    /// Close every portal leading to `board`; returns how many closed
    pub fn close_portals(&mut self, board: &str) -> usize {
        self.update_portals(false, |p| p.target_board() == Some(board))
    }

    pub fn close_non_local_portals(&mut self) -> usize {
        self.update_portals(false, |p| !p.is_local())
    }

    fn update_portals(&mut self, open: bool, select: impl Fn(&Portal) -> bool) -> usize {
        let mut changed = 0;
        for gadget in self.playfield.gadgets_mut() {
            let name = gadget.name().to_string();
            let Some(portal) = gadget.as_portal_mut() else {
                continue;
            };
            if portal.is_open() == open || !select(&*portal) {
                continue;
            }
            if open {
                portal.open();
            } else {
                portal.close();
            }
            changed += 1;
            log::info!("Portal {name} {}", if open { "opened" } else { "closed" });
        }
        changed
    }

    pub fn open_portal(&mut self, name: &str) -> BoardResult<()> {
        self.portal_mut(name)?.open();
        Ok(())
    }

    pub fn close_portal(&mut self, name: &str) -> BoardResult<()> {
        self.portal_mut(name)?.close();
        Ok(())
    }

    /// Names of this board's portals, in insertion order
    pub fn portal_names(&self) -> Vec<String> {
        self.playfield
            .gadgets()
            .iter()
            .filter(|g| g.as_portal().is_some())
            .map(|g| g.name().to_string())
            .collect()
    }

    /// Apply a message from the network collaborator addressed to this board
    pub fn apply_message(&mut self, message: &ProtocolMessage) -> BoardResult<()> {
        if message.receiver() != self.name {
            log::warn!("Board {} ignoring message for {}", self.name, message.receiver());
            return Ok(());
        }
        match message {
            ProtocolMessage::WallTeleport { pos, vel, .. } => {
                if let Err(err) = self.receive_ball(*pos, *vel) {
                    log::warn!("Board {}: ball from {} dropped: {err}", self.name, message.sender());
                    return Err(err);
                }
            }
            ProtocolMessage::PortalTeleport { portal, vel, .. } => {
                if let Err(err) = self.spawn_from_portal(portal, *vel) {
                    log::warn!("Board {}: ball for portal {portal} lost: {err}", self.name);
                    return Err(err);
                }
            }
            ProtocolMessage::Link { other, side, .. } => self.connect_wall(*side, other)?,
            ProtocolMessage::Delink { other, side, .. } => {
                self.disconnect_wall(*side, other);
            }
        }
        Ok(())
    }

    fn post_message(&self, message: ProtocolMessage) {
        if let Err(err) = self.messages.try_send(message) {
            log::warn!("Message queue full, dropping {}", err.into_inner());
        }
    }

    // === Gravity ===

    /// Pull balls towards board position (x, y)
    pub fn distort_gravity(&mut self, x: f64, y: f64) {
        self.simulation.distort_gravity(DVec2::new(x, y));
    }

    pub fn reset_gravity(&mut self) {
        self.simulation.reset_gravity();
    }

    pub fn field(&self) -> Arc<GravityField> {
        self.simulation.field()
    }

    // === Queues ===

    /// Producer end of the input channel, for the thread reading the player
    pub fn input_sender(&self) -> Sender<InputEvent> {
        self.input.sender()
    }

    /// Consumer end of the outbound envelope queue
    pub fn outbound_receiver(&self) -> Receiver<Envelope> {
        self.outbound.receiver()
    }

    pub fn drain_outbound(&self) -> Vec<Envelope> {
        self.outbound.drain()
    }

    /// Consumer end of the protocol message queue
    pub fn message_receiver(&self) -> Receiver<ProtocolMessage> {
        self.messages.receiver()
    }

    pub fn drain_messages(&self) -> Vec<ProtocolMessage> {
        self.messages.drain()
    }

    // === Observers ===

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn physics(&self) -> &Physics {
        self.simulation.physics()
    }

    pub fn balls(&self) -> &[Ball] {
        self.playfield.balls()
    }

    pub fn ball(&self, id: BallId) -> Option<&Ball> {
        self.playfield.ball(id)
    }

    pub fn ball_count(&self) -> usize {
        self.playfield.balls().len()
    }

    pub fn saved_configuration(&self) -> &[Ball] {
        &self.saved_balls
    }

    pub fn walls(&self) -> &[Wall; 4] {
        self.playfield.walls()
    }

    pub fn wall(&self, side: WallSide) -> &Wall {
        self.playfield.wall(side)
    }

    pub fn gadgets(&self) -> &[Gadget] {
        self.playfield.gadgets()
    }

    pub fn gadget(&self, name: &str) -> Option<&Gadget> {
        self.playfield
            .gadget_id(name)
            .and_then(|id| self.playfield.gadget(id))
    }

    pub fn gadget_count(&self) -> usize {
        self.playfield.gadgets().len()
    }

    /// Every trigger link as (source name, target name)
    pub fn trigger_links(&self) -> Vec<(String, String)> {
        let name = |id: GadgetId| {
            self.playfield
                .gadget(id)
                .map(|g| g.name().to_string())
                .unwrap_or_default()
        };
        self.playfield
            .triggers()
            .edges()
            .map(|(source, target)| (name(source), name(target)))
            .collect()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot::capture(self)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let physics = self.physics();
        writeln!(
            f,
            "board {}: gravity {}, friction1 {}, friction2 {}",
            self.name, physics.gravity, physics.friction1, physics.friction2
        )?;
        writeln!(f, "balls:")?;
        for ball in self.balls() {
            let (pos, vel) = (ball.pos(), ball.carried_vel());
            write!(
                f,
                "  ball {} at ({:.3}, {:.3}) velocity ({:.3}, {:.3})",
                ball.id().0,
                pos.x,
                pos.y,
                vel.x,
                vel.y
            )?;
            if ball.in_stasis() {
                write!(f, " [stasis]")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "walls:")?;
        for wall in self.walls() {
            writeln!(f, "  {wall}")?;
        }
        writeln!(f, "gadgets:")?;
        for gadget in self.gadgets() {
            writeln!(f, "  {gadget}")?;
        }
        writeln!(f, "triggers:")?;
        for (source, target) in self.trigger_links() {
            writeln!(f, "  {source} --> {target}")?;
        }
        Ok(())
    }
}
