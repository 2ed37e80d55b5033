//! Entity collections and pairwise collision handling
//!
//! The playfield owns every ball, wall and gadget plus the trigger graph. It
//! knows how to find the earliest collision among all pairs and how to
//! resolve one, but not how to spend a frame; that is the stepper's job.

use std::collections::HashMap;

use crossbeam_channel::Sender;
use glam::DVec2;

use super::ball::{Ball, BallId};
use super::field::GravityField;
use super::gadget::{Gadget, GadgetId};
use super::geometry::{self, Circle, NO_COLLISION};
use super::stepper::Physics;
use super::trigger::TriggerGraph;
use super::wall::{Wall, WallSide};
use crate::error::{BoardError, BoardResult};
use crate::transport::Envelope;

/// The pair involved in a collision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    /// Indices into the ball list, first one moving
    Balls(usize, usize),
    Wall(usize, WallSide),
    Gadget(usize, GadgetId),
}

#[derive(Debug)]
pub struct Playfield {
    balls: Vec<Ball>,
    walls: [Wall; 4],
    gadgets: Vec<Gadget>,
    names: HashMap<String, GadgetId>,
    triggers: TriggerGraph,
    transport: Sender<Envelope>,
    next_ball_id: u64,
}

impl Playfield {
    pub fn new(size: f64, transport: Sender<Envelope>) -> Self {
        Self {
            balls: Vec::new(),
            walls: WallSide::ALL.map(|side| Wall::new(side, size)),
            gadgets: Vec::new(),
            names: HashMap::new(),
            triggers: TriggerGraph::new(),
            transport,
            next_ball_id: 1,
        }
    }

    // === Balls ===

    /// Take ownership of a ball and give it a fresh id
    pub fn add_ball(&mut self, mut ball: Ball) -> BallId {
        let id = BallId(self.next_ball_id);
        self.next_ball_id += 1;
        ball.set_id(id);
        self.balls.push(ball);
        id
    }

    pub fn remove_ball(&mut self, id: BallId) -> Option<Ball> {
        let index = self.balls.iter().position(|b| b.id() == id)?;
        Some(self.balls.remove(index))
    }

    pub fn ball(&self, id: BallId) -> Option<&Ball> {
        self.balls.iter().find(|b| b.id() == id)
    }

    pub fn ball_mut(&mut self, id: BallId) -> Option<&mut Ball> {
        self.balls.iter_mut().find(|b| b.id() == id)
    }

    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    pub fn clear_balls(&mut self) {
        self.balls.clear();
    }

    // === Walls ===

    pub fn walls(&self) -> &[Wall; 4] {
        &self.walls
    }

    pub fn wall(&self, side: WallSide) -> &Wall {
        &self.walls[Self::wall_index(side)]
    }

    pub fn wall_mut(&mut self, side: WallSide) -> &mut Wall {
        &mut self.walls[Self::wall_index(side)]
    }

    fn wall_index(side: WallSide) -> usize {
        match side {
            WallSide::Left => 0,
            WallSide::Right => 1,
            WallSide::Top => 2,
            WallSide::Bottom => 3,
        }
    }

    /// Drop every ball that now overlaps or lies beyond the wall on `side`
    pub fn discard_clipping(&mut self, side: WallSide) -> usize {
        let wall = &self.walls[Self::wall_index(side)];
        let before = self.balls.len();
        self.balls.retain(|b| !wall.is_clipping(b));
        let discarded = before - self.balls.len();
        if discarded > 0 {
            log::debug!("discarded {discarded} ball(s) clipping the {side} wall");
        }
        discarded
    }

    // === Gadgets ===

    /// Add a gadget; names are unique per board
    pub fn add_gadget(&mut self, gadget: Gadget) -> BoardResult<GadgetId> {
        if self.names.contains_key(gadget.name()) {
            return Err(BoardError::DuplicateGadget(gadget.name().to_string()));
        }
        let id = GadgetId(self.gadgets.len());
        self.names.insert(gadget.name().to_string(), id);
        self.gadgets.push(gadget);
        Ok(id)
    }

    pub fn gadget_id(&self, name: &str) -> Option<GadgetId> {
        self.names.get(name).copied()
    }

    pub fn gadget(&self, id: GadgetId) -> Option<&Gadget> {
        self.gadgets.get(id.0)
    }

    pub fn gadget_mut(&mut self, id: GadgetId) -> Option<&mut Gadget> {
        self.gadgets.get_mut(id.0)
    }

    pub fn gadgets(&self) -> &[Gadget] {
        &self.gadgets
    }

    pub fn gadgets_mut(&mut self) -> &mut [Gadget] {
        &mut self.gadgets
    }

    pub fn triggers(&self) -> &TriggerGraph {
        &self.triggers
    }

    pub fn triggers_mut(&mut self) -> &mut TriggerGraph {
        &mut self.triggers
    }

    /// Run the action of gadget `id` (as if a key bound to it was pressed)
    pub fn trigger_action(&mut self, id: GadgetId) {
        if let Some(gadget) = self.gadgets.get_mut(id.0) {
            gadget.trigger_action(&mut self.balls);
        }
    }

    /// Gadget `id` was hit: light it up and run the action of every gadget
    /// it points at. One level only.
    pub fn fire(&mut self, id: GadgetId) {
        let Some(source) = self.gadgets.get_mut(id.0) else {
            return;
        };
        source.mark_triggered();
        let targets: Vec<GadgetId> = self.triggers.targets(id).collect();
        for target in targets {
            self.trigger_action(target);
        }
    }

    // === Collision search and resolution ===

    /// Earliest collision among all pairs, if any pair ever collides.
    ///
    /// Balls in stasis never initiate a collision but still act as static
    /// obstacles for other balls. The scan stops early at a zero time.
    pub fn earliest_collision(&self) -> Option<(f64, Contact)> {
        let mut best: Option<(f64, Contact)> = None;

        for (i, ball) in self.balls.iter().enumerate() {
            for (j, other) in self.balls.iter().enumerate().skip(i + 1) {
                if ball.in_stasis() && other.in_stasis() {
                    continue;
                }
                let t = geometry::time_until_ball_collision(
                    ball.pos(),
                    ball.radius(),
                    ball.vel(),
                    other.pos(),
                    other.radius(),
                    other.vel(),
                );
                let contact = if ball.in_stasis() {
                    Contact::Balls(j, i)
                } else {
                    Contact::Balls(i, j)
                };
                if keep_earlier(&mut best, t, contact) {
                    return best;
                }
            }

            if ball.in_stasis() {
                continue;
            }
            for wall in &self.walls {
                let t = wall.time_until_collision(ball);
                if keep_earlier(&mut best, t, Contact::Wall(i, wall.side())) {
                    return best;
                }
            }
            for (g, gadget) in self.gadgets.iter().enumerate() {
                let t = gadget.time_until_collision(ball);
                if keep_earlier(&mut best, t, Contact::Gadget(i, GadgetId(g))) {
                    return best;
                }
            }
        }
        best
    }

    /// Apply the collision response for `contact`
    pub fn resolve(&mut self, contact: Contact) {
        match contact {
            Contact::Balls(i, j) => self.resolve_balls(i, j),
            Contact::Wall(i, side) => {
                let wall = &self.walls[Self::wall_index(side)];
                if let Some(ball) = self.balls.get_mut(i) {
                    wall.collide(ball, &self.transport);
                }
            }
            Contact::Gadget(i, id) => {
                let (Some(ball), Some(gadget)) = (self.balls.get_mut(i), self.gadgets.get_mut(id.0))
                else {
                    return;
                };
                if gadget.collide(ball, &self.transport) {
                    self.fire(id);
                }
            }
        }
    }

    fn resolve_balls(&mut self, i: usize, j: usize) {
        if i == j || i >= self.balls.len() || j >= self.balls.len() {
            return;
        }
        let (a, b) = if i < j {
            let (left, right) = self.balls.split_at_mut(j);
            (&mut left[i], &mut right[0])
        } else {
            let (left, right) = self.balls.split_at_mut(i);
            (&mut right[0], &mut left[j])
        };

        if b.in_stasis() {
            let obstacle = Circle::new(b.pos(), b.radius());
            a.impart(geometry::reflect_circle(&obstacle, a.pos(), a.vel(), 1.0));
            return;
        }
        let (va, vb) = geometry::reflect_balls(a.pos(), a.mass(), a.vel(), b.pos(), b.mass(), b.vel());
        a.impart(va);
        b.impart(vb);
    }

    /// Move everything along for `dt` seconds
    pub fn displace_all(&mut self, dt: f64) {
        for ball in &mut self.balls {
            ball.displace(dt);
        }
        for gadget in &mut self.gadgets {
            gadget.displace(dt);
        }
    }

    /// Friction and gravity for `dt` seconds, sampling `field` at each ball
    pub fn apply_forces(&mut self, dt: f64, field: &GravityField, physics: &Physics) {
        for ball in &mut self.balls {
            let gravity: DVec2 = field.value_at(ball.pos());
            ball.apply_physics(dt, gravity, physics.friction1, physics.friction2);
        }
    }
}

/// Record `contact` if it happens before the best so far. Returns true once
/// a zero-time collision is found, since nothing can beat it.
fn keep_earlier(best: &mut Option<(f64, Contact)>, t: f64, contact: Contact) -> bool {
    if t < best.map_or(NO_COLLISION, |(b, _)| b) {
        *best = Some((t, contact));
    }
    t == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::gadget::{Chirality, FlipperState, GadgetBody, Orientation};
    use crossbeam_channel::{Receiver, bounded};
    use glam::IVec2;

    fn playfield() -> (Playfield, Receiver<Envelope>) {
        let (tx, rx) = bounded(16);
        (Playfield::new(20.0, tx), rx)
    }

    #[test]
    fn test_duplicate_gadget_rejected() {
        let (mut field, _rx) = playfield();
        field.add_gadget(Gadget::circle_bumper("c", IVec2::new(1, 1)).unwrap()).unwrap();
        let err = field
            .add_gadget(Gadget::square_bumper("c", IVec2::new(2, 2)).unwrap())
            .unwrap_err();
        assert!(matches!(err, BoardError::DuplicateGadget(name) if name == "c"));
        assert_eq!(field.gadgets().len(), 1);
    }

    #[test]
    fn test_earliest_collision_picks_nearest() {
        let (mut field, _rx) = playfield();
        let near = field
            .add_gadget(Gadget::square_bumper("near", IVec2::new(4, 5)).unwrap())
            .unwrap();
        field.add_gadget(Gadget::square_bumper("far", IVec2::new(8, 5)).unwrap()).unwrap();
        field.add_ball(Ball::new(DVec2::new(1.0, 5.5), DVec2::new(10.0, 0.0)));

        let (t, contact) = field.earliest_collision().unwrap();
        assert!((t - 0.275).abs() < 1e-9);
        assert_eq!(contact, Contact::Gadget(0, near));
    }

    #[test]
    fn test_hit_fires_all_targets() {
        let (mut field, _rx) = playfield();
        let bumper = field
            .add_gadget(Gadget::circle_bumper("hit", IVec2::new(10, 5)).unwrap())
            .unwrap();
        let left = field
            .add_gadget(
                Gadget::flipper("lf", IVec2::new(2, 15), Chirality::Left, Orientation::Deg0)
                    .unwrap(),
            )
            .unwrap();
        let right = field
            .add_gadget(
                Gadget::flipper("rf", IVec2::new(6, 15), Chirality::Right, Orientation::Deg0)
                    .unwrap(),
            )
            .unwrap();
        field.triggers_mut().link(bumper, left);
        field.triggers_mut().link(bumper, right);

        field.add_ball(Ball::new(DVec2::new(10.5, 2.0), DVec2::new(0.0, 10.0)));
        let (t, contact) = field.earliest_collision().unwrap();
        field.displace_all(t);
        field.resolve(contact);

        for id in [left, right] {
            let GadgetBody::Flipper(f) = field.gadget(id).unwrap().body() else {
                panic!("expected flipper");
            };
            assert_eq!(f.state(), FlipperState::FlippingUp);
        }
        assert_eq!(field.gadget(bumper).unwrap().trigger_timer(), 0.0);
        assert!(field.balls()[0].vel().y < 0.0);
    }

    #[test]
    fn test_ball_bounces_off_captured_ball() {
        let (mut field, _rx) = playfield();
        let mut parked = Ball::new(DVec2::new(10.0, 10.0), DVec2::ZERO);
        parked.absorb();
        field.add_ball(parked);
        field.add_ball(Ball::new(DVec2::new(5.0, 10.0), DVec2::new(10.0, 0.0)));

        let (t, contact) = field.earliest_collision().unwrap();
        assert_eq!(contact, Contact::Balls(1, 0));
        assert!((t - 0.45).abs() < 1e-9);

        field.displace_all(t);
        field.resolve(contact);
        assert!((field.balls()[1].vel() - DVec2::new(-10.0, 0.0)).length() < 1e-9);
        assert_eq!(field.balls()[0].pos(), DVec2::new(10.0, 10.0));
        assert!(field.balls()[0].in_stasis());
    }

    #[test]
    fn test_head_on_balls_exchange() {
        let (mut field, _rx) = playfield();
        field.add_ball(Ball::new(DVec2::new(5.0, 10.0), DVec2::new(10.0, 0.0)));
        field.add_ball(Ball::new(DVec2::new(10.0, 10.0), DVec2::new(-10.0, 0.0)));

        let (t, contact) = field.earliest_collision().unwrap();
        assert!((t - 0.225).abs() < 1e-9);
        field.displace_all(t);
        field.resolve(contact);
        assert!((field.balls()[0].vel() - DVec2::new(-10.0, 0.0)).length() < 1e-9);
        assert!((field.balls()[1].vel() - DVec2::new(10.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn test_discard_clipping() {
        let (mut field, _rx) = playfield();
        field.add_ball(Ball::new(DVec2::new(19.9, 10.0), DVec2::ZERO));
        field.add_ball(Ball::new(DVec2::new(10.0, 10.0), DVec2::ZERO));
        field.wall_mut(WallSide::Right).connect("east");
        assert_eq!(field.discard_clipping(WallSide::Right), 0);
        field.wall_mut(WallSide::Right).disconnect();
        assert_eq!(field.discard_clipping(WallSide::Right), 1);
        assert_eq!(field.balls().len(), 1);
    }
}
