//! Balls: the only mobile circles in the arena

use glam::DVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::geometry::Circle;
use crate::consts;

/// Arena-scoped ball identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BallId(pub u64);

/// A moving ball.
///
/// While in stasis (captured by an absorber or in transit through a portal)
/// the ball ignores displacement and forces and reports zero velocity. The
/// velocity it had is kept and comes back on release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    id: BallId,
    pos: DVec2,
    vel: DVec2,
    radius: f64,
    mass: f64,
    stasis: bool,
    terminal_speed: f64,
    color: [f32; 3],
}

impl Ball {
    pub fn new(pos: DVec2, vel: DVec2) -> Self {
        Self {
            id: BallId(0),
            pos,
            vel: vel.clamp_length_max(consts::TERMINAL_VELOCITY),
            radius: consts::BALL_RADIUS,
            mass: consts::BALL_MASS,
            stasis: false,
            terminal_speed: consts::TERMINAL_VELOCITY,
            color: [1.0, 1.0, 1.0],
        }
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_terminal_speed(mut self, speed: f64) -> Self {
        self.terminal_speed = speed;
        self.vel = self.vel.clamp_length_max(speed);
        self
    }

    pub fn with_color(mut self, color: [f32; 3]) -> Self {
        self.color = color;
        self
    }

    pub(crate) fn set_id(&mut self, id: BallId) {
        self.id = id;
    }

    pub fn id(&self) -> BallId {
        self.id
    }

    pub fn pos(&self) -> DVec2 {
        self.pos
    }

    /// Observed velocity: zero while in stasis
    pub fn vel(&self) -> DVec2 {
        if self.stasis { DVec2::ZERO } else { self.vel }
    }

    /// Velocity kept through stasis; what the ball leaves with when it is
    /// released or transported
    pub fn carried_vel(&self) -> DVec2 {
        self.vel
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn color(&self) -> [f32; 3] {
        self.color
    }

    pub fn terminal_speed(&self) -> f64 {
        self.terminal_speed
    }

    pub fn in_stasis(&self) -> bool {
        self.stasis
    }

    pub fn circle(&self) -> Circle {
        Circle::new(self.pos, self.radius)
    }

    /// Move along the current velocity for `dt` seconds
    pub fn displace(&mut self, dt: f64) {
        if self.stasis || dt <= 0.0 {
            return;
        }
        self.pos += self.vel * dt;
    }

    /// Apply friction and gravity for `dt` seconds, then cap the speed
    pub fn apply_physics(&mut self, dt: f64, gravity: DVec2, friction1: f64, friction2: f64) {
        if self.stasis || dt <= 0.0 {
            return;
        }
        let damping = 1.0 - friction1 * dt - friction2 * self.vel.length() * dt;
        self.vel = (self.vel * damping + gravity * dt).clamp_length_max(self.terminal_speed);
    }

    /// Set the velocity, capped at terminal speed
    pub fn impart(&mut self, vel: DVec2) {
        self.vel = vel.clamp_length_max(self.terminal_speed);
    }

    pub fn move_to(&mut self, pos: DVec2) {
        self.pos = pos;
    }

    /// Enter stasis
    pub fn absorb(&mut self) {
        self.stasis = true;
    }

    /// Leave stasis
    pub fn release(&mut self) {
        self.stasis = false;
    }
}

/// A bright random colour: random hue at high saturation and full value
pub fn random_color(rng: &mut impl Rng) -> [f32; 3] {
    let hue = rng.random::<f32>() * 6.0;
    let sector = hue.floor();
    let f = hue - sector;
    let (v, s) = (1.0f32, 0.8f32);
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match sector as u32 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}
