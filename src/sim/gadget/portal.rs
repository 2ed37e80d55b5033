//! Portals: circular holes that send balls to another portal

use crossbeam_channel::Sender;
use glam::DVec2;

use crate::sim::ball::Ball;
use crate::sim::geometry::{self, Circle, NO_COLLISION};
use crate::transport::Envelope;

/// Exit velocity for a ball that arrives without any
pub const DEFAULT_EXIT_VELOCITY: DVec2 = DVec2::new(0.0, 5.0);

/// Distance from the portal centre at which exiting balls appear
const EXIT_OFFSET: f64 = 0.25;

#[derive(Debug, Clone, PartialEq)]
pub struct Portal {
    circle: Circle,
    open: bool,
    target_board: Option<String>,
    target_portal: String,
}

impl Portal {
    pub const RADIUS: f64 = 0.5;

    /// A closed portal leading to `target_portal`, on `target_board` or on
    /// this board when `None`
    pub fn new(origin: DVec2, target_board: Option<String>, target_portal: String) -> Self {
        Self {
            circle: Circle::new(origin + DVec2::splat(0.5), Self::RADIUS),
            open: false,
            target_board,
            target_portal,
        }
    }

    pub fn circle(&self) -> Circle {
        self.circle
    }

    pub fn center(&self) -> DVec2 {
        self.circle.center
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn target_board(&self) -> Option<&str> {
        self.target_board.as_deref()
    }

    pub fn target_portal(&self) -> &str {
        &self.target_portal
    }

    /// True when the exit portal lives on this same board
    pub fn is_local(&self) -> bool {
        self.target_board.is_none()
    }

    pub fn time_until_collision(&self, ball: &Ball) -> f64 {
        if !self.open {
            return NO_COLLISION;
        }
        geometry::time_until_circle_collision(&self.circle, ball.pos(), ball.radius(), ball.vel())
    }

    /// Swallow the ball: centre it, freeze it and post it to the exit.
    ///
    /// Closed portals leave the ball untouched. If the transport queue is
    /// full the portal bounces the ball instead. Returns true if the ball
    /// was sent.
    pub fn collide(&self, ball: &mut Ball, transport: &Sender<Envelope>) -> bool {
        if !self.open {
            return false;
        }
        let mut sent = ball.clone();
        sent.move_to(self.circle.center);
        sent.absorb();
        let envelope = Envelope::to_portal(sent.clone(), self.target_board(), &self.target_portal);
        if transport.try_send(envelope).is_err() {
            log::warn!("Transport queue full, portal bounces ball");
            ball.impart(geometry::reflect_circle(&self.circle, ball.pos(), ball.vel(), 1.0));
            return false;
        }
        *ball = sent;
        true
    }

    /// Place an arriving ball just outside the centre along its velocity
    pub fn emit(&self, ball: &mut Ball, vel: DVec2) {
        let vel = if vel == DVec2::ZERO { DEFAULT_EXIT_VELOCITY } else { vel };
        ball.move_to(self.circle.center + vel.normalize_or_zero() * EXIT_OFFSET);
        ball.release();
        ball.impart(vel);
    }
}
