//! Flippers: 2×2 paddles that swing a quarter turn about a pivot

use std::f64::consts::{FRAC_PI_2, PI};

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::rotate_around;
use crate::sim::ball::Ball;
use crate::sim::geometry::{self, Circle, NO_COLLISION, Segment};

use super::Orientation;

/// Swing speed: 1080°/s
pub const ANGULAR_SPEED: f64 = 6.0 * PI;
/// Seconds for a full quarter-turn swing
pub const FLIP_TIME: f64 = FRAC_PI_2 / ANGULAR_SPEED;
/// Flippers keep 95% of the normal velocity
pub const RESTITUTION: f64 = 0.95;
/// Radius of the paddle ends (and half its thickness)
pub const END_RADIUS: f64 = 0.25;
/// Distance between the two end centres
pub const LENGTH: f64 = 1.5;

/// Which way the paddle swings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chirality {
    Left,
    Right,
}

impl Chirality {
    fn sign(&self) -> f64 {
        match self {
            Chirality::Left => 1.0,
            Chirality::Right => -1.0,
        }
    }
}

/// Flipper state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlipperState {
    Down,
    Up,
    FlippingUp,
    FlippingDown,
}

impl FlipperState {
    pub fn is_moving(&self) -> bool {
        matches!(self, FlipperState::FlippingUp | FlipperState::FlippingDown)
    }
}

/// Paddle geometry in one position: two long sides and two round ends
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub sides: [Segment; 2],
    pub ends: [Circle; 2],
}

impl Pose {
    /// `across` is the unit vector across the paddle, `along` runs from the
    /// pivot end to the far end
    fn new(pivot: DVec2, across: DVec2, along: DVec2) -> Self {
        let off = across * END_RADIUS;
        Self {
            sides: [
                Segment::new(pivot + off, pivot + off + along),
                Segment::new(pivot - off, pivot - off + along),
            ],
            ends: [
                Circle::new(pivot, END_RADIUS),
                Circle::new(pivot + along, END_RADIUS),
            ],
        }
    }

    fn rotated(&self, pivot: DVec2, angle: f64) -> Self {
        let seg = |s: Segment| {
            Segment::new(
                rotate_around(s.start, pivot, angle),
                rotate_around(s.end, pivot, angle),
            )
        };
        let circ = |c: Circle| Circle::new(rotate_around(c.center, pivot, angle), c.radius);
        Self {
            sides: self.sides.map(seg),
            ends: self.ends.map(circ),
        }
    }

    fn time_until_collision(&self, ball: &Ball, pivot: DVec2, omega: f64) -> f64 {
        let (pos, r, vel) = (ball.pos(), ball.radius(), ball.vel());
        let sides = self.sides.iter().map(|s| {
            geometry::time_until_rotating_segment_collision(s, pivot, omega, pos, r, vel)
        });
        let ends = self.ends.iter().map(|c| {
            geometry::time_until_rotating_circle_collision(c, pivot, omega, pos, r, vel)
        });
        sides.chain(ends).fold(NO_COLLISION, f64::min)
    }

    fn reflect(&self, ball: &Ball, pivot: DVec2, omega: f64) -> DVec2 {
        let (pos, vel) = (ball.pos(), ball.vel());
        let side = self
            .sides
            .iter()
            .map(|s| (s, pos.distance(s.closest_point(pos))))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        let end = self
            .ends
            .iter()
            .map(|c| (c, pos.distance(c.center) - c.radius))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match (side, end) {
            (Some((s, ds)), Some((_, dc))) if ds <= dc => {
                geometry::reflect_rotating_segment(s, pivot, omega, pos, vel, RESTITUTION)
            }
            (_, Some((c, _))) => {
                geometry::reflect_rotating_circle(c, pivot, omega, pos, vel, RESTITUTION)
            }
            (Some((s, _)), None) => {
                geometry::reflect_rotating_segment(s, pivot, omega, pos, vel, RESTITUTION)
            }
            (None, None) => vel,
        }
    }
}

/// A left or right flipper occupying a 2×2 box
#[derive(Debug, Clone, PartialEq)]
pub struct Flipper {
    chirality: Chirality,
    orientation: Orientation,
    pivot: DVec2,
    down: Pose,
    up: Pose,
    state: FlipperState,
    timer: f64,
}

impl Flipper {
    pub fn new(origin: DVec2, chirality: Chirality, orientation: Orientation) -> Self {
        let ov = orientation.vector();
        let c = chirality.sign();
        let pivot = DVec2::new(
            origin.x + 1.0 - ov.dot(DVec2::new(1.0, c)) * 0.75,
            origin.y + 1.0 - ov.dot(DVec2::new(-c, 1.0)) * 0.75,
        );

        let down_across = DVec2::new(ov.y, ov.x);
        let up_across = DVec2::new(-c * ov.x, c * ov.y);
        let down = Pose::new(pivot, down_across, DVec2::new(down_across.y, down_across.x) * LENGTH);
        let up = Pose::new(pivot, up_across, DVec2::new(up_across.y, up_across.x) * LENGTH);

        Self {
            chirality,
            orientation,
            pivot,
            down,
            up,
            state: FlipperState::Down,
            timer: 0.0,
        }
    }

    pub fn chirality(&self) -> Chirality {
        self.chirality
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn pivot(&self) -> DVec2 {
        self.pivot
    }

    pub fn state(&self) -> FlipperState {
        self.state
    }

    /// Signed angular velocity in rad/s; zero at rest
    pub fn angular_velocity(&self) -> f64 {
        let c = self.chirality.sign();
        match self.state {
            FlipperState::FlippingUp => -c * ANGULAR_SPEED,
            FlipperState::FlippingDown => c * ANGULAR_SPEED,
            FlipperState::Down | FlipperState::Up => 0.0,
        }
    }

    /// Current paddle geometry
    pub fn pose(&self) -> Pose {
        let c = self.chirality.sign();
        match self.state {
            FlipperState::Down => self.down,
            FlipperState::Up => self.up,
            FlipperState::FlippingUp => self.down.rotated(self.pivot, -c * self.timer * ANGULAR_SPEED),
            FlipperState::FlippingDown => self
                .down
                .rotated(self.pivot, -c * (FRAC_PI_2 - self.timer * ANGULAR_SPEED)),
        }
    }

    /// Geometry once the current swing (if any) has finished
    fn resting_pose(&self) -> Pose {
        match self.state {
            FlipperState::Down | FlipperState::FlippingDown => self.down,
            FlipperState::Up | FlipperState::FlippingUp => self.up,
        }
    }

    /// Start swinging; ignored while already moving
    pub fn flip(&mut self) {
        match self.state {
            FlipperState::Down => self.state = FlipperState::FlippingUp,
            FlipperState::Up => self.state = FlipperState::FlippingDown,
            FlipperState::FlippingUp | FlipperState::FlippingDown => return,
        }
        self.timer = 0.0;
    }

    /// Advance the swing by `dt` seconds
    pub fn displace(&mut self, dt: f64) {
        if !self.state.is_moving() || dt <= 0.0 {
            return;
        }
        self.timer += dt;
        if self.timer >= FLIP_TIME {
            self.state = match self.state {
                FlipperState::FlippingUp => FlipperState::Up,
                _ => FlipperState::Down,
            };
            self.timer = 0.0;
        }
    }

    /// Time until the paddle and ball touch.
    ///
    /// While swinging, an impact that would only happen after the swing ends
    /// is predicted against the resting paddle: the ball is advanced to the
    /// moment rotation stops and tested against the stationary geometry.
    pub fn time_until_collision(&self, ball: &Ball) -> f64 {
        let omega = self.angular_velocity();
        let t = self.pose().time_until_collision(ball, self.pivot, omega);
        if !self.state.is_moving() {
            return t;
        }

        let remaining = FLIP_TIME - self.timer;
        if t < remaining {
            return t;
        }
        let mut ghost = ball.clone();
        ghost.displace(remaining);
        remaining + self.resting_pose().time_until_collision(&ghost, self.pivot, 0.0)
    }

    pub fn collide(&self, ball: &mut Ball) {
        let vel = self.pose().reflect(ball, self.pivot, self.angular_velocity());
        ball.impart(vel);
    }

    pub fn reset(&mut self) {
        self.state = FlipperState::Down;
        self.timer = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: DVec2, b: DVec2) {
        assert!((a - b).length() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_left_flipper_geometry() {
        let flipper = Flipper::new(DVec2::new(4.0, 10.0), Chirality::Left, Orientation::Deg0);
        assert_close(flipper.pivot(), DVec2::new(4.25, 10.25));

        let down = flipper.pose();
        assert_close(down.ends[1].center, DVec2::new(4.25, 11.75));
        let up = flipper.up;
        assert_close(up.ends[1].center, DVec2::new(5.75, 10.25));
    }

    #[test]
    fn test_right_flipper_geometry() {
        let flipper = Flipper::new(DVec2::new(4.0, 10.0), Chirality::Right, Orientation::Deg0);
        assert_close(flipper.pivot(), DVec2::new(5.75, 10.25));
        assert_close(flipper.up.ends[1].center, DVec2::new(4.25, 10.25));
    }

    #[test]
    fn test_rotated_flipper_geometry() {
        // a quarter turn moves the pivot to the top-right and the paddle points left
        let flipper = Flipper::new(DVec2::new(4.0, 10.0), Chirality::Left, Orientation::Deg90);
        assert_close(flipper.pivot(), DVec2::new(5.75, 10.25));
        assert_close(flipper.down.ends[1].center, DVec2::new(4.25, 10.25));
    }

    #[test]
    fn test_flip_completes_after_flip_time() {
        let mut flipper = Flipper::new(DVec2::new(4.0, 10.0), Chirality::Left, Orientation::Deg0);
        flipper.flip();
        assert_eq!(flipper.state(), FlipperState::FlippingUp);
        assert!(flipper.angular_velocity() != 0.0);

        flipper.displace(FLIP_TIME / 2.0);
        // mid-swing trigger is ignored
        flipper.flip();
        assert_eq!(flipper.state(), FlipperState::FlippingUp);

        flipper.displace(FLIP_TIME / 2.0);
        assert_eq!(flipper.state(), FlipperState::Up);
        assert_eq!(flipper.angular_velocity(), 0.0);
        assert_eq!(flipper.pose(), flipper.up);

        flipper.flip();
        flipper.displace(FLIP_TIME);
        assert_eq!(flipper.state(), FlipperState::Down);
    }

    #[test]
    fn test_mid_swing_pose_is_halfway() {
        let mut flipper = Flipper::new(DVec2::new(4.0, 10.0), Chirality::Left, Orientation::Deg0);
        flipper.flip();
        flipper.displace(FLIP_TIME / 2.0);
        let tip = flipper.pose().ends[1].center - flipper.pivot();
        let diagonal = DVec2::new(1.0, 1.0).normalize() * LENGTH;
        assert_close(tip, diagonal);
    }

    #[test]
    fn test_resting_bounce_uses_restitution() {
        let flipper = Flipper::new(DVec2::new(4.0, 10.0), Chirality::Left, Orientation::Deg0);
        // ball moving left onto the outer face of the hanging paddle
        let mut ball = Ball::new(DVec2::new(6.0, 11.0), DVec2::new(-10.0, 0.0));
        let t = flipper.time_until_collision(&ball);
        assert!((t - (6.0 - 4.5 - 0.25) / 10.0).abs() < 1e-9);
        ball.displace(t);
        flipper.collide(&mut ball);
        assert_close(ball.vel(), DVec2::new(9.5, 0.0));
    }

    #[test]
    fn test_prediction_past_swing_end() {
        let mut flipper = Flipper::new(DVec2::new(4.0, 10.0), Chirality::Left, Orientation::Deg0);
        flipper.flip();
        // ball drops slowly onto where the raised paddle will rest
        let ball = Ball::new(DVec2::new(5.0, 8.0), DVec2::new(0.0, 5.0));
        let t = flipper.time_until_collision(&ball);
        // raised paddle's top face is y = 10.0, reached when the centre is at 9.75
        assert!((t - 1.75 / 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_moving_flipper_adds_speed() {
        let mut flipper = Flipper::new(DVec2::new(4.0, 10.0), Chirality::Left, Orientation::Deg0);
        flipper.flip();
        // resting ball touching the outer face of the paddle near its tip
        let mut ball = Ball::new(DVec2::new(4.75, 11.5), DVec2::ZERO);
        flipper.collide(&mut ball);
        assert!(ball.vel().x > 0.0);
        assert!(ball.vel().length() > 5.0);
    }
}
