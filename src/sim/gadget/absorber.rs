//! Absorbers: rectangular chutes that swallow balls and shoot them back out

use std::collections::VecDeque;

use glam::DVec2;

use super::bumper::Outline;
use crate::sim::ball::{Ball, BallId};

/// Launch velocity of a released ball (straight up at 50 L/s)
pub const LAUNCH_VELOCITY: DVec2 = DVec2::new(0.0, -50.0);

/// FIFO store of captured balls with a minimum gap between releases
#[derive(Debug, Clone, PartialEq)]
pub struct Absorber {
    outline: Outline,
    slot: DVec2,
    release_point: DVec2,
    captured: VecDeque<BallId>,
    latency: f64,
    since_release: f64,
}

impl Absorber {
    pub fn new(origin: DVec2, width: f64, height: f64, latency: f64) -> Self {
        Self {
            outline: Outline::rectangle(origin, width, height),
            slot: origin + DVec2::new(width - 0.25, height - 0.25),
            release_point: origin + DVec2::new(width - 0.25, -0.25),
            captured: VecDeque::new(),
            latency,
            since_release: f64::INFINITY,
        }
    }

    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    /// Where captured balls wait (bottom-right corner inside the chute)
    pub fn slot(&self) -> DVec2 {
        self.slot
    }

    /// Where released balls reappear (just above the top-right corner)
    pub fn release_point(&self) -> DVec2 {
        self.release_point
    }

    pub fn captured(&self) -> usize {
        self.captured.len()
    }

    pub fn latency(&self) -> f64 {
        self.latency
    }

    pub fn time_until_collision(&self, ball: &Ball) -> f64 {
        self.outline.time_until_collision(ball)
    }

    /// Capture the ball: stop it, park it in the slot and hold it in stasis
    pub fn collide(&mut self, ball: &mut Ball) {
        ball.impart(DVec2::ZERO);
        ball.move_to(self.slot);
        ball.absorb();
        self.captured.push_back(ball.id());
    }

    /// Release the oldest captured ball still on the board.
    ///
    /// No-op while the latency window since the last release is open or when
    /// nothing is captured. Returns true if a ball was launched.
    pub fn release(&mut self, balls: &mut [Ball]) -> bool {
        if self.since_release < self.latency {
            return false;
        }
        while let Some(id) = self.captured.pop_front() {
            let Some(ball) = balls.iter_mut().find(|b| b.id() == id && b.in_stasis()) else {
                log::debug!("captured ball {id:?} no longer on board");
                continue;
            };
            ball.move_to(self.release_point);
            ball.release();
            ball.impart(LAUNCH_VELOCITY);
            self.since_release = 0.0;
            return true;
        }
        false
    }

    pub fn displace(&mut self, dt: f64) {
        if dt > 0.0 {
            self.since_release += dt;
        }
    }

    pub fn reset(&mut self) {
        self.captured.clear();
        self.since_release = f64::INFINITY;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball_with_id(id: u64, pos: DVec2, vel: DVec2) -> Ball {
        let mut ball = Ball::new(pos, vel);
        ball.set_id(BallId(id));
        ball
    }

    #[test]
    fn test_capture_parks_ball_in_slot() {
        let mut absorber = Absorber::new(DVec2::new(5.0, 5.0), 4.0, 3.0, 0.0);
        let mut ball = ball_with_id(1, DVec2::new(6.0, 2.0), DVec2::new(0.0, 10.0));

        let t = absorber.time_until_collision(&ball);
        assert!((t - 0.275).abs() < 1e-9);
        ball.displace(t);
        absorber.collide(&mut ball);

        assert_eq!(ball.pos(), DVec2::new(8.75, 7.75));
        assert_eq!(ball.vel(), DVec2::ZERO);
        assert!(ball.in_stasis());
        assert_eq!(absorber.captured(), 1);
    }

    #[test]
    fn test_release_from_bottom_row() {
        let mut absorber = Absorber::new(DVec2::new(0.0, 19.0), 20.0, 1.0, 0.0);
        let mut balls = vec![ball_with_id(3, DVec2::new(4.0, 18.0), DVec2::new(0.0, 5.0))];
        absorber.collide(&mut balls[0]);

        assert!(absorber.release(&mut balls));
        assert_eq!(balls[0].pos(), DVec2::new(19.75, 18.75));
        assert_eq!(balls[0].vel(), DVec2::new(0.0, -50.0));
        assert!(!balls[0].in_stasis());
        assert_eq!(absorber.captured(), 0);
    }

    #[test]
    fn test_empty_release_is_noop() {
        let mut absorber = Absorber::new(DVec2::new(0.0, 19.0), 20.0, 1.0, 0.0);
        let mut balls: Vec<Ball> = Vec::new();
        assert!(!absorber.release(&mut balls));
        assert_eq!(absorber.captured(), 0);
    }

    #[test]
    fn test_latency_limits_release_rate() {
        let mut absorber = Absorber::new(DVec2::new(0.0, 19.0), 20.0, 1.0, 0.5);
        let mut balls = vec![
            ball_with_id(1, DVec2::new(2.0, 18.0), DVec2::ZERO),
            ball_with_id(2, DVec2::new(3.0, 18.0), DVec2::ZERO),
        ];
        absorber.collide(&mut balls[0]);
        absorber.collide(&mut balls[1]);

        assert!(absorber.release(&mut balls));
        assert!(!absorber.release(&mut balls));
        assert!(balls[1].in_stasis());

        absorber.displace(0.25);
        assert!(!absorber.release(&mut balls));
        absorber.displace(0.25);
        assert!(absorber.release(&mut balls));
        assert!(!balls[1].in_stasis());
    }

    #[test]
    fn test_release_skips_departed_balls() {
        let mut absorber = Absorber::new(DVec2::new(0.0, 19.0), 20.0, 1.0, 0.0);
        let mut gone = ball_with_id(1, DVec2::new(2.0, 18.0), DVec2::ZERO);
        let mut kept = ball_with_id(2, DVec2::new(3.0, 18.0), DVec2::ZERO);
        absorber.collide(&mut gone);
        absorber.collide(&mut kept);

        let mut balls = vec![kept];
        assert!(absorber.release(&mut balls));
        assert!(!balls[0].in_stasis());
        assert_eq!(absorber.captured(), 0);
    }
}
