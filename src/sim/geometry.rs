//! Closed-form collision geometry
//!
//! Every query answers "how long until this moving ball touches that shape"
//! assuming both keep their current velocity, and every reflection returns
//! the ball's post-impact velocity. Times are in seconds; `NO_COLLISION`
//! (+∞) means the pair never meets on the current trajectories.
//!
//! Rotating shapes (flipper ends and edges) are handled in the frame moving
//! with the contact point of the shape. That treats the local surface
//! velocity as constant over the sub-step, which holds while the angular
//! speed is small relative to the remaining frame length.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Time-to-impact for a pair that never collides
pub const NO_COLLISION: f64 = f64::INFINITY;

/// A static circle. Radius zero is a point (used for corners).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: DVec2,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: DVec2, radius: f64) -> Self {
        Self { center, radius }
    }

    /// A zero-radius circle
    pub fn point(center: DVec2) -> Self {
        Self {
            center,
            radius: 0.0,
        }
    }
}

/// A finite line segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: DVec2,
    pub end: DVec2,
}

impl Segment {
    pub fn new(start: DVec2, end: DVec2) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).length()
    }

    /// Point on the segment nearest to `p`
    pub fn closest_point(&self, p: DVec2) -> DVec2 {
        let d = self.end - self.start;
        let len_sq = d.length_squared();
        if len_sq == 0.0 {
            return self.start;
        }
        let u = ((p - self.start).dot(d) / len_sq).clamp(0.0, 1.0);
        self.start + d * u
    }
}

/// Earliest time at which two circles touch.
///
/// `rel_pos` and `rel_vel` are the moving circle's position and velocity
/// relative to the other one; `reach` is the sum of the radii. Already
/// overlapping circles that are still closing collide immediately.
pub fn circles_meet(rel_pos: DVec2, rel_vel: DVec2, reach: f64) -> f64 {
    let a = rel_vel.length_squared();
    if a == 0.0 {
        return NO_COLLISION;
    }
    let b = rel_pos.dot(rel_vel);
    if b >= 0.0 {
        // separating or sliding past
        return NO_COLLISION;
    }
    let c = rel_pos.length_squared() - reach * reach;
    if c <= 0.0 {
        return 0.0;
    }
    let disc = b * b - a * c;
    if disc < 0.0 {
        return NO_COLLISION;
    }
    (-b - disc.sqrt()) / a
}

/// Time until a ball touches a static circle
pub fn time_until_circle_collision(
    circle: &Circle,
    ball_pos: DVec2,
    ball_radius: f64,
    ball_vel: DVec2,
) -> f64 {
    circles_meet(ball_pos - circle.center, ball_vel, ball_radius + circle.radius)
}

/// Time until a ball touches a static segment, endpoints included
pub fn time_until_segment_collision(
    segment: &Segment,
    ball_pos: DVec2,
    ball_radius: f64,
    ball_vel: DVec2,
) -> f64 {
    let endpoints = time_until_circle_collision(
        &Circle::point(segment.start),
        ball_pos,
        ball_radius,
        ball_vel,
    )
    .min(time_until_circle_collision(
        &Circle::point(segment.end),
        ball_pos,
        ball_radius,
        ball_vel,
    ));

    let d = segment.end - segment.start;
    let len_sq = d.length_squared();
    if len_sq == 0.0 {
        return endpoints;
    }

    let normal = d.perp().normalize_or_zero();
    let mut dist = (ball_pos - segment.start).dot(normal);
    let mut closing = ball_vel.dot(normal);
    if dist < 0.0 {
        dist = -dist;
        closing = -closing;
    }
    if closing >= 0.0 {
        return endpoints;
    }

    let t = ((dist - ball_radius) / -closing).max(0.0);
    let contact = ball_pos + ball_vel * t;
    let u = (contact - segment.start).dot(d) / len_sq;
    if (0.0..=1.0).contains(&u) {
        t.min(endpoints)
    } else {
        endpoints
    }
}

/// Time until two balls touch
pub fn time_until_ball_collision(
    pos1: DVec2,
    radius1: f64,
    vel1: DVec2,
    pos2: DVec2,
    radius2: f64,
    vel2: DVec2,
) -> f64 {
    circles_meet(pos1 - pos2, vel1 - vel2, radius1 + radius2)
}

/// Velocity of `point` on a body spinning about `pivot` at `omega` rad/s
#[inline]
pub fn rotational_velocity(point: DVec2, pivot: DVec2, omega: f64) -> DVec2 {
    (point - pivot).perp() * omega
}

/// Time until a ball touches a circle carried by a rotating body
pub fn time_until_rotating_circle_collision(
    circle: &Circle,
    pivot: DVec2,
    omega: f64,
    ball_pos: DVec2,
    ball_radius: f64,
    ball_vel: DVec2,
) -> f64 {
    let surface = rotational_velocity(circle.center, pivot, omega);
    time_until_circle_collision(circle, ball_pos, ball_radius, ball_vel - surface)
}

/// Time until a ball touches a segment carried by a rotating body
pub fn time_until_rotating_segment_collision(
    segment: &Segment,
    pivot: DVec2,
    omega: f64,
    ball_pos: DVec2,
    ball_radius: f64,
    ball_vel: DVec2,
) -> f64 {
    let surface = rotational_velocity(segment.closest_point(ball_pos), pivot, omega);
    time_until_segment_collision(segment, ball_pos, ball_radius, ball_vel - surface)
}

/// Reflect `vel` about the plane with unit `normal`.
///
/// The normal component is reversed and scaled by `restitution`; the
/// tangential component is kept as is. A zero normal leaves `vel` unchanged.
#[inline]
pub fn reflect_with_normal(vel: DVec2, normal: DVec2, restitution: f64) -> DVec2 {
    let along = vel.dot(normal);
    vel - normal * (along * (1.0 + restitution))
}

/// Ball velocity after bouncing off a static circle
pub fn reflect_circle(circle: &Circle, ball_pos: DVec2, ball_vel: DVec2, restitution: f64) -> DVec2 {
    let normal = (ball_pos - circle.center).normalize_or_zero();
    reflect_with_normal(ball_vel, normal, restitution)
}

/// Ball velocity after bouncing off a static segment (or one of its ends)
pub fn reflect_segment(
    segment: &Segment,
    ball_pos: DVec2,
    ball_vel: DVec2,
    restitution: f64,
) -> DVec2 {
    let normal = (ball_pos - segment.closest_point(ball_pos)).normalize_or_zero();
    reflect_with_normal(ball_vel, normal, restitution)
}

/// Ball velocity after bouncing off a circle on a rotating body
pub fn reflect_rotating_circle(
    circle: &Circle,
    pivot: DVec2,
    omega: f64,
    ball_pos: DVec2,
    ball_vel: DVec2,
    restitution: f64,
) -> DVec2 {
    let normal = (ball_pos - circle.center).normalize_or_zero();
    let contact = circle.center + normal * circle.radius;
    let surface = rotational_velocity(contact, pivot, omega);
    reflect_with_normal(ball_vel - surface, normal, restitution) + surface
}

/// Ball velocity after bouncing off a segment on a rotating body
pub fn reflect_rotating_segment(
    segment: &Segment,
    pivot: DVec2,
    omega: f64,
    ball_pos: DVec2,
    ball_vel: DVec2,
    restitution: f64,
) -> DVec2 {
    let contact = segment.closest_point(ball_pos);
    let normal = (ball_pos - contact).normalize_or_zero();
    let surface = rotational_velocity(contact, pivot, omega);
    reflect_with_normal(ball_vel - surface, normal, restitution) + surface
}

/// Velocities of two balls after an elastic collision.
///
/// Only the components along the line of centres change; momentum
/// `m1·v1 + m2·v2` is conserved.
pub fn reflect_balls(
    pos1: DVec2,
    mass1: f64,
    vel1: DVec2,
    pos2: DVec2,
    mass2: f64,
    vel2: DVec2,
) -> (DVec2, DVec2) {
    let normal = (pos1 - pos2).normalize_or_zero();
    let u1 = vel1.dot(normal);
    let u2 = vel2.dot(normal);
    let total = mass1 + mass2;
    let w1 = (u1 * (mass1 - mass2) + 2.0 * mass2 * u2) / total;
    let w2 = (u2 * (mass2 - mass1) + 2.0 * mass1 * u1) / total;
    (vel1 + normal * (w1 - u1), vel2 + normal * (w2 - u2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_circle_head_on() {
        let bumper = Circle::new(DVec2::new(6.5, 0.5), 0.5);
        let t = time_until_circle_collision(&bumper, DVec2::new(0.5, 0.5), 0.25, DVec2::new(50.0, 0.0));
        // gap of 6.0 minus 0.75 combined radius
        assert!((t - 5.25 / 50.0).abs() < EPS);
    }

    #[test]
    fn test_circle_miss_and_separating() {
        let bumper = Circle::new(DVec2::new(6.5, 0.5), 0.5);
        let away = time_until_circle_collision(&bumper, DVec2::new(0.5, 0.5), 0.25, DVec2::new(-50.0, 0.0));
        assert_eq!(away, NO_COLLISION);

        let wide = time_until_circle_collision(&bumper, DVec2::new(0.5, 5.5), 0.25, DVec2::new(50.0, 0.0));
        assert_eq!(wide, NO_COLLISION);

        let still = time_until_circle_collision(&bumper, DVec2::new(0.5, 0.5), 0.25, DVec2::ZERO);
        assert_eq!(still, NO_COLLISION);
    }

    #[test]
    fn test_segment_interior_hit() {
        let wall = Segment::new(DVec2::new(6.0, 0.0), DVec2::new(6.0, 1.0));
        let t = time_until_segment_collision(&wall, DVec2::new(0.5, 0.5), 0.25, DVec2::new(50.0, 0.0));
        assert!((t - 0.105).abs() < EPS);
    }

    #[test]
    fn test_segment_endpoint_hit() {
        let wall = Segment::new(DVec2::new(6.0, 0.0), DVec2::new(6.0, 1.0));
        // passes just below the lower end, only the corner point is reachable
        let t = time_until_segment_collision(&wall, DVec2::new(0.0, 1.1), 0.25, DVec2::new(10.0, 0.0));
        let expected = (6.0 - (0.25f64 * 0.25 - 0.1 * 0.1).sqrt()) / 10.0;
        assert!((t - expected).abs() < EPS);
    }

    #[test]
    fn test_segment_parallel_no_collision() {
        let wall = Segment::new(DVec2::new(0.0, 0.0), DVec2::new(20.0, 0.0));
        let t = time_until_segment_collision(&wall, DVec2::new(5.0, 1.0), 0.25, DVec2::new(10.0, 0.0));
        assert_eq!(t, NO_COLLISION);
    }

    #[test]
    fn test_perpendicular_reflection_negates() {
        let wall = Segment::new(DVec2::new(6.0, 0.0), DVec2::new(6.0, 1.0));
        let v = reflect_segment(&wall, DVec2::new(5.75, 0.5), DVec2::new(50.0, 0.0), 1.0);
        assert_eq!(v, DVec2::new(-50.0, 0.0));

        let bumper = Circle::new(DVec2::new(6.5, 0.5), 0.5);
        let v = reflect_circle(&bumper, DVec2::new(5.75, 0.5), DVec2::new(50.0, 0.0), 1.0);
        assert_eq!(v, DVec2::new(-50.0, 0.0));
    }

    #[test]
    fn test_oblique_reflection_keeps_tangent() {
        let floor = Segment::new(DVec2::new(0.0, 10.0), DVec2::new(20.0, 10.0));
        let v = reflect_segment(&floor, DVec2::new(5.0, 9.75), DVec2::new(3.0, 4.0), 1.0);
        assert!((v - DVec2::new(3.0, -4.0)).length() < EPS);
    }

    #[test]
    fn test_degenerate_normal_is_harmless() {
        let point = Circle::point(DVec2::new(1.0, 1.0));
        let v = reflect_circle(&point, DVec2::new(1.0, 1.0), DVec2::new(2.0, 3.0), 1.0);
        assert_eq!(v, DVec2::new(2.0, 3.0));
        assert!(v.is_finite());
    }

    #[test]
    fn test_equal_mass_head_on_exchange() {
        let (a, b) = reflect_balls(
            DVec2::new(5.0, 5.0),
            1.0,
            DVec2::new(10.0, 0.0),
            DVec2::new(5.5, 5.0),
            1.0,
            DVec2::new(-5.0, 0.0),
        );
        assert_eq!(a, DVec2::new(-5.0, 0.0));
        assert_eq!(b, DVec2::new(10.0, 0.0));
    }

    #[test]
    fn test_rotating_reduces_to_static_at_rest() {
        let seg = Segment::new(DVec2::new(2.0, 2.0), DVec2::new(2.0, 4.0));
        let pivot = DVec2::new(2.0, 2.0);
        let pos = DVec2::new(1.0, 3.0);
        let vel = DVec2::new(4.0, 1.0);
        assert_eq!(
            time_until_rotating_segment_collision(&seg, pivot, 0.0, pos, 0.25, vel),
            time_until_segment_collision(&seg, pos, 0.25, vel)
        );
        let moving = reflect_rotating_segment(&seg, pivot, 0.0, DVec2::new(1.75, 3.0), vel, 0.95);
        let still = reflect_segment(&seg, DVec2::new(1.75, 3.0), vel, 0.95);
        assert!((moving - still).length() < EPS);
        assert!((still - DVec2::new(-3.8, 1.0)).length() < EPS);
    }

    #[test]
    fn test_rotating_segment_adds_surface_speed() {
        // rod along +x from the pivot swinging toward a ball resting above it
        let seg = Segment::new(DVec2::new(0.0, 0.0), DVec2::new(2.0, 0.0));
        let pivot = DVec2::ZERO;
        let omega = 1.0;
        let ball = DVec2::new(1.0, 0.25);
        let v = reflect_rotating_segment(&seg, pivot, omega, ball, DVec2::ZERO, 1.0);
        // contact point moves at (0, 1); elastic bounce sends the ball at twice that
        assert!((v - DVec2::new(0.0, 2.0)).length() < EPS);
    }

    proptest! {
        #[test]
        fn test_ball_collision_conserves_momentum(
            m1 in 0.5f64..5.0,
            m2 in 0.5f64..5.0,
            vx1 in -50.0f64..50.0,
            vy1 in -50.0f64..50.0,
            vx2 in -50.0f64..50.0,
            vy2 in -50.0f64..50.0,
            angle in 0.0f64..std::f64::consts::TAU,
        ) {
            let p1 = DVec2::new(10.0, 10.0);
            let p2 = p1 + DVec2::from_angle(angle) * 0.5;
            let v1 = DVec2::new(vx1, vy1);
            let v2 = DVec2::new(vx2, vy2);
            let (w1, w2) = reflect_balls(p1, m1, v1, p2, m2, v2);
            let before = v1 * m1 + v2 * m2;
            let after = w1 * m1 + w2 * m2;
            prop_assert!((before - after).length() < 1e-6);
        }

        #[test]
        fn test_reflection_preserves_speed(
            vx in -100.0f64..100.0,
            vy in -100.0f64..100.0,
            angle in 0.0f64..std::f64::consts::TAU,
        ) {
            let v = DVec2::new(vx, vy);
            let n = DVec2::from_angle(angle);
            let w = reflect_with_normal(v, n, 1.0);
            prop_assert!((w.length() - v.length()).abs() < 1e-9);
            prop_assert!((w.dot(n) + v.dot(n)).abs() < 1e-9);
        }
    }
}
