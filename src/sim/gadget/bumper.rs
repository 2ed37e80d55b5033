//! Stateless bumpers and the polygon outline they share with absorbers

use glam::DVec2;

use crate::sim::ball::Ball;
use crate::sim::geometry::{self, Circle, NO_COLLISION, Segment};

use super::Orientation;

/// Bumpers bounce balls back with no energy loss
pub const BUMPER_RESTITUTION: f64 = 1.0;

/// Closed polygon made of sides plus zero-radius corner points
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    sides: Vec<Segment>,
    corners: Vec<Circle>,
}

impl Outline {
    /// Polygon through `points` in order, closed back to the first point
    pub fn polygon(points: &[DVec2]) -> Self {
        let sides = points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(&a, &b)| Segment::new(a, b))
            .collect();
        let corners = points.iter().map(|&p| Circle::point(p)).collect();
        Self { sides, corners }
    }

    /// Axis-aligned rectangle with its top-left corner at `origin`
    pub fn rectangle(origin: DVec2, width: f64, height: f64) -> Self {
        Self::polygon(&[
            origin,
            origin + DVec2::new(width, 0.0),
            origin + DVec2::new(width, height),
            origin + DVec2::new(0.0, height),
        ])
    }

    pub fn sides(&self) -> &[Segment] {
        &self.sides
    }

    pub fn corners(&self) -> &[Circle] {
        &self.corners
    }

    pub fn time_until_collision(&self, ball: &Ball) -> f64 {
        let (pos, r, vel) = (ball.pos(), ball.radius(), ball.vel());
        let sides = self
            .sides
            .iter()
            .map(|s| geometry::time_until_segment_collision(s, pos, r, vel));
        let corners = self
            .corners
            .iter()
            .map(|c| geometry::time_until_circle_collision(c, pos, r, vel));
        sides.chain(corners).fold(NO_COLLISION, f64::min)
    }

    /// Velocity after bouncing off whichever side (or corner) is nearest
    pub fn reflect(&self, ball: &Ball, restitution: f64) -> DVec2 {
        let pos = ball.pos();
        let nearest = self.sides.iter().min_by(|a, b| {
            let da = pos.distance_squared(a.closest_point(pos));
            let db = pos.distance_squared(b.closest_point(pos));
            da.total_cmp(&db)
        });
        match nearest {
            Some(side) => geometry::reflect_segment(side, pos, ball.vel(), restitution),
            None => ball.vel(),
        }
    }
}

/// Round bumper filling one cell
#[derive(Debug, Clone, PartialEq)]
pub struct CircleBumper {
    circle: Circle,
}

impl CircleBumper {
    pub const RADIUS: f64 = 0.5;

    pub fn new(origin: DVec2) -> Self {
        Self {
            circle: Circle::new(origin + DVec2::splat(0.5), Self::RADIUS),
        }
    }

    pub fn circle(&self) -> Circle {
        self.circle
    }

    pub fn time_until_collision(&self, ball: &Ball) -> f64 {
        geometry::time_until_circle_collision(&self.circle, ball.pos(), ball.radius(), ball.vel())
    }

    pub fn collide(&self, ball: &mut Ball) {
        ball.impart(geometry::reflect_circle(
            &self.circle,
            ball.pos(),
            ball.vel(),
            BUMPER_RESTITUTION,
        ));
    }
}

/// Square bumper filling one cell
#[derive(Debug, Clone, PartialEq)]
pub struct SquareBumper {
    outline: Outline,
}

impl SquareBumper {
    pub fn new(origin: DVec2) -> Self {
        Self {
            outline: Outline::rectangle(origin, 1.0, 1.0),
        }
    }

    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    pub fn time_until_collision(&self, ball: &Ball) -> f64 {
        self.outline.time_until_collision(ball)
    }

    pub fn collide(&self, ball: &mut Ball) {
        ball.impart(self.outline.reflect(ball, BUMPER_RESTITUTION));
    }
}

/// Right-triangle bumper filling one cell.
///
/// At orientation 0 the right angle sits at the cell's top-left corner and
/// the hypotenuse runs from bottom-left to top-right. Each quarter turn
/// rotates the shape clockwise about the cell centre.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleBumper {
    outline: Outline,
    orientation: Orientation,
}

impl TriangleBumper {
    pub fn new(origin: DVec2, orientation: Orientation) -> Self {
        let center = origin + DVec2::splat(0.5);
        let turns = orientation.quarter_turns();
        let points: Vec<DVec2> = [
            origin + DVec2::new(1.0, 0.0),
            origin,
            origin + DVec2::new(0.0, 1.0),
        ]
        .iter()
        .map(|&p| crate::rotate_quarter_turns(p, center, turns))
        .collect();
        Self {
            outline: Outline::polygon(&points),
            orientation,
        }
    }

    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn time_until_collision(&self, ball: &Ball) -> f64 {
        self.outline.time_until_collision(ball)
    }

    pub fn collide(&self, ball: &mut Ball) {
        ball.impart(self.outline.reflect(ball, BUMPER_RESTITUTION));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_left_face() {
        let triangle = TriangleBumper::new(DVec2::new(6.0, 0.0), Orientation::Deg0);
        let mut ball = Ball::new(DVec2::new(0.5, 0.5), DVec2::new(50.0, 0.0));

        let t = triangle.time_until_collision(&ball);
        assert!((t - 0.105).abs() < 1e-9);

        ball.displace(t);
        triangle.collide(&mut ball);
        assert!((ball.vel() - DVec2::new(-50.0, 0.0)).length() < 1e-9);
        assert_eq!(triangle.time_until_collision(&ball), NO_COLLISION);
    }

    #[test]
    fn test_triangle_rotation_moves_hypotenuse() {
        // at 180 the right angle sits bottom-right
        let triangle = TriangleBumper::new(DVec2::new(6.0, 0.0), Orientation::Deg180);
        let corners: Vec<DVec2> = triangle.outline().corners().iter().map(|c| c.center).collect();
        assert!(corners.contains(&DVec2::new(7.0, 1.0)));
        assert!(corners.contains(&DVec2::new(6.0, 1.0)));
        assert!(corners.contains(&DVec2::new(7.0, 0.0)));

        let mut ball = Ball::new(DVec2::new(6.5, 3.0), DVec2::new(0.0, -10.0));
        let t = triangle.time_until_collision(&ball);
        assert!((t - 0.175).abs() < 1e-9);
        ball.displace(t);
        triangle.collide(&mut ball);
        assert!((ball.vel() - DVec2::new(0.0, 10.0)).length() < 1e-9);
    }

    #[test]
    fn test_square_corner_bounce() {
        let square = SquareBumper::new(DVec2::new(5.0, 5.0));
        // diagonal approach straight at the top-left corner
        let dir = DVec2::new(1.0, 1.0).normalize();
        let mut ball = Ball::new(DVec2::new(3.0, 3.0), dir * 10.0);
        let t = square.time_until_collision(&ball);
        let expected = (DVec2::splat(2.0).length() - 0.25) / 10.0;
        assert!((t - expected).abs() < 1e-9);

        ball.displace(t);
        square.collide(&mut ball);
        assert!((ball.vel() + dir * 10.0).length() < 1e-9);
    }

    #[test]
    fn test_circle_bumper_glancing() {
        let bumper = CircleBumper::new(DVec2::new(6.0, 0.0));
        let ball = Ball::new(DVec2::new(0.5, 1.2), DVec2::new(50.0, 0.0));
        // offset 0.7 is within reach 0.75
        assert!(bumper.time_until_collision(&ball).is_finite());
        let miss = Ball::new(DVec2::new(0.5, 1.3), DVec2::new(50.0, 0.0));
        assert_eq!(bumper.time_until_collision(&miss), NO_COLLISION);
    }
}
