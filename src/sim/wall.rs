//! Arena boundary walls
//!
//! A wall is solid until it is connected to a neighbouring arena. A connected
//! wall moves its long edge half a unit outward and lets balls through; the
//! short corner segments stay solid so balls cannot slip out at the corners.

use std::fmt;
use std::str::FromStr;

use crossbeam_channel::Sender;
use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::ball::Ball;
use super::geometry::{self, Circle, NO_COLLISION, Segment};
use crate::error::BoardError;
use crate::transport::Envelope;

/// Offset of a connected wall's edge beyond the arena boundary
const PORTAL_OFFSET: f64 = 0.5;

/// Which boundary a wall guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WallSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl WallSide {
    pub const ALL: [WallSide; 4] = [WallSide::Left, WallSide::Right, WallSide::Top, WallSide::Bottom];

    /// Outward unit normal (y grows downward)
    pub fn facing(&self) -> DVec2 {
        match self {
            WallSide::Left => DVec2::new(-1.0, 0.0),
            WallSide::Right => DVec2::new(1.0, 0.0),
            WallSide::Top => DVec2::new(0.0, -1.0),
            WallSide::Bottom => DVec2::new(0.0, 1.0),
        }
    }

    pub fn opposite(&self) -> WallSide {
        match self {
            WallSide::Left => WallSide::Right,
            WallSide::Right => WallSide::Left,
            WallSide::Top => WallSide::Bottom,
            WallSide::Bottom => WallSide::Top,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WallSide::Left => "LEFT",
            WallSide::Right => "RIGHT",
            WallSide::Top => "TOP",
            WallSide::Bottom => "BOTTOM",
        }
    }

    /// Boundary endpoints of a wall on a `size`×`size` arena
    fn endpoints(&self, size: f64) -> (DVec2, DVec2) {
        match self {
            WallSide::Left => (DVec2::new(0.0, 0.0), DVec2::new(0.0, size)),
            WallSide::Right => (DVec2::new(size, size), DVec2::new(size, 0.0)),
            WallSide::Top => (DVec2::new(0.0, 0.0), DVec2::new(size, 0.0)),
            WallSide::Bottom => (DVec2::new(size, size), DVec2::new(0.0, size)),
        }
    }
}

impl fmt::Display for WallSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WallSide {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(WallSide::Left),
            "right" => Ok(WallSide::Right),
            "top" => Ok(WallSide::Top),
            "bottom" => Ok(WallSide::Bottom),
            _ => Err(BoardError::InvalidName(s.to_string())),
        }
    }
}

/// One of the four arena boundaries
#[derive(Debug, Clone, PartialEq)]
pub struct Wall {
    side: WallSide,
    size: f64,
    edge: Segment,
    corners: [Segment; 2],
    corner_points: [Circle; 2],
    link: Option<String>,
}

impl Wall {
    pub fn new(side: WallSide, size: f64) -> Self {
        let (p1, p2) = side.endpoints(size);
        let facing = side.facing();
        Self {
            side,
            size,
            edge: Segment::new(p1, p2),
            corners: [
                Segment::new(p1, p1 + facing),
                Segment::new(p2, p2 + facing),
            ],
            corner_points: [Circle::point(p1), Circle::point(p2)],
            link: None,
        }
    }

    pub fn side(&self) -> WallSide {
        self.side
    }

    pub fn edge(&self) -> Segment {
        self.edge
    }

    pub fn corners(&self) -> &[Segment; 2] {
        &self.corners
    }

    /// Name of the linked arena, if connected
    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    pub fn is_solid(&self) -> bool {
        self.link.is_none()
    }

    /// Turn the wall into a portal to `board`
    pub fn connect(&mut self, board: &str) {
        let (p1, p2) = self.side.endpoints(self.size);
        let offset = self.side.facing() * PORTAL_OFFSET;
        self.edge = Segment::new(p1 + offset, p2 + offset);
        self.link = Some(board.to_string());
    }

    /// Make the wall solid again
    pub fn disconnect(&mut self) {
        let (p1, p2) = self.side.endpoints(self.size);
        self.edge = Segment::new(p1, p2);
        self.link = None;
    }

    pub fn time_until_collision(&self, ball: &Ball) -> f64 {
        let (pos, r, vel) = (ball.pos(), ball.radius(), ball.vel());
        let edge = geometry::time_until_segment_collision(&self.edge, pos, r, vel);
        if self.is_solid() {
            return edge;
        }
        let corners = self
            .corners
            .iter()
            .map(|s| geometry::time_until_segment_collision(s, pos, r, vel))
            .chain(
                self.corner_points
                    .iter()
                    .map(|c| geometry::time_until_circle_collision(c, pos, r, vel)),
            )
            .fold(NO_COLLISION, f64::min);
        edge.min(corners)
    }

    /// Resolve a touching ball.
    ///
    /// Returns true when the ball crossed into the linked arena: it has been
    /// moved into the neighbour's coordinates, put into stasis and posted on
    /// `transport`. A full transport queue makes the wall act solid.
    pub fn collide(&self, ball: &mut Ball, transport: &Sender<Envelope>) -> bool {
        let pos = ball.pos();
        let edge_dist = (pos - self.edge.closest_point(pos)).length();

        if let Some(link) = &self.link {
            let corner = self
                .corners
                .iter()
                .copied()
                .min_by(|a, b| {
                    let da = (pos - a.closest_point(pos)).length();
                    let db = (pos - b.closest_point(pos)).length();
                    da.total_cmp(&db)
                })
                .filter(|s| (pos - s.closest_point(pos)).length() < edge_dist);

            if let Some(corner) = corner {
                ball.impart(geometry::reflect_segment(&corner, pos, ball.vel(), 1.0));
                return false;
            }

            let mut crossing = ball.clone();
            crossing.move_to(pos - self.side.facing() * (self.size + PORTAL_OFFSET));
            crossing.absorb();
            match transport.try_send(Envelope::to_board(crossing.clone(), link)) {
                Ok(()) => {
                    *ball = crossing;
                    return true;
                }
                Err(_) => {
                    log::warn!("Transport queue full, {} wall bounces ball", self.side);
                }
            }
        }

        ball.impart(geometry::reflect_segment(&self.edge, pos, ball.vel(), 1.0));
        false
    }

    /// True if the ball overlaps this wall's edge line or lies beyond it
    pub fn is_clipping(&self, ball: &Ball) -> bool {
        let facing = self.side.facing();
        let offset = (ball.pos() - self.edge.start).dot(facing);
        offset.abs() < ball.radius() || offset >= 0.0
    }
}

impl fmt::Display for Wall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = self.side.as_str().to_ascii_lowercase();
        match &self.link {
            None => write!(f, "{side} wall: solid"),
            Some(link) => write!(f, "{side} wall: portal --> {link}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_solid_wall_reflects() {
        let (tx, rx) = bounded(4);
        let wall = Wall::new(WallSide::Right, 20.0);
        let mut ball = Ball::new(DVec2::new(18.0, 10.0), DVec2::new(10.0, 5.0));
        let t = wall.time_until_collision(&ball);
        assert!((t - 0.175).abs() < 1e-9);

        ball.displace(t);
        assert!(!wall.collide(&mut ball, &tx));
        assert!((ball.vel() - DVec2::new(-10.0, 5.0)).length() < 1e-9);
        assert!(rx.try_recv().is_err());
        assert_eq!(wall.time_until_collision(&ball), NO_COLLISION);
    }

    #[test]
    fn test_connected_wall_passes_ball() {
        let (tx, rx) = bounded(4);
        let mut wall = Wall::new(WallSide::Right, 20.0);
        wall.connect("east");
        assert!(!wall.is_solid());

        let mut ball = Ball::new(DVec2::new(18.0, 10.0), DVec2::new(10.0, 0.0));
        let t = wall.time_until_collision(&ball);
        // edge sits at x = 20.5
        assert!((t - 0.225).abs() < 1e-9);

        ball.displace(t);
        assert!(wall.collide(&mut ball, &tx));
        assert!(ball.in_stasis());
        assert_eq!(ball.carried_vel(), DVec2::new(10.0, 0.0));

        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.board.as_deref(), Some("east"));
        assert!(envelope.gadget.is_none());
        assert!((envelope.ball.pos() - DVec2::new(-0.25, 10.0)).length() < 1e-9);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_full_transport_makes_wall_solid() {
        let (tx, _rx) = bounded(1);
        let mut wall = Wall::new(WallSide::Top, 20.0);
        wall.connect("north");
        tx.try_send(Envelope::to_board(Ball::new(DVec2::ZERO, DVec2::ZERO), "filler"))
            .unwrap();

        let mut ball = Ball::new(DVec2::new(10.0, -0.25), DVec2::new(0.0, -5.0));
        assert!(!wall.collide(&mut ball, &tx));
        assert!(!ball.in_stasis());
        assert!((ball.vel() - DVec2::new(0.0, 5.0)).length() < 1e-9);
    }

    #[test]
    fn test_disconnect_restores_edge() {
        let mut wall = Wall::new(WallSide::Left, 20.0);
        wall.connect("west");
        wall.disconnect();
        assert!(wall.is_solid());
        assert_eq!(wall.edge(), Wall::new(WallSide::Left, 20.0).edge());
    }

    #[test]
    fn test_clipping() {
        let wall = Wall::new(WallSide::Bottom, 20.0);
        assert!(!wall.is_clipping(&Ball::new(DVec2::new(5.0, 19.5), DVec2::ZERO)));
        assert!(wall.is_clipping(&Ball::new(DVec2::new(5.0, 19.9), DVec2::ZERO)));
        assert!(wall.is_clipping(&Ball::new(DVec2::new(5.0, 20.3), DVec2::ZERO)));
    }

    #[test]
    fn test_side_names() {
        assert_eq!("left".parse::<WallSide>().unwrap(), WallSide::Left);
        assert_eq!("BOTTOM".parse::<WallSide>().unwrap(), WallSide::Bottom);
        assert!("middle".parse::<WallSide>().is_err());
        assert_eq!(WallSide::Top.opposite(), WallSide::Bottom);

        let mut wall = Wall::new(WallSide::Left, 20.0);
        assert_eq!(wall.to_string(), "left wall: solid");
        wall.connect("other");
        assert_eq!(wall.to_string(), "left wall: portal --> other");
    }
}
