//! Gadgets: the fixed and moving obstacles on a board
//!
//! The set of kinds is closed, so a gadget is a plain struct with shared
//! bookkeeping (name, footprint, trigger timer) around a [`GadgetBody`] enum.
//! [`GadgetKind`] is the discriminator and carries the per-kind capability
//! table.

pub mod absorber;
pub mod bumper;
pub mod flipper;
pub mod portal;

use std::fmt;
use std::str::FromStr;

use crossbeam_channel::Sender;
use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};

pub use absorber::Absorber;
pub use bumper::{CircleBumper, Outline, SquareBumper, TriangleBumper};
pub use flipper::{Chirality, Flipper, FlipperState};
pub use portal::Portal;

use super::ball::Ball;
use crate::consts::TRIGGER_TIMER_IDLE;
use crate::error::{BoardError, BoardResult};
use crate::transport::{Envelope, is_valid_name};

/// Arena-scoped gadget identifier (index in insertion order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GadgetId(pub usize);

/// Quarter-turn orientation, clockwise on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Orientation {
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees {
            0 => Some(Orientation::Deg0),
            90 => Some(Orientation::Deg90),
            180 => Some(Orientation::Deg180),
            270 => Some(Orientation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(&self) -> i32 {
        self.quarter_turns() as i32 * 90
    }

    pub fn quarter_turns(&self) -> u8 {
        match self {
            Orientation::Deg0 => 0,
            Orientation::Deg90 => 1,
            Orientation::Deg180 => 2,
            Orientation::Deg270 => 3,
        }
    }

    /// Unit vector a flipper's geometry is built from
    pub fn vector(&self) -> DVec2 {
        match self {
            Orientation::Deg0 => DVec2::new(0.0, 1.0),
            Orientation::Deg90 => DVec2::new(-1.0, 0.0),
            Orientation::Deg180 => DVec2::new(0.0, -1.0),
            Orientation::Deg270 => DVec2::new(1.0, 0.0),
        }
    }
}

/// What a gadget kind can do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Geometry changes over time
    pub moves: bool,
    /// Has a trigger action beyond cosmetic glow
    pub has_action: bool,
    /// Holds balls in stasis
    pub captures: bool,
    /// Sends balls elsewhere
    pub transports: bool,
}

/// Gadget kind discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GadgetKind {
    CircleBumper,
    SquareBumper,
    TriangleBumper,
    Absorber,
    LeftFlipper,
    RightFlipper,
    Portal,
}

impl GadgetKind {
    pub const ALL: [GadgetKind; 7] = [
        GadgetKind::CircleBumper,
        GadgetKind::SquareBumper,
        GadgetKind::TriangleBumper,
        GadgetKind::Absorber,
        GadgetKind::LeftFlipper,
        GadgetKind::RightFlipper,
        GadgetKind::Portal,
    ];

    /// Tag used in board descriptions
    pub fn tag(&self) -> &'static str {
        match self {
            GadgetKind::CircleBumper => "circleBumper",
            GadgetKind::SquareBumper => "squareBumper",
            GadgetKind::TriangleBumper => "triangleBumper",
            GadgetKind::Absorber => "absorber",
            GadgetKind::LeftFlipper => "leftFlipper",
            GadgetKind::RightFlipper => "rightFlipper",
            GadgetKind::Portal => "portal",
        }
    }

    pub const fn capabilities(&self) -> Capabilities {
        match self {
            GadgetKind::CircleBumper | GadgetKind::SquareBumper | GadgetKind::TriangleBumper => {
                Capabilities {
                    moves: false,
                    has_action: false,
                    captures: false,
                    transports: false,
                }
            }
            GadgetKind::Absorber => Capabilities {
                moves: false,
                has_action: true,
                captures: true,
                transports: false,
            },
            GadgetKind::LeftFlipper | GadgetKind::RightFlipper => Capabilities {
                moves: true,
                has_action: true,
                captures: false,
                transports: false,
            },
            GadgetKind::Portal => Capabilities {
                moves: false,
                has_action: false,
                captures: false,
                transports: true,
            },
        }
    }

    /// Fixed footprint in grid cells; `None` for kinds sized by the description
    pub fn footprint(&self) -> Option<(i32, i32)> {
        match self {
            GadgetKind::Absorber => None,
            GadgetKind::LeftFlipper | GadgetKind::RightFlipper => Some((2, 2)),
            _ => Some((1, 1)),
        }
    }
}

impl fmt::Display for GadgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for GadgetKind {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GadgetKind::ALL
            .into_iter()
            .find(|kind| kind.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| BoardError::UnknownGadgetKind(s.to_string()))
    }
}

/// Per-kind state and geometry
#[derive(Debug, Clone, PartialEq)]
pub enum GadgetBody {
    Circle(CircleBumper),
    Square(SquareBumper),
    Triangle(TriangleBumper),
    Absorber(Absorber),
    Flipper(Flipper),
    Portal(Portal),
}

/// A named gadget on the grid
#[derive(Debug, Clone, PartialEq)]
pub struct Gadget {
    name: String,
    origin: IVec2,
    width: i32,
    height: i32,
    trigger_timer: f64,
    body: GadgetBody,
}

impl Gadget {
    fn with_body(name: &str, origin: IVec2, width: i32, height: i32, body: GadgetBody) -> BoardResult<Self> {
        if !is_valid_name(name) {
            return Err(BoardError::InvalidName(name.to_string()));
        }
        if width <= 0 || height <= 0 {
            return Err(BoardError::InvalidDimension {
                gadget: name.to_string(),
                width,
                height,
            });
        }
        Ok(Self {
            name: name.to_string(),
            origin,
            width,
            height,
            trigger_timer: TRIGGER_TIMER_IDLE,
            body,
        })
    }

    pub fn circle_bumper(name: &str, origin: IVec2) -> BoardResult<Self> {
        let body = GadgetBody::Circle(CircleBumper::new(origin.as_dvec2()));
        Self::with_body(name, origin, 1, 1, body)
    }

    pub fn square_bumper(name: &str, origin: IVec2) -> BoardResult<Self> {
        let body = GadgetBody::Square(SquareBumper::new(origin.as_dvec2()));
        Self::with_body(name, origin, 1, 1, body)
    }

    pub fn triangle_bumper(name: &str, origin: IVec2, orientation: Orientation) -> BoardResult<Self> {
        let body = GadgetBody::Triangle(TriangleBumper::new(origin.as_dvec2(), orientation));
        Self::with_body(name, origin, 1, 1, body)
    }

    pub fn absorber(name: &str, origin: IVec2, width: i32, height: i32, latency: f64) -> BoardResult<Self> {
        let body = GadgetBody::Absorber(Absorber::new(
            origin.as_dvec2(),
            width as f64,
            height as f64,
            latency,
        ));
        Self::with_body(name, origin, width, height, body)
    }

    pub fn flipper(
        name: &str,
        origin: IVec2,
        chirality: Chirality,
        orientation: Orientation,
    ) -> BoardResult<Self> {
        let body = GadgetBody::Flipper(Flipper::new(origin.as_dvec2(), chirality, orientation));
        Self::with_body(name, origin, 2, 2, body)
    }

    pub fn portal(
        name: &str,
        origin: IVec2,
        target_board: Option<&str>,
        target_portal: &str,
    ) -> BoardResult<Self> {
        for target in target_board.into_iter().chain([target_portal]) {
            if !is_valid_name(target) {
                return Err(BoardError::InvalidParameter {
                    gadget: name.to_string(),
                    reason: format!("bad portal target {target:?}"),
                });
            }
        }
        let body = GadgetBody::Portal(Portal::new(
            origin.as_dvec2(),
            target_board.map(str::to_string),
            target_portal.to_string(),
        ));
        Self::with_body(name, origin, 1, 1, body)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> IVec2 {
        self.origin
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn body(&self) -> &GadgetBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut GadgetBody {
        &mut self.body
    }

    pub fn kind(&self) -> GadgetKind {
        match &self.body {
            GadgetBody::Circle(_) => GadgetKind::CircleBumper,
            GadgetBody::Square(_) => GadgetKind::SquareBumper,
            GadgetBody::Triangle(_) => GadgetKind::TriangleBumper,
            GadgetBody::Absorber(_) => GadgetKind::Absorber,
            GadgetBody::Flipper(f) => match f.chirality() {
                Chirality::Left => GadgetKind::LeftFlipper,
                Chirality::Right => GadgetKind::RightFlipper,
            },
            GadgetBody::Portal(_) => GadgetKind::Portal,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.kind().capabilities()
    }

    pub fn as_portal(&self) -> Option<&Portal> {
        match &self.body {
            GadgetBody::Portal(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_portal_mut(&mut self) -> Option<&mut Portal> {
        match &mut self.body {
            GadgetBody::Portal(p) => Some(p),
            _ => None,
        }
    }

    /// Seconds since this gadget last fired
    pub fn trigger_timer(&self) -> f64 {
        self.trigger_timer
    }

    /// Cosmetic brightness in (0, 1], highest right after firing
    pub fn glow(&self) -> f64 {
        1.0 / (1.0 + 2.0 * self.trigger_timer)
    }

    /// True if grid cell (x, y) lies inside the footprint
    pub fn occupies(&self, x: i32, y: i32) -> bool {
        x >= self.origin.x
            && x < self.origin.x + self.width
            && y >= self.origin.y
            && y < self.origin.y + self.height
    }

    /// Advance independent motion and timers by `dt` seconds
    pub fn displace(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        self.trigger_timer += dt;
        match &mut self.body {
            GadgetBody::Flipper(f) => f.displace(dt),
            GadgetBody::Absorber(a) => a.displace(dt),
            _ => {}
        }
    }

    pub fn time_until_collision(&self, ball: &Ball) -> f64 {
        match &self.body {
            GadgetBody::Circle(g) => g.time_until_collision(ball),
            GadgetBody::Square(g) => g.time_until_collision(ball),
            GadgetBody::Triangle(g) => g.time_until_collision(ball),
            GadgetBody::Absorber(g) => g.time_until_collision(ball),
            GadgetBody::Flipper(g) => g.time_until_collision(ball),
            GadgetBody::Portal(g) => g.time_until_collision(ball),
        }
    }

    /// Resolve a touching ball. Returns true when the collision fires this
    /// gadget's trigger edges.
    pub fn collide(&mut self, ball: &mut Ball, transport: &Sender<Envelope>) -> bool {
        match &mut self.body {
            GadgetBody::Circle(g) => g.collide(ball),
            GadgetBody::Square(g) => g.collide(ball),
            GadgetBody::Triangle(g) => g.collide(ball),
            GadgetBody::Absorber(g) => g.collide(ball),
            GadgetBody::Flipper(g) => g.collide(ball),
            GadgetBody::Portal(g) => {
                let sent = g.collide(ball, transport);
                if sent {
                    log::debug!("portal {} took ball {:?}", self.name, ball.id());
                }
                return sent;
            }
        }
        true
    }

    /// Run this gadget's own action (absorber release, flipper swing)
    pub fn trigger_action(&mut self, balls: &mut [Ball]) {
        match &mut self.body {
            GadgetBody::Absorber(a) => {
                a.release(balls);
            }
            GadgetBody::Flipper(f) => f.flip(),
            _ => {}
        }
    }

    /// Note that this gadget just fired
    pub fn mark_triggered(&mut self) {
        self.trigger_timer = 0.0;
    }

    /// Back to the state right after construction; portals keep their
    /// open/closed state, which follows board links
    pub fn reset(&mut self) {
        self.trigger_timer = TRIGGER_TIMER_IDLE;
        match &mut self.body {
            GadgetBody::Absorber(a) => a.reset(),
            GadgetBody::Flipper(f) => f.reset(),
            _ => {}
        }
    }

    /// Character used when drawing the board as text
    pub fn glyph(&self) -> char {
        match &self.body {
            GadgetBody::Circle(_) => 'O',
            GadgetBody::Square(_) => '#',
            GadgetBody::Triangle(t) => match t.orientation() {
                Orientation::Deg0 | Orientation::Deg180 => '/',
                Orientation::Deg90 | Orientation::Deg270 => '\\',
            },
            GadgetBody::Absorber(_) => '=',
            GadgetBody::Flipper(f) => {
                let tip = f.pose().ends[1].center - f.pivot();
                if tip.x.abs() > tip.y.abs() { '-' } else { '|' }
            }
            GadgetBody::Portal(_) => 'o',
        }
    }
}

impl fmt::Display for Gadget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} at ({}, {})",
            self.kind(),
            self.name,
            self.origin.x,
            self.origin.y
        )?;
        match &self.body {
            GadgetBody::Absorber(_) => write!(f, " {}x{}", self.width, self.height),
            GadgetBody::Triangle(t) => write!(f, " orientation {}", t.orientation().degrees()),
            GadgetBody::Flipper(fl) => write!(f, " orientation {}", fl.orientation().degrees()),
            GadgetBody::Portal(p) => match p.target_board() {
                Some(board) => write!(f, " --> {board}.{}", p.target_portal()),
                None => write!(f, " --> {}", p.target_portal()),
            },
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_kind_tags_round_trip_and_reject_unknown() {
        for kind in GadgetKind::ALL {
            assert_eq!(kind.tag().parse::<GadgetKind>().unwrap(), kind);
        }
        assert!(matches!(
            "spinner".parse::<GadgetKind>(),
            Err(BoardError::UnknownGadgetKind(_))
        ));
    }

    #[test]
    fn test_capability_table() {
        assert!(GadgetKind::LeftFlipper.capabilities().moves);
        assert!(GadgetKind::Absorber.capabilities().captures);
        assert!(GadgetKind::Portal.capabilities().transports);
        assert!(!GadgetKind::CircleBumper.capabilities().has_action);
    }

    #[test]
    fn test_orientation_degrees() {
        assert_eq!(Orientation::from_degrees(270), Some(Orientation::Deg270));
        assert_eq!(Orientation::from_degrees(45), None);
        assert_eq!(Orientation::Deg180.degrees(), 180);
    }

    #[test]
    fn test_construction_validation() {
        assert!(matches!(
            Gadget::absorber("abs", IVec2::new(0, 0), 0, 2, 0.0),
            Err(BoardError::InvalidDimension { .. })
        ));
        assert!(matches!(
            Gadget::circle_bumper("9lives", IVec2::ZERO),
            Err(BoardError::InvalidName(_))
        ));
        assert!(matches!(
            Gadget::portal("p", IVec2::ZERO, Some("bad-board"), "q"),
            Err(BoardError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_occupies_footprint() {
        let abs = Gadget::absorber("abs", IVec2::new(5, 5), 4, 3, 0.0).unwrap();
        assert!(abs.occupies(5, 5));
        assert!(abs.occupies(8, 7));
        assert!(!abs.occupies(9, 7));
        assert!(!abs.occupies(8, 8));
    }

    #[test]
    fn test_closed_portal_does_not_fire() {
        let (tx, _rx) = bounded(4);
        let mut portal = Gadget::portal("p", IVec2::new(3, 3), None, "q").unwrap();
        let mut ball = Ball::new(DVec2::new(3.5, 3.0), DVec2::new(0.0, 1.0));
        assert!(!portal.collide(&mut ball, &tx));

        let mut bumper = Gadget::circle_bumper("c", IVec2::new(3, 3)).unwrap();
        assert!(bumper.collide(&mut ball, &tx));
    }

    #[test]
    fn test_full_transport_portal_bounces_without_firing() {
        let (tx, rx) = bounded(1);
        tx.try_send(Envelope::to_board(Ball::new(DVec2::ZERO, DVec2::ZERO), "beta"))
            .unwrap();

        let mut portal = Gadget::portal("p", IVec2::new(3, 3), None, "q").unwrap();
        portal.as_portal_mut().unwrap().open();
        let mut ball = Ball::new(DVec2::new(3.5, 3.0), DVec2::new(0.0, 1.0));
        assert!(!portal.collide(&mut ball, &tx));
        assert!(ball.vel().y < 0.0);
        assert_eq!(rx.len(), 1);

        rx.try_recv().unwrap();
        let mut ball = Ball::new(DVec2::new(3.5, 3.0), DVec2::new(0.0, 1.0));
        assert!(portal.collide(&mut ball, &tx));
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_trigger_timer_and_glow() {
        let mut bumper = Gadget::square_bumper("sq", IVec2::new(1, 1)).unwrap();
        assert_eq!(bumper.trigger_timer(), TRIGGER_TIMER_IDLE);
        bumper.mark_triggered();
        assert_eq!(bumper.glow(), 1.0);
        bumper.displace(0.5);
        assert!((bumper.glow() - 0.5).abs() < 1e-12);
        bumper.reset();
        assert_eq!(bumper.trigger_timer(), TRIGGER_TIMER_IDLE);
    }

    #[test]
    fn test_flipper_action_and_glyph() {
        let mut flipper =
            Gadget::flipper("f", IVec2::new(4, 10), Chirality::Left, Orientation::Deg0).unwrap();
        assert_eq!(flipper.kind(), GadgetKind::LeftFlipper);
        assert_eq!(flipper.glyph(), '|');
        flipper.trigger_action(&mut []);
        flipper.displace(flipper::FLIP_TIME);
        assert_eq!(flipper.glyph(), '-');
    }
}
