//! Structured board description
//!
//! What a board-file parser hands over: names, physics, balls, gadgets,
//! trigger wiring and key bindings. Deserializes from JSON so a driver can
//! keep boards on disk without a dedicated parser.

use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{BoardError, BoardResult};
use crate::sim::gadget::{Chirality, Gadget, GadgetKind, Orientation};
use crate::sim::stepper::Physics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardDescription {
    pub name: String,
    #[serde(default)]
    pub physics: Physics,
    #[serde(default)]
    pub balls: Vec<BallSpec>,
    #[serde(default)]
    pub gadgets: Vec<GadgetSpec>,
    #[serde(default)]
    pub links: Vec<TriggerLinkSpec>,
    #[serde(default)]
    pub key_bindings: Vec<KeyBindingSpec>,
    /// Seed for cosmetic ball colours
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallSpec {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub vx: f64,
    #[serde(default)]
    pub vy: f64,
}

impl BallSpec {
    pub fn pos(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    pub fn vel(&self) -> DVec2 {
        DVec2::new(self.vx, self.vy)
    }
}

/// One gadget line. Which optional fields matter depends on `kind`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GadgetSpec {
    pub kind: String,
    pub name: String,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
    /// Degrees clockwise: 0, 90, 180 or 270
    #[serde(default)]
    pub orientation: Option<i32>,
    #[serde(default)]
    pub other_board: Option<String>,
    #[serde(default)]
    pub other_portal: Option<String>,
}

/// Hitting `source` runs `target`'s action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerLinkSpec {
    pub source: String,
    pub target: String,
}

/// `key` is written `keydown:<key>` or `keyup:<key>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindingSpec {
    pub key: String,
    pub gadget: String,
}

impl BoardDescription {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            physics: Physics::default(),
            balls: Vec::new(),
            gadgets: Vec::new(),
            links: Vec::new(),
            key_bindings: Vec::new(),
            seed: None,
        }
    }

    pub fn from_json(json: &str) -> BoardResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> BoardResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl GadgetSpec {
    /// Build the gadget, checking kind-specific parameters and that the
    /// footprint lies on a `config.board_size` board
    pub fn build(&self, config: &EngineConfig) -> BoardResult<Gadget> {
        let kind: GadgetKind = self.kind.parse()?;
        let origin = IVec2::new(self.x, self.y);

        let gadget = match kind {
            GadgetKind::CircleBumper => Gadget::circle_bumper(&self.name, origin)?,
            GadgetKind::SquareBumper => Gadget::square_bumper(&self.name, origin)?,
            GadgetKind::TriangleBumper => {
                Gadget::triangle_bumper(&self.name, origin, self.orientation()?)?
            }
            GadgetKind::LeftFlipper => {
                Gadget::flipper(&self.name, origin, Chirality::Left, self.orientation()?)?
            }
            GadgetKind::RightFlipper => {
                Gadget::flipper(&self.name, origin, Chirality::Right, self.orientation()?)?
            }
            GadgetKind::Absorber => {
                let (Some(width), Some(height)) = (self.width, self.height) else {
                    return Err(self.invalid("absorber needs width and height"));
                };
                Gadget::absorber(&self.name, origin, width, height, config.absorber_latency)?
            }
            GadgetKind::Portal => {
                // orientation is accepted for portals but has no geometric effect
                self.orientation()?;
                let Some(target) = self.other_portal.as_deref() else {
                    return Err(self.invalid("portal needs other_portal"));
                };
                Gadget::portal(&self.name, origin, self.other_board.as_deref(), target)?
            }
        };

        let size = config.board_size;
        let inside = origin.x >= 0
            && origin.y >= 0
            && origin.x + gadget.width() <= size
            && origin.y + gadget.height() <= size;
        if !inside {
            return Err(self.invalid(&format!(
                "{}x{} footprint at ({}, {}) leaves the {size}x{size} board",
                gadget.width(),
                gadget.height(),
                origin.x,
                origin.y
            )));
        }
        Ok(gadget)
    }

    fn orientation(&self) -> BoardResult<Orientation> {
        let degrees = self.orientation.unwrap_or(0);
        Orientation::from_degrees(degrees)
            .ok_or_else(|| self.invalid(&format!("orientation {degrees} is not 0, 90, 180 or 270")))
    }

    fn invalid(&self, reason: &str) -> BoardError {
        BoardError::InvalidParameter {
            gadget: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}
