//! Simulation core
//!
//! Everything that moves or gets hit lives here:
//! - Exact (continuous) collision times, never sampled at fixed ticks
//! - Stable iteration order (balls by insertion, gadgets by id)
//! - No knowledge of rendering, input devices or networking

pub mod ball;
pub mod field;
pub mod gadget;
pub mod geometry;
pub mod playfield;
pub mod stepper;
pub mod trigger;
pub mod wall;

pub use ball::{Ball, BallId};
pub use field::{FieldGrid, GravityField};
pub use gadget::{Gadget, GadgetBody, GadgetId, GadgetKind, Orientation};
pub use geometry::{Circle, NO_COLLISION, Segment};
pub use playfield::{Contact, Playfield};
pub use stepper::{Physics, Simulation, StepReport};
pub use trigger::TriggerGraph;
pub use wall::{Wall, WallSide};
