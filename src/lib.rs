//! Pingball - a continuous-collision pinball arena
//!
//! Core modules:
//! - `sim`: Collision geometry, balls, walls, gadgets, trigger graph, gravity field, stepper
//! - `board`: The arena aggregate that owns everything and drives frames
//! - `transport`: Bounded queues and envelopes exchanged with neighbouring arenas
//! - `snapshot`: Immutable drawable view for renderers
//! - `config`: Data-driven engine tuning

pub mod board;
pub mod config;
pub mod error;
pub mod sim;
pub mod snapshot;
pub mod transport;

pub use board::{Board, BoardDescription, InputEvent, KeyEvent};
pub use config::EngineConfig;
pub use error::{BoardError, BoardResult};
pub use snapshot::BoardSnapshot;

use glam::DVec2;

/// Engine configuration constants
pub mod consts {
    /// Side length of a board in grid units (L)
    pub const BOARD_SIZE: i32 = 20;

    /// Ball defaults
    pub const BALL_RADIUS: f64 = 0.25;
    pub const BALL_MASS: f64 = 1.0;
    /// Speed cap in L/s
    pub const TERMINAL_VELOCITY: f64 = 200.0;

    /// Board physics defaults
    pub const DEFAULT_GRAVITY: f64 = 25.0;
    pub const DEFAULT_FRICTION1: f64 = 0.025;
    pub const DEFAULT_FRICTION2: f64 = 0.025;

    /// Safety cap on resolved collisions in one frame
    pub const MAX_COLLISIONS_PER_FRAME: usize = 100;

    /// Gravity field cells per grid unit
    pub const FIELD_RESOLUTION: usize = 2;
    /// Vortex radius in field cells
    pub const VORTEX_RADIUS: f64 = 10.0;
    /// Inward acceleration inside a vortex (L/s²)
    pub const VORTEX_INTENSITY: f64 = 30.0;

    /// Trigger timer value of a gadget that has not fired recently
    pub const TRIGGER_TIMER_IDLE: f64 = 10.0;

    /// Bounded queue capacity for input/transport/message channels
    pub const QUEUE_CAPACITY: usize = 256;
}

/// Rotate `point` about `center` by `angle` radians
#[inline]
pub fn rotate_around(point: DVec2, center: DVec2, angle: f64) -> DVec2 {
    center + DVec2::from_angle(angle).rotate(point - center)
}

/// Rotate `point` about `center` by whole quarter turns.
///
/// In screen coordinates (y down) each quarter turn is clockwise. Exact,
/// so grid corners stay on the grid.
#[inline]
pub fn rotate_quarter_turns(point: DVec2, center: DVec2, turns: u8) -> DVec2 {
    let mut rel = point - center;
    for _ in 0..turns % 4 {
        rel = rel.perp();
    }
    center + rel
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_rotate_around() {
        let p = rotate_around(DVec2::new(2.0, 1.0), DVec2::new(1.0, 1.0), PI / 2.0);
        assert!((p - DVec2::new(1.0, 2.0)).length() < 1e-12);
    }

    #[test]
    fn test_rotate_quarter_turns_is_exact() {
        let c = DVec2::new(6.5, 0.5);
        assert_eq!(rotate_quarter_turns(DVec2::new(7.0, 0.0), c, 1), DVec2::new(7.0, 1.0));
        assert_eq!(rotate_quarter_turns(DVec2::new(7.0, 0.0), c, 2), DVec2::new(6.0, 1.0));
        assert_eq!(rotate_quarter_turns(DVec2::new(7.0, 0.0), c, 4), DVec2::new(7.0, 0.0));
    }
}
