//! Engine tuning
//!
//! Values the engine treats as constants at runtime. Loaded from JSON when
//! a driver wants something other than the defaults; every field is optional
//! in the JSON and falls back to `Default`.

use serde::{Deserialize, Serialize};

use crate::consts;
use crate::error::{BoardError, BoardResult};

/// Engine-wide configuration shared by every board a driver builds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Side length of the square arena in grid units
    pub board_size: i32,
    /// Radius given to balls that do not specify one
    pub ball_radius: f64,
    /// Speed cap applied after every impulse and force pass
    pub terminal_velocity: f64,
    /// Collisions resolved per frame before the rest of the frame is
    /// simulated without collision handling
    pub max_collisions_per_frame: usize,

    // === Gravity field ===
    /// Field cells per grid unit
    pub field_resolution: usize,
    /// Magnitude of the divergence component added to uniform gravity
    pub field_divergence: f64,
    /// Magnitude of the curl component added to uniform gravity
    pub field_curl: f64,
    /// Vortex radius in field cells
    pub vortex_radius: f64,
    /// Inward acceleration inside a vortex
    pub vortex_intensity: f64,

    // === Gadgets ===
    /// Minimum seconds between two absorber releases
    pub absorber_latency: f64,

    /// Capacity of each bounded queue
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            board_size: consts::BOARD_SIZE,
            ball_radius: consts::BALL_RADIUS,
            terminal_velocity: consts::TERMINAL_VELOCITY,
            max_collisions_per_frame: consts::MAX_COLLISIONS_PER_FRAME,

            field_resolution: consts::FIELD_RESOLUTION,
            field_divergence: 0.0,
            field_curl: 0.0,
            vortex_radius: consts::VORTEX_RADIUS,
            vortex_intensity: consts::VORTEX_INTENSITY,

            absorber_latency: 0.0,

            queue_capacity: consts::QUEUE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> BoardResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config from disk
    pub fn load(path: impl AsRef<std::path::Path>) -> BoardResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded engine config");
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> BoardResult<()> {
        let fail = |reason: &str| Err(BoardError::InvalidConfig(reason.to_string()));

        if self.board_size <= 0 {
            return fail("board_size must be positive");
        }
        if !(self.ball_radius > 0.0) {
            return fail("ball_radius must be positive");
        }
        if !(self.terminal_velocity > 0.0) {
            return fail("terminal_velocity must be positive");
        }
        if self.field_resolution == 0 {
            return fail("field_resolution must be at least 1");
        }
        if self.vortex_radius < 0.0 || !self.vortex_intensity.is_finite() {
            return fail("vortex parameters out of range");
        }
        if self.absorber_latency < 0.0 {
            return fail("absorber_latency must not be negative");
        }
        if self.queue_capacity == 0 {
            return fail("queue_capacity must be at least 1");
        }
        Ok(())
    }

    /// Side length of the gravity field in cells
    pub fn field_dimension(&self) -> usize {
        self.field_resolution * (self.board_size as usize + 1)
    }

    /// Board side length as a float, for geometry
    pub fn size(&self) -> f64 {
        self.board_size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.field_dimension(), 42);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{ "absorber_latency": 0.5 }"#).unwrap();
        assert_eq!(config.absorber_latency, 0.5);
        assert_eq!(config.board_size, 20);
        assert_eq!(config.terminal_velocity, 200.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_json(r#"{ "board_size": 0 }"#).unwrap_err();
        assert!(matches!(err, BoardError::InvalidConfig(_)));

        let err = EngineConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, BoardError::Parse(_)));
    }
}
