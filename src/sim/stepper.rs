//! Frame stepper
//!
//! Spends a frame's time budget collision by collision: find the earliest
//! collision, move everything up to it, resolve it, apply forces for the
//! elapsed time and carry on with what is left. Runs as a loop with an
//! explicit remaining budget and a cap on collisions per frame; once the cap
//! is hit the rest of the frame is simulated without collision handling.

use std::sync::Arc;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::field::{FieldGrid, GravityField};
use super::playfield::Playfield;
use crate::config::EngineConfig;
use crate::consts;

/// Per-board physical constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Physics {
    /// Downward acceleration in L/s²
    pub gravity: f64,
    /// Constant friction coefficient (per second)
    pub friction1: f64,
    /// Speed-proportional friction coefficient (per L)
    pub friction2: f64,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            gravity: consts::DEFAULT_GRAVITY,
            friction1: consts::DEFAULT_FRICTION1,
            friction2: consts::DEFAULT_FRICTION2,
        }
    }
}

impl Physics {
    pub fn gravity_vector(&self) -> DVec2 {
        DVec2::new(0.0, self.gravity)
    }
}

/// What happened during one `advance`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Collisions resolved
    pub collisions: usize,
    /// True when the collision cap cut the frame short
    pub truncated: bool,
}

/// Time-stepping state: physics constants plus the current gravity field
#[derive(Debug, Clone)]
pub struct Simulation {
    physics: Physics,
    grid: FieldGrid,
    divergence: f64,
    curl: f64,
    vortex_radius: f64,
    vortex_intensity: f64,
    max_collisions: usize,
    field: Arc<GravityField>,
}

impl Simulation {
    pub fn new(physics: Physics, config: &EngineConfig) -> Self {
        let grid = FieldGrid::for_config(config);
        let field = GravityField::composite(
            grid,
            physics.gravity_vector(),
            config.field_divergence,
            config.field_curl,
        );
        Self {
            physics,
            grid,
            divergence: config.field_divergence,
            curl: config.field_curl,
            vortex_radius: config.vortex_radius,
            vortex_intensity: config.vortex_intensity,
            max_collisions: config.max_collisions_per_frame,
            field: Arc::new(field),
        }
    }

    pub fn physics(&self) -> &Physics {
        &self.physics
    }

    /// Current gravity field. Callers may keep the handle; distortions
    /// replace the field rather than mutate it.
    pub fn field(&self) -> Arc<GravityField> {
        Arc::clone(&self.field)
    }

    /// Replace the field with a vortex centred on board position `point`
    pub fn distort_gravity(&mut self, point: DVec2) {
        let center = self.grid.cell_of(point);
        log::debug!("gravity vortex at cell {center}");
        self.field = Arc::new(GravityField::vortex(
            self.grid,
            self.physics.gravity_vector(),
            center,
            self.vortex_radius,
            self.vortex_intensity,
        ));
    }

    /// Back to the undistorted field
    pub fn reset_gravity(&mut self) {
        self.field = Arc::new(GravityField::composite(
            self.grid,
            self.physics.gravity_vector(),
            self.divergence,
            self.curl,
        ));
    }

    /// Simulate `dt` seconds of the playfield
    pub fn advance(&self, playfield: &mut Playfield, dt: f64) -> StepReport {
        let mut report = StepReport::default();
        let mut remaining = dt.max(0.0);

        loop {
            if report.collisions >= self.max_collisions {
                report.truncated = true;
                log::debug!(
                    "collision cap of {} reached, {remaining:.4}s left unresolved",
                    self.max_collisions
                );
                break;
            }
            let Some((t, contact)) = playfield.earliest_collision() else {
                break;
            };
            if t > remaining {
                break;
            }
            playfield.displace_all(t);
            playfield.resolve(contact);
            playfield.apply_forces(t, &self.field, &self.physics);
            remaining -= t;
            report.collisions += 1;
        }

        playfield.displace_all(remaining);
        playfield.apply_forces(remaining, &self.field, &self.physics);
        report
    }
}
