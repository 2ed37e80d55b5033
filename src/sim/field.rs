//! Discretised gravity vector field
//!
//! A square grid of acceleration vectors covering the board at a fixed
//! number of cells per grid unit. Fields are immutable values: distorting or
//! resetting gravity builds a new field and the simulation swaps it in.
//! Sampling truncates to the containing cell; there is no interpolation.

use std::fmt;

use glam::{DVec2, IVec2};

use crate::config::EngineConfig;
use crate::error::{BoardError, BoardResult};

/// Size and scale of a field grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldGrid {
    /// Cells per side
    pub dimension: usize,
    /// Cells per board grid unit
    pub resolution: usize,
}

impl FieldGrid {
    pub fn new(dimension: usize, resolution: usize) -> Self {
        Self {
            dimension,
            resolution,
        }
    }

    pub fn for_config(config: &EngineConfig) -> Self {
        Self::new(config.field_dimension(), config.field_resolution)
    }

    /// Geometric centre of the grid in cell coordinates
    pub fn center(&self) -> DVec2 {
        DVec2::splat((self.dimension as f64 - 1.0) / 2.0)
    }

    /// Cell containing board position `pos`, clamped onto the grid
    pub fn cell_of(&self, pos: DVec2) -> IVec2 {
        let scaled = (pos + DVec2::splat(0.5)) * self.resolution as f64;
        let max = self.dimension as i32 - 1;
        scaled.as_ivec2().clamp(IVec2::ZERO, IVec2::splat(max.max(0)))
    }

    fn index(&self, cell: IVec2) -> usize {
        cell.y as usize * self.dimension + cell.x as usize
    }

    fn cells(&self) -> impl Iterator<Item = DVec2> + '_ {
        let n = self.dimension;
        (0..n * n).map(move |i| DVec2::new((i % n) as f64, (i / n) as f64))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GravityField {
    grid: FieldGrid,
    cells: Vec<DVec2>,
    vortex: Option<IVec2>,
}

impl GravityField {
    fn from_fn(grid: FieldGrid, f: impl Fn(DVec2) -> DVec2) -> Self {
        Self {
            grid,
            cells: grid.cells().map(f).collect(),
            vortex: None,
        }
    }

    /// Same vector everywhere
    pub fn uniform(grid: FieldGrid, gravity: DVec2) -> Self {
        Self::from_fn(grid, |_| gravity)
    }

    /// Vectors pointing away from the centre with constant magnitude
    pub fn divergent(grid: FieldGrid, magnitude: f64) -> Self {
        let center = grid.center();
        Self::from_fn(grid, |cell| (center - cell).normalize_or_zero() * -magnitude)
    }

    /// Vectors circling the centre with constant magnitude
    pub fn curl(grid: FieldGrid, magnitude: f64) -> Self {
        let center = grid.center();
        Self::from_fn(grid, |cell| swirl(cell - center) * magnitude)
    }

    /// Like [`divergent`](Self::divergent) but falling off with the square
    /// of the distance from the centre
    pub fn inverse_square_divergent(grid: FieldGrid, magnitude: f64) -> Self {
        let center = grid.center();
        Self::from_fn(grid, |cell| {
            let ray = center - cell;
            match ray.length_squared() {
                d2 if d2 > 0.0 => ray.normalize_or_zero() * (-magnitude / d2),
                _ => DVec2::ZERO,
            }
        })
    }

    /// Like [`curl`](Self::curl) but falling off with the square of the
    /// distance from the centre
    pub fn inverse_square_curl(grid: FieldGrid, magnitude: f64) -> Self {
        let center = grid.center();
        Self::from_fn(grid, |cell| {
            let ray = cell - center;
            match ray.length_squared() {
                d2 if d2 > 0.0 => swirl(ray) * (magnitude / d2),
                _ => DVec2::ZERO,
            }
        })
    }

    /// Uniform gravity plus optional divergence and curl components
    pub fn composite(grid: FieldGrid, gravity: DVec2, divergence: f64, curl: f64) -> Self {
        let mut field = Self::uniform(grid, gravity);
        if divergence != 0.0 {
            field.accumulate(&Self::divergent(grid, divergence));
        }
        if curl != 0.0 {
            field.accumulate(&Self::curl(grid, curl));
        }
        field
    }

    /// Uniform `gravity` everywhere except within `radius` cells of `center`,
    /// where every vector points at `center` with magnitude `intensity`
    pub fn vortex(grid: FieldGrid, gravity: DVec2, center: IVec2, radius: f64, intensity: f64) -> Self {
        let c = center.as_dvec2();
        let mut field = Self::from_fn(grid, |cell| {
            let ray = c - cell;
            if ray.length() <= radius {
                ray.normalize_or_zero() * intensity
            } else {
                gravity
            }
        });
        field.vortex = Some(center);
        field
    }

    /// Cell-wise sum
    pub fn plus(&self, other: &GravityField) -> BoardResult<Self> {
        if self.grid.dimension != other.grid.dimension {
            return Err(BoardError::FieldDimensionMismatch(
                self.grid.dimension,
                other.grid.dimension,
            ));
        }
        let mut sum = self.clone();
        sum.accumulate(other);
        Ok(sum)
    }

    fn accumulate(&mut self, other: &GravityField) {
        for (a, b) in self.cells.iter_mut().zip(&other.cells) {
            *a += *b;
        }
    }

    pub fn grid(&self) -> FieldGrid {
        self.grid
    }

    /// Centre cell of the current distortion, if any
    pub fn vortex_center(&self) -> Option<IVec2> {
        self.vortex
    }

    pub fn value_at_cell(&self, cell: IVec2) -> DVec2 {
        let max = self.grid.dimension as i32 - 1;
        let cell = cell.clamp(IVec2::ZERO, IVec2::splat(max.max(0)));
        self.cells
            .get(self.grid.index(cell))
            .copied()
            .unwrap_or(DVec2::ZERO)
    }

    /// Acceleration at board position `pos`
    pub fn value_at(&self, pos: DVec2) -> DVec2 {
        self.value_at_cell(self.grid.cell_of(pos))
    }
}

/// Unit tangent for a ray from the centre: (sin θ, −cos θ)
fn swirl(ray: DVec2) -> DVec2 {
    if ray == DVec2::ZERO {
        return DVec2::ZERO;
    }
    let theta = ray.y.atan2(ray.x);
    DVec2::new(theta.sin(), -theta.cos())
}

impl fmt::Display for GravityField {
    /// One arrow-like glyph per cell, rows top to bottom
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.grid.dimension.max(1)) {
            let line: String = row
                .iter()
                .map(|v| {
                    if v.length_squared() == 0.0 {
                        '.'
                    } else if v.x.abs() > v.y.abs() {
                        if v.x > 0.0 { '>' } else { '<' }
                    } else if v.y > 0.0 {
                        'v'
                    } else {
                        '^'
                    }
                })
                .collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
