//! Drawable view of a board
//!
//! A snapshot is a plain value copied out of a board between frames, so a
//! renderer can serialize it, ship it to another thread or draw it as text
//! without holding on to the board.

use glam::{DVec2, IVec2};
use serde::Serialize;

use crate::board::Board;
use crate::error::BoardResult;
use crate::sim::gadget::{FlipperState, Gadget, GadgetBody, GadgetKind};
use crate::sim::geometry::{Circle, Segment};
use crate::sim::wall::WallSide;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardSnapshot {
    pub name: String,
    pub size: i32,
    pub balls: Vec<BallSprite>,
    pub walls: Vec<WallSprite>,
    pub gadgets: Vec<GadgetSprite>,
    /// Centre of the gravity vortex in board coordinates, if gravity is
    /// distorted
    pub vortex: Option<DVec2>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BallSprite {
    pub pos: DVec2,
    pub radius: f64,
    pub color: [f32; 3],
    pub in_stasis: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WallSprite {
    pub side: WallSide,
    pub edge: Segment,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GadgetSprite {
    pub name: String,
    pub kind: GadgetKind,
    pub origin: IVec2,
    pub width: i32,
    pub height: i32,
    /// Brightness in (0, 1], highest right after the gadget fired
    pub glow: f64,
    pub glyph: char,
    pub shape: Shape,
    pub state: SpriteState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Circle { center: DVec2, radius: f64 },
    Polygon { sides: Vec<Segment> },
    Paddle { sides: [Segment; 2], ends: [Circle; 2] },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpriteState {
    Idle,
    Absorber { captured: usize },
    Flipper { state: FlipperState },
    Portal { open: bool },
}

impl GadgetSprite {
    fn capture(gadget: &Gadget) -> Self {
        let (shape, state) = match gadget.body() {
            GadgetBody::Circle(c) => (circle(c.circle()), SpriteState::Idle),
            GadgetBody::Square(s) => (polygon(s.outline().sides()), SpriteState::Idle),
            GadgetBody::Triangle(t) => (polygon(t.outline().sides()), SpriteState::Idle),
            GadgetBody::Absorber(a) => (
                polygon(a.outline().sides()),
                SpriteState::Absorber {
                    captured: a.captured(),
                },
            ),
            GadgetBody::Flipper(f) => {
                let pose = f.pose();
                (
                    Shape::Paddle {
                        sides: pose.sides,
                        ends: pose.ends,
                    },
                    SpriteState::Flipper { state: f.state() },
                )
            }
            GadgetBody::Portal(p) => (circle(p.circle()), SpriteState::Portal { open: p.is_open() }),
        };
        Self {
            name: gadget.name().to_string(),
            kind: gadget.kind(),
            origin: gadget.origin(),
            width: gadget.width(),
            height: gadget.height(),
            glow: gadget.glow(),
            glyph: gadget.glyph(),
            shape,
            state,
        }
    }

    /// Grid cells to draw this gadget's glyph in
    fn cells(&self) -> Vec<IVec2> {
        match &self.shape {
            Shape::Paddle { ends, .. } => {
                let (from, to) = (ends[0].center, ends[1].center);
                (0..=4)
                    .map(|k| from.lerp(to, k as f64 / 4.0).floor().as_ivec2())
                    .collect()
            }
            _ => (0..self.height)
                .flat_map(|dy| (0..self.width).map(move |dx| self.origin + IVec2::new(dx, dy)))
                .collect(),
        }
    }
}

fn circle(c: Circle) -> Shape {
    Shape::Circle {
        center: c.center,
        radius: c.radius,
    }
}

fn polygon(sides: &[Segment]) -> Shape {
    Shape::Polygon {
        sides: sides.to_vec(),
    }
}

impl BoardSnapshot {
    pub fn capture(board: &Board) -> Self {
        let field = board.field();
        let resolution = field.grid().resolution.max(1) as f64;
        let vortex = field
            .vortex_center()
            .map(|cell| cell.as_dvec2() / resolution - DVec2::splat(0.5));

        Self {
            name: board.name().to_string(),
            size: board.config().board_size,
            balls: board
                .balls()
                .iter()
                .map(|b| BallSprite {
                    pos: b.pos(),
                    radius: b.radius(),
                    color: b.color(),
                    in_stasis: b.in_stasis(),
                })
                .collect(),
            walls: board
                .walls()
                .iter()
                .map(|w| WallSprite {
                    side: w.side(),
                    edge: w.edge(),
                    link: w.link().map(str::to_string),
                })
                .collect(),
            gadgets: board.gadgets().iter().map(GadgetSprite::capture).collect(),
            vortex,
        }
    }

    pub fn to_json(&self) -> BoardResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The board as a (size + 2)² character grid, one line per row.
    ///
    /// The border is drawn with '.', and a linked wall carries its
    /// neighbour's name. Balls are '*'; gadgets use their glyphs.
    pub fn render_text(&self) -> String {
        let n = self.size.max(0) as usize + 2;
        let mut grid = vec![vec![' '; n]; n];

        for i in 0..n {
            grid[0][i] = '.';
            grid[n - 1][i] = '.';
            grid[i][0] = '.';
            grid[i][n - 1] = '.';
        }

        for wall in &self.walls {
            let Some(link) = &wall.link else {
                continue;
            };
            for (i, c) in link.chars().take(n - 2).enumerate() {
                let (row, col) = match wall.side {
                    WallSide::Top => (0, i + 1),
                    WallSide::Bottom => (n - 1, i + 1),
                    WallSide::Left => (i + 1, 0),
                    WallSide::Right => (i + 1, n - 1),
                };
                grid[row][col] = c;
            }
        }

        let mut plot = |cell: IVec2, c: char| {
            if cell.x >= 0 && cell.y >= 0 && cell.x < self.size && cell.y < self.size {
                grid[cell.y as usize + 1][cell.x as usize + 1] = c;
            }
        };
        for gadget in &self.gadgets {
            for cell in gadget.cells() {
                plot(cell, gadget.glyph);
            }
        }
        for ball in &self.balls {
            plot(ball.pos.floor().as_ivec2(), '*');
        }

        let mut text = String::with_capacity(n * (n + 1));
        for row in grid {
            text.extend(row);
            text.push('\n');
        }
        text
    }
}
