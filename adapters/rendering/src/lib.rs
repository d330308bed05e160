#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Pushbox adapters.
//!
//! Backends receive an immutable [`Scene`] captured from the puzzle once per
//! step. Display resources such as the cell size are injected through
//! [`GridPresentation`] rather than held globally.

use std::{error::Error, fmt, io::Write};

use anyhow::Result as AnyResult;
use glam::Vec2;
use pushbox_core::{CellCoord, GridSize};
use pushbox_world::{query, PuzzleState};

/// Describes how the puzzle grid maps onto world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridPresentation {
    /// Number of columns contained in the grid.
    pub columns: u32,
    /// Number of rows contained in the grid.
    pub rows: u32,
    /// Side length of a single cell expressed in world units.
    pub cell_length: f32,
}

impl GridPresentation {
    /// Creates a new grid descriptor.
    ///
    /// Returns an error when `cell_length` is not a positive finite number.
    pub fn new(grid: GridSize, cell_length: f32) -> Result<Self, RenderingError> {
        if !(cell_length.is_finite() && cell_length > 0.0) {
            return Err(RenderingError::InvalidCellLength { cell_length });
        }

        Ok(Self {
            columns: grid.columns(),
            rows: grid.rows(),
            cell_length,
        })
    }

    /// Calculates the total width of the grid.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.columns as f32 * self.cell_length
    }

    /// Calculates the total height of the grid.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.rows as f32 * self.cell_length
    }

    /// World-space position of the cell's upper-left corner.
    #[must_use]
    pub fn world_position(&self, cell: CellCoord) -> Vec2 {
        Vec2::new(cell.column() as f32, cell.row() as f32) * self.cell_length
    }

    /// World-space position of the cell's centre.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> Vec2 {
        self.world_position(cell) + Vec2::splat(self.cell_length / 2.0)
    }

    /// Clamps a world-space position to the grid bounds.
    #[must_use]
    pub fn clamp_world_position(&self, position: Vec2) -> Vec2 {
        Vec2::new(
            position.x.clamp(0.0, self.width()),
            position.y.clamp(0.0, self.height()),
        )
    }

    /// Cell containing the world-space position, if it lies on the grid.
    #[must_use]
    pub fn cell_at(&self, position: Vec2) -> Option<CellCoord> {
        if position.x < 0.0 || position.y < 0.0 {
            return None;
        }
        let scaled = position / self.cell_length;
        let column = scaled.x.floor() as u32;
        let row = scaled.y.floor() as u32;
        (column < self.columns && row < self.rows).then_some(CellCoord::new(column, row))
    }
}

/// Immutable snapshot of everything a backend draws.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Grid geometry.
    pub grid: GridPresentation,
    /// Cell occupied by the player.
    pub player: CellCoord,
    /// Block cells.
    pub blocks: Vec<CellCoord>,
    /// Target cells.
    pub targets: Vec<CellCoord>,
    /// Targets covered by a block.
    pub occupied_targets: Vec<CellCoord>,
}

impl Scene {
    /// Captures the scene for the provided puzzle.
    #[must_use]
    pub fn capture(state: &PuzzleState, grid: GridPresentation) -> Self {
        Self {
            grid,
            player: query::player(state),
            blocks: query::blocks(state).iter().copied().collect(),
            targets: query::targets(state).iter().copied().collect(),
            occupied_targets: query::occupied_targets(state).iter().copied().collect(),
        }
    }

    /// World-space position of the cell's upper-left corner.
    #[must_use]
    pub fn world_position(&self, cell: CellCoord) -> Vec2 {
        self.grid.world_position(cell)
    }

    /// Glyph describing what occupies the cell.
    #[must_use]
    pub fn glyph(&self, cell: CellCoord) -> char {
        let target = self.targets.contains(&cell);
        if cell == self.player {
            return if target { '+' } else { 'P' };
        }
        if self.occupied_targets.contains(&cell) {
            return '*';
        }
        if self.blocks.contains(&cell) {
            return 'B';
        }
        if target {
            'T'
        } else {
            '.'
        }
    }
}

/// Rendering backend capable of presenting Pushbox scenes.
pub trait RenderingBackend {
    /// Presents a single scene.
    fn present(&mut self, scene: &Scene) -> AnyResult<()>;
}

/// Backend that prints one glyph per cell to any writer.
///
/// `P` player, `+` player on a target, `B` block, `*` block on a target,
/// `T` free target and `.` floor.
#[derive(Debug)]
pub struct TextBackend<W> {
    out: W,
}

impl<W: Write> TextBackend<W> {
    /// Creates a backend writing into `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RenderingBackend for TextBackend<W> {
    fn present(&mut self, scene: &Scene) -> AnyResult<()> {
        let mut line = String::with_capacity(scene.grid.columns as usize + 1);
        for row in 0..scene.grid.rows {
            line.clear();
            line.extend((0..scene.grid.columns).map(|column| scene.glyph(CellCoord::new(column, row))));
            writeln!(self.out, "{line}")?;
        }
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq)]
pub enum RenderingError {
    /// Cells must have a positive finite size.
    InvalidCellLength {
        /// Provided length that failed validation.
        cell_length: f32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCellLength { cell_length } => {
                write!(
                    f,
                    "cell_length must be positive and finite (received {cell_length})"
                )
            }
        }
    }
}

impl Error for RenderingError {}
