#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Pushbox simulator.
//!
//! This crate defines the value types and message surface that connect the
//! authoritative puzzle state, the pure systems, and the adapters. Callers
//! submit [`Command`] values describing the desired mutation, the world
//! executes them through its `apply` entry point, returns a [`MoveReport`]
//! change record, and broadcasts [`Event`] values describing what happened.
//! Systems consume those records and read-only queries; they never mutate the
//! puzzle directly.

use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Smallest number of columns or rows a playable grid may have.
pub const MIN_GRID_DIMENSION: u32 = 3;

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Cells are ordered by column first and row second, which gives every
/// block and target set a deterministic iteration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Returns the neighbouring cell in `direction`, or `None` when the
    /// neighbour would leave the grid.
    #[must_use]
    pub fn step(self, direction: Direction, grid: GridSize) -> Option<CellCoord> {
        let (column_delta, row_delta) = direction.delta();
        let column = self.column.checked_add_signed(column_delta)?;
        let row = self.row.checked_add_signed(row_delta)?;
        let neighbour = CellCoord::new(column, row);
        grid.contains(neighbour).then_some(neighbour)
    }

    /// Signed offset from `origin` to this cell as `(columns, rows)`.
    #[must_use]
    pub fn offset_from(self, origin: CellCoord) -> (i64, i64) {
        (
            i64::from(self.column) - i64::from(origin.column),
            i64::from(self.row) - i64::from(origin.row),
        )
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Dimensions of the playing field measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    columns: u32,
    rows: u32,
}

impl GridSize {
    /// Creates a new grid size descriptor.
    #[must_use]
    pub const fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Total number of cells in the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let count = u64::from(self.columns) * u64::from(self.rows);
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    /// Reports whether the cell lies inside `[0, columns) × [0, rows)`.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column < self.columns && cell.row < self.rows
    }

    /// Reports whether the cell touches two perpendicular borders.
    #[must_use]
    pub fn is_corner(&self, cell: CellCoord) -> bool {
        let on_vertical = self.touches(cell, Border::Left) || self.touches(cell, Border::Right);
        let on_horizontal = self.touches(cell, Border::Top) || self.touches(cell, Border::Bottom);
        on_vertical && on_horizontal
    }

    /// Reports whether the cell lies on the provided border.
    #[must_use]
    pub fn touches(&self, cell: CellCoord, border: Border) -> bool {
        if !self.contains(cell) {
            return false;
        }
        match border {
            Border::Top => cell.row == 0,
            Border::Bottom => cell.row + 1 == self.rows,
            Border::Left => cell.column == 0,
            Border::Right => cell.column + 1 == self.columns,
        }
    }

    /// Iterator over the borders the cell lies on.
    pub fn borders_touching(&self, cell: CellCoord) -> impl Iterator<Item = Border> + '_ {
        Border::ALL
            .into_iter()
            .filter(move |border| self.touches(cell, *border))
    }

    /// Reports whether the cell lies strictly inside the grid, away from every border.
    #[must_use]
    pub fn is_interior(&self, cell: CellCoord) -> bool {
        self.contains(cell) && self.borders_touching(cell).next().is_none()
    }

    /// Iterator over every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let columns = self.columns;
        (0..self.rows).flat_map(move |row| (0..columns).map(move |column| CellCoord::new(column, row)))
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::new(9, 9)
    }
}

/// Cardinal movement directions available to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    Up,
    /// Movement toward increasing row indices.
    Down,
    /// Movement toward decreasing column indices.
    Left,
    /// Movement toward increasing column indices.
    Right,
}

impl Direction {
    /// Every direction in observation order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Column and row delta applied by a single step.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Position of the direction within [`Direction::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }
}

impl TryFrom<u8> for Direction {
    type Error = DirectionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Direction::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(DirectionError::IndexOutOfRange(value))
    }
}

impl FromStr for Direction {
    type Err = DirectionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "up" | "u" => Ok(Direction::Up),
            "down" | "d" => Ok(Direction::Down),
            "left" | "l" => Ok(Direction::Left),
            "right" | "r" => Ok(Direction::Right),
            _ => Err(DirectionError::Unrecognized(value.to_owned())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

/// Raised when a caller hands over a direction outside the four recognised values.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DirectionError {
    /// Numeric action index outside `0..=3`.
    #[error("direction index {0} is outside 0..=3")]
    IndexOutOfRange(u8),
    /// Textual direction that names none of up, down, left or right.
    #[error("unrecognized direction `{0}`")]
    Unrecognized(String),
}

/// One of the four outer edges of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Border {
    /// Row zero.
    Top,
    /// Last row.
    Bottom,
    /// Column zero.
    Left,
    /// Last column.
    Right,
}

impl Border {
    /// Every border in a fixed order.
    pub const ALL: [Border; 4] = [Border::Top, Border::Bottom, Border::Left, Border::Right];
}

/// Commands that express all permissible puzzle mutations.
///
/// Fresh arrangements are installed by constructing a new puzzle state, so
/// the only mutation available mid-episode is a player move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Requests that the player step one cell in the given direction.
    MovePlayer {
        /// Direction of travel for the attempted step.
        direction: Direction,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that the player moved between two cells.
    PlayerMoved {
        /// Cell the player occupied before moving.
        from: CellCoord,
        /// Cell the player occupies after moving.
        to: CellCoord,
    },
    /// Confirms that a block was pushed one cell.
    BlockPushed {
        /// Cell the block occupied before the push.
        from: CellCoord,
        /// Cell the block occupies after the push.
        to: CellCoord,
    },
    /// Reports that a block came to rest on a target.
    TargetOccupied {
        /// Target that is now covered.
        cell: CellCoord,
    },
    /// Reports that a block left a target.
    TargetVacated {
        /// Target that is free again.
        cell: CellCoord,
    },
    /// Reports that a move request was illegal and left the puzzle untouched.
    MoveRejected {
        /// Direction that was requested.
        direction: Direction,
        /// Specific reason the move failed.
        reason: MoveRejection,
    },
}

/// Reasons a move request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveRejection {
    /// The player would leave the grid.
    OutOfBounds,
    /// The adjacent block would be pushed off the grid.
    BlockAgainstEdge,
    /// The adjacent block would be pushed into another block.
    BlockAgainstBlock,
}

/// Relocation of a single block caused by a push.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPush {
    /// Cell the block occupied before the push.
    pub from: CellCoord,
    /// Cell the block occupies after the push.
    pub to: CellCoord,
}

/// Change record returned for every move request.
///
/// This is the sole channel through which downstream systems learn what a
/// step did; none of them rescan the board to find out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveReport {
    /// Whether the player changed cells.
    pub player_moved: bool,
    /// Block relocated by the move, if any.
    pub pushed_block: Option<BlockPush>,
}

impl MoveReport {
    /// Report describing an illegal move.
    #[must_use]
    pub const fn rejected() -> Self {
        Self {
            player_moved: false,
            pushed_block: None,
        }
    }

    /// Report describing a plain step onto a free cell.
    #[must_use]
    pub const fn moved() -> Self {
        Self {
            player_moved: true,
            pushed_block: None,
        }
    }

    /// Report describing a step that pushed a block from `from` to `to`.
    #[must_use]
    pub const fn pushed(from: CellCoord, to: CellCoord) -> Self {
        Self {
            player_moved: true,
            pushed_block: Some(BlockPush { from, to }),
        }
    }

    /// Reports whether the move was illegal.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        !self.player_moved && self.pushed_block.is_none()
    }
}

/// Lifecycle stage of an episode after its most recent step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EpisodeOutcome {
    /// The episode accepts further moves.
    #[default]
    InProgress,
    /// Every target is covered.
    Won,
    /// The puzzle can no longer be solved.
    Deadlocked,
    /// The move budget ran out before the puzzle was solved.
    BudgetExhausted,
}

impl EpisodeOutcome {
    /// Reports whether the episode has ended.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }

    /// Reports whether the episode ended in a win.
    #[must_use]
    pub const fn is_won(self) -> bool {
        matches!(self, Self::Won)
    }
}

impl fmt::Display for EpisodeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::InProgress => "in progress",
            Self::Won => "won",
            Self::Deadlocked => "deadlocked",
            Self::BudgetExhausted => "budget exhausted",
        };
        f.write_str(label)
    }
}

/// Complete arrangement of a puzzle: grid, player, blocks and targets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Dimensions of the playing field.
    pub grid: GridSize,
    /// Starting cell of the player.
    pub player: CellCoord,
    /// Starting cells of the movable blocks.
    pub blocks: Vec<CellCoord>,
    /// Destination cells, fixed for the lifetime of an episode.
    pub targets: Vec<CellCoord>,
}

impl Layout {
    /// Checks every structural rule an arrangement must satisfy before play.
    ///
    /// Blocks may start on targets. Block and target counts must match, which
    /// is what makes every off-target frozen block a guaranteed loss.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let grid = self.grid;
        if grid.columns() < MIN_GRID_DIMENSION || grid.rows() < MIN_GRID_DIMENSION {
            return Err(LayoutError::GridTooSmall {
                columns: grid.columns(),
                rows: grid.rows(),
            });
        }
        if !grid.contains(self.player) {
            return Err(LayoutError::OutOfBounds { cell: self.player });
        }
        if self.blocks.is_empty() {
            return Err(LayoutError::NoBlocks);
        }
        if self.blocks.len() != self.targets.len() {
            return Err(LayoutError::CountMismatch {
                blocks: self.blocks.len(),
                targets: self.targets.len(),
            });
        }

        let mut seen_blocks = BTreeSet::new();
        for &block in &self.blocks {
            if !grid.contains(block) {
                return Err(LayoutError::OutOfBounds { cell: block });
            }
            if block == self.player {
                return Err(LayoutError::PlayerOnBlock { cell: block });
            }
            if !seen_blocks.insert(block) {
                return Err(LayoutError::DuplicateBlock { cell: block });
            }
        }

        let mut seen_targets = BTreeSet::new();
        for &target in &self.targets {
            if !grid.contains(target) {
                return Err(LayoutError::OutOfBounds { cell: target });
            }
            if !seen_targets.insert(target) {
                return Err(LayoutError::DuplicateTarget { cell: target });
            }
        }

        Ok(())
    }
}

/// Reasons a puzzle arrangement may be refused.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// The grid cannot host a meaningful puzzle or the requested placement.
    #[error("grid {columns}x{rows} is too small")]
    GridTooSmall {
        /// Columns requested.
        columns: u32,
        /// Rows requested.
        rows: u32,
    },
    /// A coordinate lies outside the grid.
    #[error("cell {cell} lies outside the grid")]
    OutOfBounds {
        /// Offending coordinate.
        cell: CellCoord,
    },
    /// Two blocks share a cell.
    #[error("more than one block occupies {cell}")]
    DuplicateBlock {
        /// Shared cell.
        cell: CellCoord,
    },
    /// A target is listed twice.
    #[error("target {cell} is listed more than once")]
    DuplicateTarget {
        /// Repeated target.
        cell: CellCoord,
    },
    /// The player starts inside a block.
    #[error("player starts on the block at {cell}")]
    PlayerOnBlock {
        /// Shared cell.
        cell: CellCoord,
    },
    /// The arrangement contains nothing to push.
    #[error("layout contains no blocks")]
    NoBlocks,
    /// Block and target counts differ.
    #[error("layout has {blocks} blocks but {targets} targets")]
    CountMismatch {
        /// Number of blocks.
        blocks: usize,
        /// Number of targets.
        targets: usize,
    },
}
