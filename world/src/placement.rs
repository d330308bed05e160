//! Random arrangement of player, blocks and targets for a fresh episode.

use pushbox_core::{CellCoord, GridSize, Layout, LayoutError, MIN_GRID_DIMENSION};
use rand::{seq::SliceRandom, Rng};

/// Draws a non-overlapping arrangement with `block_count` blocks and targets.
///
/// Blocks are confined to interior cells so no block starts pinned against a
/// border, and a block that would close a 2x2 square of blocks is only placed
/// when the interior is too crowded to do otherwise. Targets may land
/// anywhere the player and blocks are not.
pub(crate) fn random_layout<R>(
    grid: GridSize,
    block_count: usize,
    rng: &mut R,
) -> Result<Layout, LayoutError>
where
    R: Rng + ?Sized,
{
    if grid.columns() < MIN_GRID_DIMENSION || grid.rows() < MIN_GRID_DIMENSION {
        return Err(too_small(grid));
    }
    if block_count == 0 {
        return Err(LayoutError::NoBlocks);
    }

    let all_cells: Vec<CellCoord> = grid.cells().collect();
    let player = all_cells[rng.gen_range(0..all_cells.len())];

    let mut interior: Vec<CellCoord> = all_cells
        .iter()
        .copied()
        .filter(|cell| grid.is_interior(*cell) && *cell != player)
        .collect();
    if interior.len() < block_count {
        return Err(too_small(grid));
    }
    interior.shuffle(rng);

    let mut blocks: Vec<CellCoord> = Vec::with_capacity(block_count);
    let mut crowded = Vec::new();
    for cell in interior {
        if blocks.len() == block_count {
            break;
        }
        if closes_square(&blocks, cell) {
            crowded.push(cell);
        } else {
            blocks.push(cell);
        }
    }
    let shortfall = block_count - blocks.len();
    blocks.extend(crowded.into_iter().take(shortfall));
    blocks.sort_unstable();

    let remaining: Vec<CellCoord> = all_cells
        .iter()
        .copied()
        .filter(|cell| *cell != player && blocks.binary_search(cell).is_err())
        .collect();
    if remaining.len() < block_count {
        return Err(too_small(grid));
    }
    let mut targets: Vec<CellCoord> = remaining
        .choose_multiple(rng, block_count)
        .copied()
        .collect();
    targets.sort_unstable();

    Ok(Layout {
        grid,
        player,
        blocks,
        targets,
    })
}

/// Whether `cell` would complete a 2x2 square together with `blocks`.
fn closes_square(blocks: &[CellCoord], cell: CellCoord) -> bool {
    const SQUARE: [(u32, u32); 4] = [(0, 0), (1, 0), (0, 1), (1, 1)];
    SQUARE.into_iter().any(|(dc, dr)| {
        let (Some(left), Some(top)) = (cell.column().checked_sub(dc), cell.row().checked_sub(dr))
        else {
            return false;
        };
        SQUARE.into_iter().all(|(c, r)| {
            let member = CellCoord::new(left + c, top + r);
            member == cell || blocks.contains(&member)
        })
    })
}

fn too_small(grid: GridSize) -> LayoutError {
    LayoutError::GridTooSmall {
        columns: grid.columns(),
        rows: grid.rows(),
    }
}

#[cfg(test)]
mod tests {
    use pushbox_core::{CellCoord, GridSize, LayoutError};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{closes_square, random_layout};

    #[test]
    fn layouts_are_valid_and_blocks_stay_off_borders() {
        let grid = GridSize::new(9, 9);
        for seed in 0..64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let layout = random_layout(grid, 3, &mut rng).expect("layout");
            assert_eq!(layout.validate(), Ok(()));
            assert!(layout.blocks.iter().all(|block| grid.is_interior(*block)));
            assert!(layout
                .targets
                .iter()
                .all(|target| !layout.blocks.contains(target) && *target != layout.player));
        }
    }

    #[test]
    fn crowded_blocks_avoid_squares_when_room_remains() {
        let grid = GridSize::new(6, 6);
        for seed in 0..128 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let layout = random_layout(grid, 5, &mut rng).expect("layout");
            assert_eq!(layout.blocks.len(), 5);
            for (index, block) in layout.blocks.iter().enumerate() {
                let mut others = layout.blocks.clone();
                let _ = others.remove(index);
                assert!(!closes_square(&others, *block), "seed {seed}: {layout:?}");
            }
        }
    }

    #[test]
    fn square_closure_needs_three_neighbours() {
        let blocks = [
            CellCoord::new(1, 1),
            CellCoord::new(2, 1),
            CellCoord::new(1, 2),
        ];
        assert!(closes_square(&blocks, CellCoord::new(2, 2)));
        assert!(!closes_square(&blocks[..2], CellCoord::new(2, 2)));
        assert!(!closes_square(&blocks, CellCoord::new(3, 3)));
        assert!(!closes_square(&[], CellCoord::new(0, 0)));
    }

    #[test]
    fn identical_seeds_produce_identical_layouts() {
        let grid = GridSize::new(7, 6);
        let first = random_layout(grid, 2, &mut ChaCha8Rng::seed_from_u64(11)).expect("layout");
        let second = random_layout(grid, 2, &mut ChaCha8Rng::seed_from_u64(11)).expect("layout");
        assert_eq!(first, second);
    }

    #[test]
    fn overfull_interior_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(
            random_layout(GridSize::new(3, 3), 2, &mut rng),
            Err(LayoutError::GridTooSmall {
                columns: 3,
                rows: 3
            })
        );
        assert_eq!(
            random_layout(GridSize::new(5, 5), 0, &mut rng),
            Err(LayoutError::NoBlocks)
        );
    }
}
