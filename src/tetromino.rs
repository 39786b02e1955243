use bevy::prelude::*;

use crate::block::{Block, Follower, Moveable, MovementState, Obstructable};
use crate::direction::{Direction, Rotation, ScreenDirection};
use crate::grid::{CellId, Coordinate, Grid};

/// The different types of tetromino we can have
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    I = 0,
    O = 1,
    T = 2,
    S = 3,
    Z = 4,
    L = 5,
    J = 6,
}

impl Shape {
    pub const ALL: [Shape; 7] = [
        Shape::I,
        Shape::O,
        Shape::T,
        Shape::S,
        Shape::Z,
        Shape::L,
        Shape::J,
    ];

    /// Offsets (dx, dy) of the four blocks from the pivot, y up
    pub fn pattern(self, facing: Direction) -> [(i32, i32); 4] {
        Tetromino::PATTERNS[self as usize][facing.index()]
    }
}

/// A piece made of four blocks that follow its pivot
#[derive(Component, Debug, Clone)]
pub struct Tetromino {
    pub shape: Shape,
    pub facing: Direction,
    pub desired_facing: Direction,
    pub blocks: [Entity; 4],
}

/// The blocks within each type of tetromino, per facing (N, E, S, W)
/// Initial presentation is 'flat side down'; each facing is the previous one turned clockwise
/// about the pivot at (0, 0), which every pattern contains.
impl Tetromino {
    #[rustfmt::skip]
    pub const PATTERNS: [[[(i32, i32); 4]; 4]; 7] = [
        // I
        [
            [(-1, 0), (0, 0), (1, 0), (2, 0)],
            [(0, 1), (0, 0), (0, -1), (0, -2)],
            [(1, 0), (0, 0), (-1, 0), (-2, 0)],
            [(0, -1), (0, 0), (0, 1), (0, 2)],
        ],
        // O, does not turn
        [
            [(0, 0), (1, 0), (0, 1), (1, 1)],
            [(0, 0), (1, 0), (0, 1), (1, 1)],
            [(0, 0), (1, 0), (0, 1), (1, 1)],
            [(0, 0), (1, 0), (0, 1), (1, 1)],
        ],
        // T
        [
            [(-1, 0), (0, 0), (1, 0), (0, 1)],
            [(0, 1), (0, 0), (0, -1), (1, 0)],
            [(1, 0), (0, 0), (-1, 0), (0, -1)],
            [(0, -1), (0, 0), (0, 1), (-1, 0)],
        ],
        // S
        [
            [(-1, 0), (0, 0), (0, 1), (1, 1)],
            [(0, 1), (0, 0), (1, 0), (1, -1)],
            [(1, 0), (0, 0), (0, -1), (-1, -1)],
            [(0, -1), (0, 0), (-1, 0), (-1, 1)],
        ],
        // Z
        [
            [(-1, 1), (0, 1), (0, 0), (1, 0)],
            [(1, 1), (1, 0), (0, 0), (0, -1)],
            [(1, -1), (0, -1), (0, 0), (-1, 0)],
            [(-1, -1), (-1, 0), (0, 0), (0, 1)],
        ],
        // L
        [
            [(1, 1), (-1, 0), (0, 0), (1, 0)],
            [(1, -1), (0, 1), (0, 0), (0, -1)],
            [(-1, -1), (1, 0), (0, 0), (-1, 0)],
            [(-1, 1), (0, -1), (0, 0), (0, 1)],
        ],
        // J
        [
            [(-1, 1), (-1, 0), (0, 0), (1, 0)],
            [(1, 1), (0, 1), (0, 0), (0, -1)],
            [(1, -1), (1, 0), (0, 0), (-1, 0)],
            [(-1, -1), (0, -1), (0, 0), (0, 1)],
        ],
    ];

    /// Pivot nudges tried in order when a turn does not fit in place, in screen terms
    pub const KICKS: [(ScreenDirection, u32); 6] = [
        (ScreenDirection::Up, 0),
        (ScreenDirection::Left, 1),
        (ScreenDirection::Right, 1),
        (ScreenDirection::Up, 1),
        (ScreenDirection::Left, 2),
        (ScreenDirection::Right, 2),
    ];

    pub fn new(shape: Shape, facing: Direction, blocks: [Entity; 4]) -> Self {
        Tetromino {
            shape,
            facing,
            desired_facing: facing,
            blocks,
        }
    }

    pub fn wants_to_turn(&self) -> bool {
        self.facing != self.desired_facing
    }

    /// Queue a turn; applied (or refused) by the next movement pass
    pub fn rotate(&mut self, rotation: Rotation) {
        if self.shape == Shape::O {
            return;
        }
        self.desired_facing = self.desired_facing.rotated(rotation);
    }
}

/// The four cells a piece covers with its pivot at `pivot` and the given facing
///
/// Offsets are walked through the cell graph, so a piece can straddle linked containers.
/// `None` if any block would fall off the graph.
pub fn piece_cells(
    grid: &Grid,
    pivot: Coordinate,
    shape: Shape,
    facing: Direction,
) -> Option<[CellId; 4]> {
    let origin = grid.cell_at(pivot)?;
    let pattern = shape.pattern(facing);
    let mut cells = [origin; 4];
    for (cell, (dx, dy)) in cells.iter_mut().zip(pattern.iter()) {
        *cell = grid.offset(origin, *dx, *dy)?;
    }
    Some(cells)
}

/// Can the piece sit on these cells? Cells held by `own_blocks` count as free.
pub fn cells_fit(grid: &Grid, cells: &[CellId; 4], disable_obstruction: bool, own_blocks: &[Entity]) -> bool {
    cells
        .iter()
        .all(|cell| grid.can_occupy_cell_ignoring(Some(*cell), disable_obstruction, own_blocks))
}

/// Spawn a piece and its four follower blocks, claiming their cells
///
/// Returns `None` if the pattern does not fit at `pivot`; with `disable_obstruction` only
/// the graph edges are checked.
#[allow(clippy::too_many_arguments)]
pub fn spawn_tetromino(
    commands: &mut Commands,
    grid: &mut Grid,
    shape: Shape,
    pivot: Coordinate,
    facing: Direction,
    state: MovementState,
    lockdown_delay: f64,
    disable_obstruction: bool,
) -> Option<Entity> {
    let cells = piece_cells(grid, pivot, shape, facing)?;
    if !cells_fit(grid, &cells, disable_obstruction, &[]) {
        return None;
    }

    let piece = commands.spawn().id();
    let mut blocks = [piece; 4];
    for (index, cell) in cells.iter().enumerate() {
        let at = grid.coordinate(*cell);
        blocks[index] = commands
            .spawn()
            .insert(Block)
            .insert(at)
            .insert(Moveable::new(at, MovementState::Following))
            .insert(Obstructable::new(lockdown_delay))
            .insert(Follower { piece, index })
            .id();
        grid.occupy(*cell, blocks[index]);
    }

    commands
        .entity(piece)
        .insert(Tetromino::new(shape, facing, blocks))
        .insert(Moveable::new(pivot, state));
    debug!("spawned {:?} piece {:?} at {:?}", shape, piece, pivot);
    Some(piece)
}
