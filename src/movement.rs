use bevy::prelude::*;

use crate::block::{Block, Collapse, Follower, Moveable, MovementState};
use crate::board::{gravity_at, orientation_of, piece_gravity};
use crate::config::BoardConfig;
use crate::direction::{CardinalDirection, Direction};
use crate::grid::{CellId, Coordinate, Grid, PlayAreaRef};
use crate::session::{Session, SimClock};
use crate::tetromino::{cells_fit, piece_cells, Tetromino};

/// Point `desired` one cell past `current` toward `direction`, if that cell exists
///
/// Occupancy is left to the movement pass, only the edge of the graph stops the step here.
fn step(grid: &Grid, moveable: &mut Moveable, direction: Direction) {
    if let Some(cell) = grid.cell_at(moveable.current) {
        let next = grid.move_in_direction(cell, direction, 1, true, &[]);
        moveable.desired = grid.coordinate(next);
    }
}

/// Follow gravity from `pivot` one cell at a time until the piece would hit something
///
/// Gravity is looked up again after every cell, so a piece leaving the buffer turns toward
/// whichever wall the matrix treats as down. Returns the landing pivot and the cells travelled.
pub fn drop_path(
    grid: &Grid,
    tetromino: &Tetromino,
    pivot: Coordinate,
    limit: u32,
    play_areas: &Query<&PlayAreaRef>,
    boards: &Query<&CardinalDirection>,
) -> (Coordinate, u32) {
    let shape = tetromino.shape;
    let facing = tetromino.desired_facing;
    let mut at = pivot;
    let mut travelled = 0;

    while travelled < limit {
        let cells = match piece_cells(grid, at, shape, facing) {
            Some(cells) => cells,
            None => break,
        };
        let down = match piece_gravity(grid, &cells, play_areas, boards) {
            Some(down) => down,
            None => break,
        };
        let next = grid
            .cell_at(at)
            .and_then(|cell| grid.neighbor(cell, down))
            .map(|cell| grid.coordinate(cell));
        let fits = next
            .and_then(|next| piece_cells(grid, next, shape, facing))
            .map_or(false, |cells| cells_fit(grid, &cells, false, &tetromino.blocks));
        match next {
            Some(next) if fits => {
                at = next;
                travelled += 1;
            }
            _ => break,
        }
    }
    (at, travelled)
}

/// Advance desired coordinates for everything that falls, soft drops, hard drops or debug-moves
///
/// Plain falling is gated by the shared fall timer in [`Session`]; soft drop steps every tick.
/// Entities that already have a move or turn pending this tick wait for the next step.
#[allow(clippy::too_many_arguments)]
pub fn falling_system(
    clock: Res<SimClock>,
    config: Res<BoardConfig>,
    grid: Res<Grid>,
    mut session: ResMut<Session>,
    play_areas: Query<&PlayAreaRef>,
    boards: Query<&CardinalDirection>,
    mut pieces: Query<(&mut Moveable, &mut Tetromino), Without<Block>>,
    mut blocks: Query<(&mut Moveable, Option<&Collapse>), (With<Block>, Without<Follower>)>,
) {
    if !session.live() {
        return;
    }

    let now = clock.now;
    let fall_tick = session.fall_due(now);
    if fall_tick {
        session.last_fall_update = now;
    }

    for (mut moveable, mut tetromino) in pieces.iter_mut() {
        let down = piece_cells(&grid, moveable.current, tetromino.shape, tetromino.facing)
            .and_then(|cells| piece_gravity(&grid, &cells, &play_areas, &boards));
        let down = match down {
            Some(down) => down,
            None => continue,
        };
        let pending = moveable.wants_to_move() || tetromino.wants_to_turn();

        match moveable.state {
            MovementState::Fall if fall_tick && !pending => step(&grid, &mut moveable, down),
            MovementState::SoftDrop if !pending => step(&grid, &mut moveable, down),
            MovementState::DebugMoveUp if !pending => step(&grid, &mut moveable, down.opposite()),
            MovementState::HardDrop => {
                // Keep a pending move or turn if it fits, otherwise drop from where the piece is
                let pending_fits = piece_cells(&grid, moveable.desired, tetromino.shape, tetromino.desired_facing)
                    .map_or(false, |cells| cells_fit(&grid, &cells, false, &tetromino.blocks));
                if !pending_fits {
                    moveable.desired = moveable.current;
                    tetromino.desired_facing = tetromino.facing;
                }

                let limit = config.matrix_height + 2 * config.buffer_depth;
                let (landing, travelled) =
                    drop_path(&grid, &tetromino, moveable.desired, limit, &play_areas, &boards);
                moveable.desired = landing;
                session.score += travelled as u64;
                debug!("hard drop {:?} by {} cells", tetromino.shape, travelled);
            }
            _ => {}
        }
    }

    if !fall_tick {
        return;
    }
    for (mut moveable, collapse) in blocks.iter_mut() {
        if moveable.state != MovementState::Fall || moveable.wants_to_move() {
            continue;
        }
        if collapse.map_or(false, |c| c.rows == 0) {
            continue;
        }
        if let Some(down) = gravity_at(&grid, moveable.current, &play_areas, &boards) {
            step(&grid, &mut moveable, down);
        }
    }
}

/// Where a piece ends up after its pending move and turn, if anywhere
///
/// A turn is tried in place and then with each kick; if none fits the turn is dropped and the
/// plain move is tried. `None` means the piece stays exactly where it is.
fn resolve_piece(
    grid: &Grid,
    moveable: &Moveable,
    tetromino: &Tetromino,
    orientation: &CardinalDirection,
) -> Option<(Coordinate, Direction, [CellId; 4])> {
    let disable_obstruction = moveable.state == MovementState::Unmoving;
    let target = grid.cell_at(moveable.desired)?;

    if tetromino.wants_to_turn() {
        for (kick, distance) in Tetromino::KICKS.iter() {
            let pivot = match grid.walk(target, kick.on_board(orientation.current), *distance) {
                Some(pivot) => grid.coordinate(pivot),
                None => continue,
            };
            if let Some(cells) = piece_cells(grid, pivot, tetromino.shape, tetromino.desired_facing) {
                if cells_fit(grid, &cells, disable_obstruction, &tetromino.blocks) {
                    return Some((pivot, tetromino.desired_facing, cells));
                }
            }
        }
        trace!("{:?} turn to {:?} refused", tetromino.shape, tetromino.desired_facing);
    }

    if moveable.desired == moveable.current {
        return None;
    }
    let cells = piece_cells(grid, moveable.desired, tetromino.shape, tetromino.facing)?;
    cells_fit(grid, &cells, disable_obstruction, &tetromino.blocks)
        .then(|| (moveable.desired, tetromino.facing, cells))
}

/// Apply desired coordinates, all-or-nothing per piece and block-by-block for loose blocks
#[allow(clippy::too_many_arguments)]
pub fn movement_system(
    mut grid: ResMut<Grid>,
    session: Res<Session>,
    play_areas: Query<&PlayAreaRef>,
    boards: Query<&CardinalDirection>,
    mut pieces: Query<(Entity, &mut Moveable, &mut Tetromino), Without<Block>>,
    mut followers: Query<(&mut Moveable, &mut Coordinate), (With<Block>, With<Follower>)>,
    mut standalone: Query<
        (Entity, &mut Moveable, &mut Coordinate, Option<&mut Collapse>),
        (With<Block>, Without<Follower>),
    >,
) {
    if session.paused {
        return;
    }
    for (piece, mut moveable, mut tetromino) in pieces.iter_mut() {
        if !moveable.wants_to_move() && !tetromino.wants_to_turn() {
            continue;
        }

        let orientation = orientation_of(moveable.current.parent, &play_areas, &boards);
        match resolve_piece(&grid, &moveable, &tetromino, &orientation) {
            Some((pivot, facing, cells)) => {
                // Release every old cell first, the new footprint may overlap it
                for block in tetromino.blocks.iter() {
                    if let Ok((_, coordinate)) = followers.get_mut(*block) {
                        if let Some(old) = grid.cell_at(*coordinate) {
                            grid.vacate(old, *block);
                        }
                    }
                }
                for (block, cell) in tetromino.blocks.iter().zip(cells.iter()) {
                    let at = grid.coordinate(*cell);
                    grid.occupy(*cell, *block);
                    let (mut block_moveable, mut coordinate) = followers
                        .get_mut(*block)
                        .expect("piece member is missing its follower components");
                    *coordinate = at;
                    block_moveable.current = at;
                    block_moveable.desired = at;
                }
                moveable.current = pivot;
                moveable.desired = pivot;
                tetromino.facing = facing;
                tetromino.desired_facing = facing;
                trace!("piece {:?} now at {:?} facing {:?}", piece, pivot, facing);
            }
            None => {
                moveable.desired = moveable.current;
                tetromino.desired_facing = tetromino.facing;
            }
        }
    }

    // Loose blocks move leading edge first so the ones behind can follow into the freed cells
    let mut moving: Vec<(i64, Entity)> = standalone
        .iter()
        .filter(|(_, moveable, _, _)| moveable.wants_to_move())
        .map(|(entity, moveable, coordinate, _)| {
            let key = gravity_at(&grid, moveable.current, &play_areas, &boards)
                .map(|down| down.leading_key(coordinate.x, coordinate.y))
                .unwrap_or(0);
            (key, entity)
        })
        .collect();
    moving.sort();

    for (_, entity) in moving {
        let (_, mut moveable, mut coordinate, collapse) = standalone
            .get_mut(entity)
            .expect("moving block vanished mid-pass");
        let target = grid.cell_at(moveable.desired);
        if !grid.can_occupy_cell(target, false) {
            moveable.desired = moveable.current;
            continue;
        }
        let target = target.expect("occupiable cell must exist");
        if let Some(old) = grid.cell_at(*coordinate) {
            grid.vacate(old, entity);
        }
        grid.occupy(target, entity);
        *coordinate = moveable.desired;
        moveable.current = moveable.desired;
        if let Some(mut collapse) = collapse {
            collapse.rows = collapse.rows.saturating_sub(1);
        }
    }
}
