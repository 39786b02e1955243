use bevy::prelude::*;

use crate::block::{
    Block, BlockLocked, Collapse, Controllable, Follower, Moveable, MovementState, Obstructable,
};
use crate::board::{gravity_at, piece_gravity};
use crate::direction::CardinalDirection;
use crate::grid::{ContainerTag, Grid, PlayAreaRef};
use crate::session::{Session, SimClock};
use crate::tetromino::{piece_cells, Tetromino};

/// Decide which falling things are resting, and lock the ones that have rested long enough
///
/// A piece is grounded while any of its blocks has no free cell beneath it. Every member then
/// starts its lockdown timer; the piece locks once all members are due. Hard drops lock on the
/// tick they land. Loose blocks use the same timer, except collapsing terrain that has used
/// up its rows, which locks straight away. Terrain still owed rows is on its way down, so it
/// never holds anything up.
#[allow(clippy::too_many_arguments)]
pub fn state_change_system(
    mut commands: Commands,
    clock: Res<SimClock>,
    grid: Res<Grid>,
    mut session: ResMut<Session>,
    mut locked: EventWriter<BlockLocked>,
    play_areas: Query<&PlayAreaRef>,
    boards: Query<&CardinalDirection>,
    mut pieces: Query<(Entity, &mut Moveable, &Tetromino), Without<Block>>,
    mut blocks: Query<
        (
            Entity,
            &mut Moveable,
            &mut Obstructable,
            Option<&Follower>,
            Option<&Collapse>,
        ),
        With<Block>,
    >,
) {
    if !session.live() {
        return;
    }
    let now = clock.now;

    let sinking: Vec<Entity> = blocks
        .iter()
        .filter(|(_, moveable, _, follower, collapse)| {
            follower.is_none()
                && moveable.state == MovementState::Fall
                && collapse.map_or(true, |c| c.rows > 0)
        })
        .map(|(entity, _, _, _, _)| entity)
        .collect();

    for (piece, mut moveable, tetromino) in pieces.iter_mut() {
        let lock = match moveable.state {
            MovementState::Fall | MovementState::SoftDrop => {
                let cells = piece_cells(&grid, moveable.current, tetromino.shape, tetromino.facing)
                    .expect("active piece sits on cells that do not exist");
                let down = match piece_gravity(&grid, &cells, &play_areas, &boards) {
                    Some(down) => down,
                    None => continue,
                };
                let mut ignore = tetromino.blocks.to_vec();
                ignore.extend(sinking.iter().copied());
                let grounded = cells
                    .iter()
                    .any(|cell| !grid.can_occupy_cell_ignoring(grid.neighbor(*cell, down), false, &ignore));

                let mut all_due = true;
                for block in tetromino.blocks.iter() {
                    let (_, _, mut obstructable, _, _) = blocks
                        .get_mut(*block)
                        .expect("piece member is missing its block components");
                    if grounded {
                        obstructable.obstruct(now);
                    } else {
                        obstructable.clear();
                    }
                    all_due &= obstructable.lockdown_due(now);
                }
                grounded && all_due
            }
            MovementState::HardDrop => true,
            MovementState::DebugMoveUp => {
                moveable.state = MovementState::Fall;
                false
            }
            _ => false,
        };
        if !lock {
            continue;
        }

        moveable.state = MovementState::Locked;
        let mut lock_out = false;
        for block in tetromino.blocks.iter() {
            let (_, mut block_moveable, mut obstructable, _, _) = blocks
                .get_mut(*block)
                .expect("piece member is missing its block components");
            block_moveable.state = MovementState::Locked;
            obstructable.obstruct(now);
            lock_out |= grid.tag_of(block_moveable.current) == Some(ContainerTag::Buffer);
            locked.send(BlockLocked {
                block: *block,
                coordinate: block_moveable.current,
            });
        }
        commands.entity(piece).remove::<Controllable>();
        debug!("{:?} piece {:?} locked at {:?}", tetromino.shape, piece, moveable.current);

        if lock_out {
            warn!("piece locked above the matrix, game over with score {}", session.score);
            session.game_over = true;
        }
    }

    for (entity, mut moveable, mut obstructable, follower, collapse) in blocks.iter_mut() {
        if follower.is_some() || moveable.state != MovementState::Fall {
            continue;
        }
        let settled = collapse.map_or(false, |c| c.rows == 0);
        let below = gravity_at(&grid, moveable.current, &play_areas, &boards)
            .and_then(|down| grid.neighbor(grid.cell_at(moveable.current)?, down));
        let blocked = !grid.can_occupy_cell_ignoring(below, false, &sinking);

        if blocked {
            obstructable.obstruct(now);
        } else {
            obstructable.clear();
        }
        if settled || (blocked && obstructable.lockdown_due(now)) {
            moveable.state = MovementState::Locked;
            obstructable.obstruct(now);
            commands.entity(entity).remove::<Collapse>();
            locked.send(BlockLocked {
                block: entity,
                coordinate: moveable.current,
            });
        }
    }
}

/// Locked pieces dissolve into loose terrain blocks
pub fn detach_system(
    mut commands: Commands,
    pieces: Query<(Entity, &Moveable, &Tetromino), Without<Block>>,
) {
    for (piece, moveable, tetromino) in pieces.iter() {
        if moveable.state != MovementState::Locked {
            continue;
        }
        for block in tetromino.blocks.iter() {
            commands.entity(*block).remove::<Follower>();
        }
        commands.entity(piece).despawn();
    }
}
