use bevy::prelude::*;

use crate::bag::QueueNode;
use crate::block::{Block, Controllable, Moveable, MovementState};
use crate::config::BoardConfig;
use crate::direction::{CardinalDirection, Direction, Rotation, ScreenDirection};
use crate::grid::{Coordinate, Grid, PlayAreaRef};
use crate::pattern::MatchedLines;
use crate::rotation::turn_board_with_piece;
use crate::session::{Session, SimClock};
use crate::tetromino::{cells_fit, piece_cells, Tetromino};

/// Player intent, already mapped from whatever device produced it
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    /// Shift the active piece one cell as seen on screen
    Move(ScreenDirection),
    /// Turn the active piece
    Rotate(Rotation),
    /// Start (`true`) or stop soft dropping
    SoftDrop(bool),
    HardDrop,
    /// Nudge the active piece one cell against gravity
    DebugMoveUp,
    /// Turn the whole board a quarter
    RotateBoard(Rotation),
    TogglePause,
    Restart,
}

/// Flag resource: the board is reset at the start of the next restart pass
pub struct Restart;

/// Shift the piece's desired pivot one cell toward `direction`
///
/// Returns false, leaving the piece where it was headed, when there is no cell that way or
/// the piece would not fit there. Several moves in one tick therefore stop at the first
/// obstruction instead of jumping over it.
pub fn move_piece(grid: &Grid, moveable: &mut Moveable, tetromino: &Tetromino, direction: Direction) -> bool {
    let next = grid
        .cell_at(moveable.desired)
        .and_then(|cell| grid.neighbor(cell, direction))
        .map(|cell| grid.coordinate(cell));
    let fits = next
        .and_then(|next| piece_cells(grid, next, tetromino.shape, tetromino.facing))
        .map_or(false, |cells| cells_fit(grid, &cells, false, &tetromino.blocks));
    match next {
        Some(next) if fits => {
            moveable.desired = next;
            true
        }
        _ => false,
    }
}

/// Queue a turn of the piece
pub fn rotate_piece(tetromino: &mut Tetromino, rotation: Rotation) {
    tetromino.rotate(rotation);
}

fn steerable(state: MovementState) -> bool {
    matches!(state, MovementState::Fall | MovementState::SoftDrop)
}

/// Turn control events into desired state on the active piece, the board and the session
pub fn control_system(
    mut commands: Commands,
    mut events: EventReader<ControlEvent>,
    clock: Res<SimClock>,
    grid: Res<Grid>,
    mut session: ResMut<Session>,
    play_areas: Query<&PlayAreaRef>,
    mut boards: Query<&mut CardinalDirection>,
    mut active: Query<(&mut Moveable, &mut Tetromino), With<Controllable>>,
) {
    for event in events.iter() {
        trace!("control {:?}", event);

        match event {
            ControlEvent::Restart => {
                commands.insert_resource(Restart);
                continue;
            }
            ControlEvent::TogglePause => {
                if !session.game_over {
                    session.paused = !session.paused;
                    if !session.paused {
                        // Gravity restarts its count from the moment play resumes
                        session.last_fall_update = clock.now;
                    }
                    info!("{}", if session.paused { "paused" } else { "resumed" });
                }
                continue;
            }
            _ if !session.live() => continue,
            _ => {}
        }

        let mut piece = active.iter_mut().next();
        // The board under the active piece, or the only one there is
        let board = piece
            .as_ref()
            .and_then(|(moveable, _)| play_areas.get(moveable.current.parent).ok())
            .map(|play_area| play_area.0);
        let facing = board
            .and_then(|board| boards.get(board).ok())
            .map(|orientation| orientation.current)
            .unwrap_or(Direction::North);

        match *event {
            ControlEvent::Move(ScreenDirection::Up) => {}
            ControlEvent::Move(direction) => {
                if let Some((moveable, tetromino)) = piece.as_mut() {
                    if steerable(moveable.state) {
                        move_piece(&grid, moveable, tetromino, direction.on_board(facing));
                    }
                }
            }
            ControlEvent::Rotate(rotation) => {
                if let Some((moveable, tetromino)) = piece.as_mut() {
                    if steerable(moveable.state) {
                        rotate_piece(tetromino, rotation);
                    }
                }
            }
            ControlEvent::SoftDrop(on) => {
                if let Some((moveable, _)) = piece.as_mut() {
                    moveable.state = match (moveable.state, on) {
                        (MovementState::Fall, true) => MovementState::SoftDrop,
                        (MovementState::SoftDrop, false) => MovementState::Fall,
                        (state, _) => state,
                    };
                }
            }
            ControlEvent::HardDrop => {
                if let Some((moveable, _)) = piece.as_mut() {
                    if steerable(moveable.state) {
                        moveable.state = MovementState::HardDrop;
                    }
                }
            }
            ControlEvent::DebugMoveUp => {
                if let Some((moveable, _)) = piece.as_mut() {
                    if steerable(moveable.state) {
                        moveable.state = MovementState::DebugMoveUp;
                    }
                }
            }
            ControlEvent::RotateBoard(rotation) => {
                let target = match board {
                    Some(board) => boards.get_mut(board).ok(),
                    None => boards.iter_mut().next(),
                };
                if let Some(mut target) = target {
                    let tetromino = piece.as_mut().map(|(_, tetromino)| &mut **tetromino);
                    turn_board_with_piece(&mut target, tetromino, rotation);
                }
            }
            ControlEvent::Restart | ControlEvent::TogglePause => {}
        }
    }
}

/// Clear the board and start a fresh session when a [`Restart`] is pending
#[allow(clippy::too_many_arguments)]
pub fn restart_system(
    mut commands: Commands,
    restart: Option<Res<Restart>>,
    config: Res<BoardConfig>,
    clock: Res<SimClock>,
    mut session: ResMut<Session>,
    mut grid: ResMut<Grid>,
    mut matched: ResMut<MatchedLines>,
    pieces: Query<Entity, Or<(With<Block>, With<Tetromino>)>>,
    mut nodes: Query<&mut QueueNode>,
    mut orientation: Query<&mut CardinalDirection>,
) {
    if restart.is_none() {
        return;
    }
    // Clear the restart flag
    commands.remove_resource::<Restart>();

    for entity in pieces.iter() {
        commands.entity(entity).despawn();
    }
    grid.clear_occupants();
    for mut node in nodes.iter_mut() {
        node.content = None;
    }
    for mut board in orientation.iter_mut() {
        *board = CardinalDirection::default();
    }
    matched.lines.clear();

    *session = Session::new(&config);
    session.last_fall_update = clock.now;
    info!("restarted");
}

/// Compare the grid's occupancy with where the blocks think they are
pub fn verify_occupancy_system(grid: Res<Grid>, blocks: Query<(Entity, &Coordinate), With<Block>>) {
    for problem in grid.occupancy_mismatches(blocks.iter()) {
        warn!("{}", problem);
    }
}
