use bevy::prelude::*;

use crate::direction::{CardinalDirection, Rotation};
use crate::tetromino::Tetromino;

/// Ask the board to turn a quarter. Nothing moves until [`board_rotation_system`] commits it.
pub fn rotate_board(orientation: &mut CardinalDirection, rotation: Rotation) {
    orientation.desired = orientation.desired.rotated(rotation);
}

/// Turn the board and counter-turn the active piece so it keeps its on-screen look
///
/// The piece turn goes through the normal movement pass, kicks included; if it does not fit
/// the piece simply keeps its board-frame facing.
pub fn turn_board_with_piece(
    orientation: &mut CardinalDirection,
    active: Option<&mut Tetromino>,
    rotation: Rotation,
) {
    rotate_board(orientation, rotation);
    if let Some(tetromino) = active {
        tetromino.rotate(rotation.reversed());
    }
}

/// Commit requested board turns
///
/// Only the orientation changes. Cell coordinates stay put, gravity and line direction follow
/// from the new orientation.
pub fn board_rotation_system(mut orientation: Query<&mut CardinalDirection>) {
    for mut orientation in orientation.iter_mut() {
        if orientation.current != orientation.desired {
            info!(
                "board turned from {:?} to {:?}, gravity now {:?}",
                orientation.current,
                orientation.desired,
                CardinalDirection {
                    current: orientation.desired,
                    desired: orientation.desired,
                }
                .down()
            );
            orientation.current = orientation.desired;
        }
    }
}
