use bevy::prelude::*;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::block::{Controllable, Moveable, MovementState};
use crate::board::{orientation_of, BoardLayout};
use crate::config::BoardConfig;
use crate::direction::{CardinalDirection, Direction};
use crate::grid::{Coordinate, Grid, PlayAreaRef};
use crate::session::Session;
use crate::tetromino::{cells_fit, piece_cells, spawn_tetromino, Shape, Tetromino};

/// 7-bag randomizer: every shape once per bag, in shuffled order
#[derive(Debug)]
pub struct Bag {
    sequence: Vec<Shape>,
    rng: StdRng,
}

impl Bag {
    pub fn new(seed: u64) -> Self {
        Bag {
            sequence: Vec::with_capacity(Shape::ALL.len()),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Take the next shape, refilling and shuffling when the bag is empty
    pub fn pop_tetromino(&mut self) -> Shape {
        if self.sequence.is_empty() {
            self.sequence.extend_from_slice(&Shape::ALL);
            self.sequence.shuffle(&mut self.rng);
            trace!("bag refilled: {:?}", self.sequence);
        }
        self.sequence.remove(0)
    }

    /// Shapes left before the next refill
    pub fn remaining(&self) -> &[Shape] {
        &self.sequence
    }
}

/// Where an empty queue node pulls its next preview from
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum QueueSource {
    Bag,
    Node(Entity),
}

/// One preview slot in the chain feeding the spawn point
#[derive(Component, Debug, Clone)]
pub struct QueueNode {
    pub source: QueueSource,
    /// The preview piece parked here
    pub content: Option<Entity>,
    /// Pivot of the parked preview
    pub coordinate: Coordinate,
}

impl QueueNode {
    pub fn new(source: QueueSource, coordinate: Coordinate) -> Self {
        QueueNode {
            source,
            content: None,
            coordinate,
        }
    }
}

/// Hand the next preview to the spawn point, then shift the queue one step toward it
#[allow(clippy::too_many_arguments)]
pub fn generation_system(
    mut commands: Commands,
    config: Res<BoardConfig>,
    layout: Res<BoardLayout>,
    mut session: ResMut<Session>,
    mut bag: ResMut<Bag>,
    mut grid: ResMut<Grid>,
    play_areas: Query<&PlayAreaRef>,
    boards: Query<&CardinalDirection>,
    active: Query<Entity, With<Controllable>>,
    mut nodes: Query<&mut QueueNode>,
    mut pieces: Query<(&mut Moveable, &mut Tetromino)>,
) {
    if !session.live() {
        return;
    }

    let facing = orientation_of(layout.spawn_point.parent, &play_areas, &boards).current;

    // Spawn the next active piece if the board is waiting for one
    if active.iter().next().is_none() {
        let spawn_node = layout.spawn_node();
        let waiting = nodes
            .get_mut(spawn_node)
            .expect("spawn node is missing its QueueNode")
            .content;
        if let Some(piece) = waiting {
            let (mut moveable, mut tetromino) = pieces
                .get_mut(piece)
                .expect("queued preview is missing its piece components");

            // Pieces enter looking the same on screen whichever way the board faces
            let entry_facing = Direction::North.relative_to_board(facing);
            // Tall entry facings overhang the buffer top, those enter one row lower
            let lowered = grid
                .cell_at(layout.spawn_point)
                .and_then(|cell| grid.neighbor(cell, Direction::South))
                .map(|cell| grid.coordinate(cell));
            let entry = std::iter::once(layout.spawn_point)
                .chain(lowered)
                .find_map(|pivot| {
                    piece_cells(&grid, pivot, tetromino.shape, entry_facing).map(|cells| (pivot, cells))
                });
            let fits = entry
                .map(|(_, cells)| cells_fit(&grid, &cells, false, &tetromino.blocks))
                .unwrap_or(false);
            if !fits {
                warn!("spawn point blocked, game over with score {}", session.score);
                session.game_over = true;
                return;
            }

            moveable.desired = entry.map(|(pivot, _)| pivot).unwrap_or(layout.spawn_point);
            moveable.state = MovementState::Fall;
            tetromino.desired_facing = entry_facing;
            commands.entity(piece).insert(Controllable);
            nodes
                .get_mut(spawn_node)
                .expect("spawn node is missing its QueueNode")
                .content = None;
            debug!("{:?} piece {:?} enters play", tetromino.shape, piece);
        }
    }

    // Walk from the spawn end back to the bag, each empty node pulling one step downstream
    for node_entity in layout.queue.iter().rev() {
        let (source, empty, destination) = {
            let node = nodes
                .get_mut(*node_entity)
                .expect("queue entity is missing its QueueNode");
            (node.source, node.content.is_none(), node.coordinate)
        };
        if !empty {
            continue;
        }

        let pulled = match source {
            QueueSource::Node(upstream) => {
                let mut upstream = nodes
                    .get_mut(upstream)
                    .expect("queue source is missing its QueueNode");
                let content = upstream.content.take();
                if let Some(piece) = content {
                    if let Ok((mut moveable, _)) = pieces.get_mut(piece) {
                        moveable.desired = destination;
                    }
                }
                content
            }
            QueueSource::Bag => {
                let shape = bag.pop_tetromino();
                spawn_tetromino(
                    &mut commands,
                    &mut grid,
                    shape,
                    destination,
                    Direction::North,
                    MovementState::Unmoving,
                    config.lockdown_delay,
                    true,
                )
            }
        };

        nodes
            .get_mut(*node_entity)
            .expect("queue entity is missing its QueueNode")
            .content = pulled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_window_of_seven_is_a_full_set() {
        let mut bag = Bag::new(7);
        for _ in 0..20 {
            let mut seen: Vec<Shape> = (0..7).map(|_| bag.pop_tetromino()).collect();
            seen.sort_by_key(|s| *s as usize);
            assert_eq!(seen, Shape::ALL.to_vec());
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Bag::new(1234);
        let mut b = Bag::new(1234);
        let first: Vec<Shape> = (0..21).map(|_| a.pop_tetromino()).collect();
        let second: Vec<Shape> = (0..21).map(|_| b.pop_tetromino()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn remaining_shrinks_until_refill() {
        let mut bag = Bag::new(3);
        assert!(bag.remaining().is_empty());
        bag.pop_tetromino();
        assert_eq!(bag.remaining().len(), 6);
        for _ in 0..6 {
            bag.pop_tetromino();
        }
        assert!(bag.remaining().is_empty());
    }
}
