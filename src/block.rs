use bevy::prelude::*;

use crate::grid::{Coordinate, Grid};

// ========================================
// Components

/// Base entity, everything is made out of blocks
#[derive(Component, Debug, Clone)]
pub struct Block;

/// Where an entity is going in its movement state machine
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MovementState {
    Unmoving,
    Following,
    Fall,
    DebugMoveUp,
    SoftDrop,
    HardDrop,
    Locked,
}

/// Current and desired position of a block, or of a piece's pivot
#[derive(Component, Debug, Copy, Clone, PartialEq)]
pub struct Moveable {
    pub current: Coordinate,
    pub desired: Coordinate,
    pub state: MovementState,
}

impl Moveable {
    pub fn new(at: Coordinate, state: MovementState) -> Self {
        Moveable {
            current: at,
            desired: at,
            state,
        }
    }

    pub fn wants_to_move(&self) -> bool {
        self.current != self.desired
    }
}

/// Obstruction bookkeeping for lockdown
#[derive(Component, Debug, Copy, Clone, PartialEq)]
pub struct Obstructable {
    pub obstructed: bool,
    /// Clock time the current obstruction began
    pub since: f64,
    pub lockdown_delay: f64,
}

impl Obstructable {
    pub fn new(lockdown_delay: f64) -> Self {
        Obstructable {
            obstructed: false,
            since: 0.0,
            lockdown_delay,
        }
    }

    /// Record an obstruction, keeping the first start time if it is ongoing
    pub fn obstruct(&mut self, now: f64) {
        if !self.obstructed {
            self.obstructed = true;
            self.since = now;
        }
    }

    pub fn clear(&mut self) {
        self.obstructed = false;
    }

    pub fn lockdown_due(&self, now: f64) -> bool {
        self.obstructed && now >= self.since + self.lockdown_delay
    }
}

/// Marker for blocks matched by the pattern pass and due for elimination
#[derive(Component, Debug)]
pub struct Hittable;

/// Marker for the piece that takes player input
#[derive(Component, Debug)]
pub struct Controllable;

/// A block owned by a piece. Its position is the piece pivot plus the pattern offset at `index`.
#[derive(Component, Debug, Copy, Clone)]
pub struct Follower {
    pub piece: Entity,
    pub index: usize,
}

/// Rows a terrain block still has to fall after a line clear
#[derive(Component, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Collapse {
    pub rows: u32,
}

// ========================================
// Events

/// Sent once for every block that locks into terrain
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BlockLocked {
    pub block: Entity,
    pub coordinate: Coordinate,
}

// ========================================
// Spawning

/// Spawn a standalone block and claim its cell
///
/// Returns `None` if the coordinate is off the grid or the cell is taken.
pub fn spawn_block(
    commands: &mut Commands,
    grid: &mut Grid,
    at: Coordinate,
    state: MovementState,
    lockdown_delay: f64,
) -> Option<Entity> {
    let cell = grid.cell_at(at)?;
    if !grid.can_occupy_cell(Some(cell), false) {
        return None;
    }

    let entity = commands
        .spawn()
        .insert(Block)
        .insert(at)
        .insert(Moveable::new(at, state))
        .insert(Obstructable::new(lockdown_delay))
        .id();
    grid.occupy(cell, entity);
    Some(entity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obstruction_keeps_first_timestamp() {
        let mut obstructable = Obstructable::new(0.5);
        assert!(!obstructable.lockdown_due(10.0));

        obstructable.obstruct(1.0);
        obstructable.obstruct(1.3);
        assert_eq!(obstructable.since, 1.0);
        assert!(!obstructable.lockdown_due(1.49));
        assert!(obstructable.lockdown_due(1.5));

        obstructable.clear();
        assert!(!obstructable.lockdown_due(2.0));
        obstructable.obstruct(2.0);
        assert_eq!(obstructable.since, 2.0);
    }
}
