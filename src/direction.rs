use bevy::prelude::*;

/// Compass direction in board coordinates. North is +y, east is +x.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

/// A discrete 90° turn
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

/// A direction as the player sees it on screen, before board rotation is applied
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ScreenDirection {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Direction {
        Direction::ALL[index % 4]
    }

    pub fn rotated(self, rotation: Rotation) -> Direction {
        match rotation {
            Rotation::Clockwise => Direction::from_index(self.index() + 1),
            Rotation::CounterClockwise => Direction::from_index(self.index() + 3),
        }
    }

    pub fn opposite(self) -> Direction {
        Direction::from_index(self.index() + 2)
    }

    /// Unit step (dx, dy)
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::West => (-1, 0),
        }
    }

    /// Number of clockwise quarter turns from north
    pub fn quarter_turns(self) -> usize {
        self.index()
    }

    /// Sort key that is smallest for the cell furthest along this direction
    pub fn leading_key(self, x: u32, y: u32) -> i64 {
        match self {
            Direction::North => -(y as i64),
            Direction::East => -(x as i64),
            Direction::South => y as i64,
            Direction::West => x as i64,
        }
    }

    /// Where a direction drawn on screen ends up in board coordinates when the board faces `board`
    ///
    /// Turning the board clockwise turns board-frame directions counter-clockwise on screen,
    /// so each quarter turn of the board undoes one quarter turn here.
    pub fn relative_to_board(self, board: Direction) -> Direction {
        let mut direction = self;
        for _ in 0..board.quarter_turns() {
            direction = direction.rotated(Rotation::CounterClockwise);
        }
        direction
    }

    /// Does this direction run along the y axis?
    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::North | Direction::South)
    }
}

impl Rotation {
    pub fn reversed(self) -> Rotation {
        match self {
            Rotation::Clockwise => Rotation::CounterClockwise,
            Rotation::CounterClockwise => Rotation::Clockwise,
        }
    }
}

impl ScreenDirection {
    fn as_unrotated(self) -> Direction {
        match self {
            ScreenDirection::Up => Direction::North,
            ScreenDirection::Right => Direction::East,
            ScreenDirection::Down => Direction::South,
            ScreenDirection::Left => Direction::West,
        }
    }

    /// The board direction this screen direction points at when the board faces `facing`
    pub fn on_board(self, facing: Direction) -> Direction {
        self.as_unrotated().relative_to_board(facing)
    }
}

/// Orientation of a play area. `current` decides which wall is down; `desired` is what input asked for.
#[derive(Component, Debug, Copy, Clone, PartialEq, Eq)]
pub struct CardinalDirection {
    pub current: Direction,
    pub desired: Direction,
}

impl Default for CardinalDirection {
    fn default() -> Self {
        CardinalDirection {
            current: Direction::North,
            desired: Direction::North,
        }
    }
}

impl CardinalDirection {
    /// The board direction gravity pulls toward
    pub fn down(&self) -> Direction {
        ScreenDirection::Down.on_board(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_turns_return_home() {
        for direction in Direction::ALL {
            let mut turned = direction;
            for _ in 0..4 {
                turned = turned.rotated(Rotation::Clockwise);
            }
            assert_eq!(turned, direction);
            assert_eq!(
                direction
                    .rotated(Rotation::Clockwise)
                    .rotated(Rotation::CounterClockwise),
                direction
            );
        }
    }

    #[test]
    fn down_follows_board_rotation() {
        let mut cardinal = CardinalDirection::default();
        assert_eq!(cardinal.down(), Direction::South);

        // Turning the board clockwise puts its east wall at the bottom
        cardinal.current = Direction::East;
        assert_eq!(cardinal.down(), Direction::East);
        assert_eq!(ScreenDirection::Left.on_board(cardinal.current), Direction::South);

        cardinal.current = Direction::South;
        assert_eq!(cardinal.down(), Direction::North);

        cardinal.current = Direction::West;
        assert_eq!(cardinal.down(), Direction::West);
    }

    #[test]
    fn leading_key_orders_toward_direction() {
        assert!(Direction::South.leading_key(0, 1) < Direction::South.leading_key(0, 5));
        assert!(Direction::East.leading_key(7, 0) < Direction::East.leading_key(2, 0));
    }
}
