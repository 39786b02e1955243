#![allow(dead_code)]

use bevy::app::Events;
use bevy::ecs::system::CommandQueue;
use bevy::prelude::*;

use rotris::block::{spawn_block, Block, Controllable, Follower};
use rotris::tetromino::spawn_tetromino;
use rotris::{
    init_world, schedule_for, tick_schedule, update_events, BoardConfig, BoardLayout, ControlEvent,
    Coordinate, Direction, Grid, Moveable, MovementState, Session, Shape, SimClock, TickStage,
};

/// Every pass except generation and restart, so hand-placed fixtures are the only pieces
pub const FIXTURE_STAGES: [TickStage; 7] = [
    TickStage::Input,
    TickStage::Falling,
    TickStage::Movement,
    TickStage::StateChange,
    TickStage::Detach,
    TickStage::Pattern,
    TickStage::Elimination,
];

/// A small board with a one second fall and no debug slowdown
pub fn config(width: u32, height: u32) -> BoardConfig {
    BoardConfig {
        matrix_width: width,
        matrix_height: height,
        buffer_depth: 4,
        preview_count: 3,
        lockdown_delay: 0.5,
        drop_speed_factor: 1.0,
        ..Default::default()
    }
}

pub struct Harness {
    pub world: World,
    pub schedule: Schedule,
}

impl Harness {
    pub fn new(config: BoardConfig) -> Self {
        let mut world = World::new();
        init_world(&mut world, config);
        Harness {
            world,
            schedule: tick_schedule(),
        }
    }

    /// A board that only moves what the test puts on it
    pub fn fixture(config: BoardConfig) -> Self {
        let mut harness = Harness::new(config);
        harness.schedule = schedule_for(&FIXTURE_STAGES);
        harness
    }

    pub fn layout(&self) -> BoardLayout {
        self.world.get_resource::<BoardLayout>().unwrap().clone()
    }

    pub fn session(&self) -> Session {
        self.world.get_resource::<Session>().unwrap().clone()
    }

    pub fn now(&self) -> f64 {
        self.world.get_resource::<SimClock>().unwrap().now
    }

    pub fn matrix(&self, x: u32, y: u32) -> Coordinate {
        Coordinate::new(self.layout().matrix, x, y)
    }

    /// Advance the clock and run one tick
    pub fn tick(&mut self, seconds: f64) {
        self.world.get_resource_mut::<SimClock>().unwrap().advance(seconds);
        self.schedule.run(&mut self.world);
        update_events(&mut self.world);
    }

    pub fn ticks(&mut self, count: usize, seconds: f64) {
        for _ in 0..count {
            self.tick(seconds);
        }
    }

    pub fn send(&mut self, event: ControlEvent) {
        self.world
            .get_resource_mut::<Events<ControlEvent>>()
            .unwrap()
            .send(event);
    }

    fn with_commands<R>(&mut self, f: impl FnOnce(&mut Commands, &mut Grid) -> R) -> R {
        let mut grid = self.world.remove_resource::<Grid>().unwrap();
        let mut queue = CommandQueue::default();
        let result = {
            let mut commands = Commands::new(&mut queue, &self.world);
            f(&mut commands, &mut grid)
        };
        queue.apply(&mut self.world);
        self.world.insert_resource(grid);
        result
    }

    /// Spawn a controllable piece
    pub fn spawn_piece(&mut self, shape: Shape, pivot: Coordinate, facing: Direction) -> Entity {
        let piece = self
            .with_commands(|commands, grid| {
                spawn_tetromino(commands, grid, shape, pivot, facing, MovementState::Fall, 0.5, false)
            })
            .expect("fixture piece does not fit");
        self.world.entity_mut(piece).insert(Controllable);
        piece
    }

    pub fn spawn_block(&mut self, at: Coordinate, state: MovementState) -> Entity {
        self.with_commands(|commands, grid| spawn_block(commands, grid, at, state, 0.5))
            .expect("fixture block does not fit")
    }

    /// Lock a whole row of the matrix except the listed columns
    pub fn fill_row(&mut self, y: u32, width: u32, holes: &[u32]) {
        for x in (0..width).filter(|x| !holes.contains(x)) {
            let at = self.matrix(x, y);
            self.spawn_block(at, MovementState::Locked);
        }
    }

    /// Cells of a piece's blocks as (x, y), sorted
    pub fn piece_cells(&mut self, piece: Entity) -> Vec<(u32, u32)> {
        let blocks = self.world.get::<rotris::Tetromino>(piece).unwrap().blocks;
        let mut cells: Vec<(u32, u32)> = blocks
            .iter()
            .map(|b| {
                let c = self.world.get::<Coordinate>(*b).unwrap();
                (c.x, c.y)
            })
            .collect();
        cells.sort_unstable();
        cells
    }

    /// (x, y, state) of every standalone block, sorted
    pub fn terrain(&mut self) -> Vec<(u32, u32, MovementState)> {
        let mut query = self
            .world
            .query_filtered::<(&Coordinate, &Moveable), (With<Block>, Without<Follower>)>();
        let mut terrain: Vec<(u32, u32, MovementState)> = query
            .iter(&self.world)
            .map(|(c, m)| (c.x, c.y, m.state))
            .collect();
        terrain.sort_unstable_by_key(|(x, y, _)| (*x, *y));
        terrain
    }

    pub fn active_piece(&mut self) -> Option<Entity> {
        let mut query = self
            .world
            .query_filtered::<Entity, With<Controllable>>();
        query.iter(&self.world).next()
    }

    pub fn block_count(&mut self) -> usize {
        let mut query = self.world.query_filtered::<Entity, With<Block>>();
        query.iter(&self.world).count()
    }
}
