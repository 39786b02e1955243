//! Falling-block gameplay on a board that can turn a quarter at a time.
//!
//! Everything runs as bevy ECS systems over a cell graph ([`grid::Grid`]). One call of the
//! [`tick_schedule`] is one simulation step; time comes from the [`session::SimClock`] resource,
//! so the schedule can be driven by a real app through [`TetrisPlugin`] or stepped by hand.

use bevy::app::Events;
use bevy::prelude::*;

pub mod bag;
pub mod block;
pub mod board;
pub mod config;
pub mod control;
pub mod direction;
pub mod grid;
pub mod lockdown;
pub mod movement;
pub mod pattern;
pub mod rotation;
pub mod session;
pub mod tetromino;

pub use bag::{Bag, QueueNode, QueueSource};
pub use block::{BlockLocked, Moveable, MovementState};
pub use board::{setup_board, BoardLayout};
pub use config::{BoardConfig, ConfigError, Global};
pub use control::ControlEvent;
pub use direction::{CardinalDirection, Direction, Rotation, ScreenDirection};
pub use grid::{Container, ContainerTag, Coordinate, Grid};
pub use pattern::MatchedLines;
pub use session::{Session, SimClock};
pub use tetromino::{Shape, Tetromino};

// ========================================
// Schedule

/// The passes of one tick, in the order they run
///
/// Each is its own stage so that spawns, despawns and inserted markers are visible to the next.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, StageLabel)]
pub enum TickStage {
    Input,
    Restart,
    Generation,
    Falling,
    Movement,
    StateChange,
    Detach,
    Pattern,
    Elimination,
}

impl TickStage {
    pub const ALL: [TickStage; 9] = [
        TickStage::Input,
        TickStage::Restart,
        TickStage::Generation,
        TickStage::Falling,
        TickStage::Movement,
        TickStage::StateChange,
        TickStage::Detach,
        TickStage::Pattern,
        TickStage::Elimination,
    ];

    fn stage(self) -> SystemStage {
        let mut stage = SystemStage::single_threaded();
        match self {
            TickStage::Input => {
                #[cfg(debug_assertions)]
                stage.add_system(control::verify_occupancy_system.before(InputSystem::Control));
                stage
                    .add_system(control::control_system.label(InputSystem::Control))
                    .add_system(rotation::board_rotation_system.after(InputSystem::Control));
            }
            TickStage::Restart => {
                stage.add_system(control::restart_system);
            }
            TickStage::Generation => {
                stage.add_system(bag::generation_system);
            }
            TickStage::Falling => {
                stage.add_system(movement::falling_system);
            }
            TickStage::Movement => {
                stage.add_system(movement::movement_system);
            }
            TickStage::StateChange => {
                stage.add_system(lockdown::state_change_system);
            }
            TickStage::Detach => {
                stage.add_system(lockdown::detach_system);
            }
            TickStage::Pattern => {
                stage.add_system(pattern::pattern_system);
            }
            TickStage::Elimination => {
                stage.add_system(pattern::eliminate_system);
            }
        }
        stage
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, SystemLabel)]
enum InputSystem {
    Control,
}

/// Label of the whole tick when it runs inside an [`App`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, StageLabel)]
pub enum TetrisStage {
    Tick,
}

/// A schedule running only the given passes, in the order given
pub fn schedule_for(stages: &[TickStage]) -> Schedule {
    let mut schedule = Schedule::default();
    for label in stages {
        schedule.add_stage(*label, label.stage());
    }
    schedule
}

/// One full simulation tick
pub fn tick_schedule() -> Schedule {
    schedule_for(&TickStage::ALL)
}

/// Insert every resource the systems need and build the board
///
/// The configuration is used as given; call [`BoardConfig::validate`] first for untrusted input.
pub fn init_world(world: &mut World, config: BoardConfig) {
    world.insert_resource(SimClock::default());
    world.insert_resource(Session::new(&config));
    world.insert_resource(Bag::new(config.seed));
    world.insert_resource(MatchedLines::default());
    world.insert_resource(Events::<ControlEvent>::default());
    world.insert_resource(Events::<BlockLocked>::default());
    world.insert_resource(config);
    setup_board(world);
}

/// Roll event buffers over, as an [`App`] does once per frame
pub fn update_events(world: &mut World) {
    if let Some(mut events) = world.get_resource_mut::<Events<ControlEvent>>() {
        events.update();
    }
    if let Some(mut events) = world.get_resource_mut::<Events<BlockLocked>>() {
        events.update();
    }
}

// ========================================
// Plugin

/// Runs the simulation once per frame, on the app's clock
pub struct TetrisPlugin {
    pub config: BoardConfig,
}

impl Plugin for TetrisPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.config.clone())
            .insert_resource(SimClock::default())
            .insert_resource(Session::new(&self.config))
            .insert_resource(Bag::new(self.config.seed))
            .insert_resource(MatchedLines::default())
            .add_event::<ControlEvent>()
            .add_event::<BlockLocked>()
            .add_startup_system(setup_board.exclusive_system())
            .add_system_to_stage(CoreStage::PreUpdate, sync_clock)
            .add_stage_after(CoreStage::Update, TetrisStage::Tick, tick_schedule());
    }
}

fn sync_clock(time: Res<Time>, mut clock: ResMut<SimClock>) {
    clock.now = time.seconds_since_startup();
}
