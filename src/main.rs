use bevy::app::{AppExit, ScheduleRunnerSettings};
use bevy::log::{LogPlugin, LogSettings};
use bevy::prelude::*;

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Duration;

use rotris::{
    BoardConfig, ConfigError, ControlEvent, Rotation, ScreenDirection, Session, SimClock, TetrisPlugin,
};

// ========================================
// Autoplay

/// Seconds between autoplay inputs
const ACTION_INTERVAL: f64 = 0.2;

/// Seconds between board turns
const BOARD_TURN_INTERVAL: f64 = 15.0;

/// Stop after this long even if the game is still going
const MAX_RUNTIME: f64 = 600.0;

/// A random player, good enough to exercise every part of the board
struct Autoplay {
    rng: StdRng,
    next_action: f64,
    next_board_turn: f64,
}

impl Autoplay {
    fn new(seed: u64) -> Self {
        Autoplay {
            rng: StdRng::seed_from_u64(seed),
            next_action: ACTION_INTERVAL,
            next_board_turn: BOARD_TURN_INTERVAL,
        }
    }

    fn pick(&mut self) -> ControlEvent {
        match self.rng.gen_range(0, 10) {
            0 | 1 | 2 => ControlEvent::Move(ScreenDirection::Left),
            3 | 4 | 5 => ControlEvent::Move(ScreenDirection::Right),
            6 => ControlEvent::Rotate(Rotation::Clockwise),
            7 => ControlEvent::Rotate(Rotation::CounterClockwise),
            8 => ControlEvent::Move(ScreenDirection::Down),
            _ => ControlEvent::HardDrop,
        }
    }
}

fn autoplay(
    clock: Res<SimClock>,
    session: Res<Session>,
    mut player: ResMut<Autoplay>,
    mut controls: EventWriter<ControlEvent>,
    mut exit: EventWriter<AppExit>,
) {
    if session.game_over || clock.now >= MAX_RUNTIME {
        info!(
            "final score {} at level {} with {} lines",
            session.score, session.level, session.lines_cleared
        );
        exit.send(AppExit);
        return;
    }

    if clock.now >= player.next_board_turn {
        player.next_board_turn += BOARD_TURN_INTERVAL;
        controls.send(ControlEvent::RotateBoard(Rotation::Clockwise));
    }
    if clock.now >= player.next_action {
        player.next_action = clock.now + ACTION_INTERVAL;
        let event = player.pick();
        controls.send(event);
    }
}

fn main() -> Result<(), ConfigError> {
    let config = BoardConfig::from_env()?;
    let seed = config.seed;

    App::new()
        .insert_resource(ScheduleRunnerSettings::run_loop(Duration::from_secs_f64(1.0 / 60.0)))
        .insert_resource(LogSettings {
            level: bevy::log::Level::INFO,
            filter: "rotris=debug".to_string(),
        })
        .add_plugins(MinimalPlugins)
        .add_plugin(LogPlugin)
        .add_plugin(TetrisPlugin { config })
        .insert_resource(Autoplay::new(seed))
        .add_system(autoplay)
        .run();

    Ok(())
}
