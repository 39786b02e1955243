use bevy::prelude::*;

use crate::config::BoardConfig;

/// Simulation time in seconds, supplied by whoever drives the schedule
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct SimClock {
    pub now: f64,
}

impl SimClock {
    pub fn advance(&mut self, seconds: f64) {
        self.now += seconds;
    }
}

/// Per-board game state that the systems share
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Clock time of the last gravity step
    pub last_fall_update: f64,
    /// Seconds between gravity steps
    pub fall_speed: f64,
    pub level: u32,
    pub lines_cleared: u32,
    /// Cumulative lines that trigger the next level
    pub line_goal: u32,
    pub score: u64,
    pub paused: bool,
    pub game_over: bool,
    drop_speed_factor: f64,
    goal_increment: u32,
    max_level: u32,
}

impl Session {
    pub fn new(config: &BoardConfig) -> Self {
        Session {
            last_fall_update: 0.0,
            fall_speed: fall_speed(1) * config.drop_speed_factor,
            level: 1,
            lines_cleared: 0,
            line_goal: config.line_goal_increment,
            score: 0,
            paused: false,
            game_over: false,
            drop_speed_factor: config.drop_speed_factor,
            goal_increment: config.line_goal_increment,
            max_level: config.max_level,
        }
    }

    /// Should gravity step at `now`?
    pub fn fall_due(&self, now: f64) -> bool {
        now >= self.last_fall_update + self.fall_speed
    }

    /// Is the simulation advancing?
    pub fn live(&self) -> bool {
        !self.paused && !self.game_over
    }

    /// Adjust score, level and gravity after a batch of cleared lines
    pub fn register_line_clear(&mut self, lines: u32) {
        if lines == 0 {
            return;
        }
        self.score += line_clear_score(lines, self.level);
        self.lines_cleared += lines;

        let mut levelled = false;
        while self.lines_cleared >= self.line_goal && self.level < self.max_level {
            self.level += 1;
            self.line_goal += self.level * self.goal_increment;
            levelled = true;
        }
        self.fall_speed = fall_speed(self.level) * self.drop_speed_factor;

        if levelled {
            info!(
                "level {} reached, next goal {} lines, fall speed {:.3}s",
                self.level, self.line_goal, self.fall_speed
            );
        }
    }
}

/// 'Guideline' gravity: Time = (0.8-((Level-1)*0.007))^(Level-1)
pub fn fall_speed(level: u32) -> f64 {
    let steps = level.saturating_sub(1) as f64;
    (0.8 - steps * 0.007).powf(steps)
}

/// Points for clearing `lines` lines at once
pub fn line_clear_score(lines: u32, level: u32) -> u64 {
    let level = level as u64;
    match lines {
        0 => 0,
        1 => 100 * level,
        2 => 300 * level,
        3 => 500 * level,
        4 => 800 * level,
        // fibonacci
        _ => 1300 * level,
    }
}
