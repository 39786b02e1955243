use bevy::prelude::*;
use bevy::utils::{HashMap, HashSet};

use crate::block::{Block, Collapse, Follower, Hittable, Moveable, MovementState, Obstructable};
use crate::board::{gravity, orientation_of, pretty_print};
use crate::config::Global;
use crate::direction::{CardinalDirection, Direction};
use crate::grid::{Container, ContainerTag, Coordinate, Grid, PlayAreaRef};
use crate::session::Session;

/// A full line of locked blocks, perpendicular to gravity
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MatchedLine {
    pub container: Entity,
    /// Gravity inside the container when the line was matched
    pub gravity: Direction,
    /// Row index for vertical gravity, column index otherwise
    pub index: u32,
}

impl MatchedLine {
    fn position(&self, coordinate: &Coordinate) -> (u32, u32) {
        if self.gravity.is_vertical() {
            (coordinate.y, coordinate.x)
        } else {
            (coordinate.x, coordinate.y)
        }
    }

    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        coordinate.parent == self.container && self.position(coordinate).0 == self.index
    }

    /// Does this line lie between `coordinate` and the floor?
    pub fn lies_below(&self, coordinate: &Coordinate) -> bool {
        if coordinate.parent != self.container {
            return false;
        }
        match self.gravity {
            Direction::South => self.index < coordinate.y,
            Direction::North => self.index > coordinate.y,
            Direction::East => self.index > coordinate.x,
            Direction::West => self.index < coordinate.x,
        }
    }
}

/// Lines matched this tick, waiting for elimination
#[derive(Debug, Default, Clone)]
pub struct MatchedLines {
    pub lines: Vec<MatchedLine>,
}

impl MatchedLines {
    pub fn count(&self) -> usize {
        self.lines.len()
    }
}

/// Find every full line in every matrix
///
/// Only locked blocks count. Lines run across gravity, so after a quarter turn of a matrix's
/// play area columns are matched instead of rows.
pub fn match_lines<'a>(
    containers: impl Iterator<Item = (Entity, &'a Container, CardinalDirection)>,
    blocks: impl Iterator<Item = (&'a Coordinate, &'a Moveable)>,
) -> Vec<MatchedLine> {
    let matrices: Vec<(Entity, &Container, Direction)> = containers
        .filter(|(_, container, _)| container.tag == ContainerTag::Matrix)
        .map(|(entity, container, orientation)| {
            (entity, container, gravity(ContainerTag::Matrix, &orientation))
        })
        .collect();
    let downs: HashMap<Entity, Direction> = matrices
        .iter()
        .map(|(entity, _, down)| (*entity, *down))
        .collect();

    let mut filled: HashMap<(Entity, u32), HashSet<u32>> = HashMap::default();
    for (coordinate, moveable) in blocks {
        if moveable.state != MovementState::Locked {
            continue;
        }
        let down = match downs.get(&coordinate.parent) {
            Some(down) => *down,
            None => continue,
        };
        let probe = MatchedLine {
            container: coordinate.parent,
            gravity: down,
            index: 0,
        };
        let (line, along) = probe.position(coordinate);
        filled
            .entry((coordinate.parent, line))
            .or_insert_with(HashSet::default)
            .insert(along);
    }

    let mut lines: Vec<MatchedLine> = Vec::new();
    for (entity, container, down) in matrices {
        let extent = if down.is_vertical() {
            container.width
        } else {
            container.height
        };
        for ((parent, index), cells) in filled.iter() {
            if *parent == entity && cells.len() as u32 == extent {
                lines.push(MatchedLine {
                    container: entity,
                    gravity: down,
                    index: *index,
                });
            }
        }
    }
    lines.sort_by_key(|line| line.index);
    lines
}

/// Mark the blocks of every full line as hittable
pub fn pattern_system(
    mut commands: Commands,
    mut matched: ResMut<MatchedLines>,
    play_areas: Query<&PlayAreaRef>,
    boards: Query<&CardinalDirection>,
    containers: Query<(Entity, &Container)>,
    blocks: Query<(Entity, &Coordinate, &Moveable), With<Block>>,
) {
    let lines = match_lines(
        containers
            .iter()
            .map(|(entity, container)| (entity, container, orientation_of(entity, &play_areas, &boards))),
        blocks.iter().map(|(_, coordinate, moveable)| (coordinate, moveable)),
    );
    if lines.is_empty() {
        return;
    }

    for (entity, coordinate, moveable) in blocks.iter() {
        if moveable.state == MovementState::Locked && lines.iter().any(|l| l.contains(coordinate)) {
            commands.entity(entity).insert(Hittable);
        }
    }
    debug!("matched {} lines", lines.len());
    matched.lines = lines;
}

/// Destroy hittable blocks, then let the terrain above each cleared line fall by the lines it lost
///
/// Each remaining block falls exactly as many cells as there were cleared lines below it and
/// no further, even if that leaves a gap underneath.
#[allow(clippy::too_many_arguments)]
pub fn eliminate_system(
    mut commands: Commands,
    mut grid: ResMut<Grid>,
    mut session: ResMut<Session>,
    mut matched: ResMut<MatchedLines>,
    containers: Query<&Container>,
    hit: Query<(Entity, &Coordinate), (With<Block>, With<Hittable>)>,
    mut terrain: Query<
        (Entity, &Coordinate, &mut Moveable, &mut Obstructable),
        (With<Block>, Without<Hittable>, Without<Follower>),
    >,
) {
    for (entity, coordinate) in hit.iter() {
        if let Some(cell) = grid.cell_at(*coordinate) {
            grid.vacate(cell, entity);
        }
        commands.entity(entity).despawn();
    }

    if matched.lines.is_empty() {
        return;
    }

    for (entity, coordinate, mut moveable, mut obstructable) in terrain.iter_mut() {
        if moveable.state != MovementState::Locked {
            continue;
        }
        let rows = matched
            .lines
            .iter()
            .filter(|line| line.lies_below(coordinate))
            .count() as u32;
        if rows > 0 {
            moveable.state = MovementState::Fall;
            obstructable.clear();
            commands.entity(entity).insert(Collapse { rows });
        }
    }

    session.register_line_clear(matched.count() as u32);
    info!(
        "cleared {} lines, score {} level {}",
        matched.count(),
        session.score,
        session.level
    );

    if Global::LOG_BOARD {
        let printed: HashSet<Entity> = matched.lines.iter().map(|line| line.container).collect();
        for container in printed {
            if let Ok(spec) = containers.get(container) {
                for row in pretty_print(&grid, container, spec) {
                    debug!("{}", row);
                }
            }
        }
    }
    matched.lines.clear();
}
