use bevy::prelude::*;

use crate::bag::{QueueNode, QueueSource};
use crate::config::BoardConfig;
use crate::direction::{CardinalDirection, Direction};
use crate::grid::{CellId, Container, ContainerTag, Coordinate, Grid, PlayAreaRef};

/// Width of a preview slot in the bag area, and its height
const SLOT_SIZE: u32 = 4;

/// Entities making up the board, resolved once at setup
#[derive(Debug, Clone)]
pub struct BoardLayout {
    pub play_area: Entity,
    pub matrix: Entity,
    pub buffer: Entity,
    pub bag_area: Entity,
    /// Queue nodes from the bag end to the spawn end
    pub queue: Vec<Entity>,
    /// Where the active piece's pivot enters the board
    pub spawn_point: Coordinate,
}

impl BoardLayout {
    /// The node whose preview becomes the next active piece
    pub fn spawn_node(&self) -> Entity {
        *self
            .queue
            .last()
            .expect("board layout has no queue nodes")
    }
}

/// Find a container entity by its role
pub fn find_container<'a>(
    containers: impl IntoIterator<Item = (Entity, &'a Container)>,
    tag: ContainerTag,
) -> Option<Entity> {
    containers
        .into_iter()
        .find(|(_, container)| container.tag == tag)
        .map(|(entity, _)| entity)
}

/// Direction gravity pulls inside a container of the given role
///
/// The buffer is a conveyor into the matrix, so it always drains south whatever the board does.
pub fn gravity(tag: ContainerTag, orientation: &CardinalDirection) -> Direction {
    match tag {
        ContainerTag::Buffer => Direction::South,
        _ => orientation.down(),
    }
}

/// The orientation governing `container`, read through its [`PlayAreaRef`]
///
/// Containers outside any play area (the bag area) see an unturned board.
pub fn orientation_of(
    container: Entity,
    play_areas: &Query<&PlayAreaRef>,
    boards: &Query<&CardinalDirection>,
) -> CardinalDirection {
    play_areas
        .get(container)
        .ok()
        .and_then(|play_area| boards.get(play_area.0).ok())
        .copied()
        .unwrap_or_default()
}

/// Gravity acting on whatever sits at `at`. `None` for previews and off-grid positions.
pub fn gravity_at(
    grid: &Grid,
    at: Coordinate,
    play_areas: &Query<&PlayAreaRef>,
    boards: &Query<&CardinalDirection>,
) -> Option<Direction> {
    match grid.tag_of(at)? {
        ContainerTag::BagArea => None,
        tag => Some(gravity(tag, &orientation_of(at.parent, play_areas, boards))),
    }
}

/// Gravity acting on a piece covering `cells`
///
/// A piece keeps draining out of the buffer until every block is inside the matrix.
pub fn piece_gravity(
    grid: &Grid,
    cells: &[CellId; 4],
    play_areas: &Query<&PlayAreaRef>,
    boards: &Query<&CardinalDirection>,
) -> Option<Direction> {
    let cell = cells
        .iter()
        .find(|cell| grid.cell(**cell).tag() == ContainerTag::Buffer)
        .unwrap_or(&cells[0]);
    gravity_at(grid, grid.coordinate(*cell), play_areas, boards)
}

/// Set up the containers, their cells and the preview queue
///
/// Reads [`BoardConfig`] and inserts the [`Grid`] and [`BoardLayout`] resources.
pub fn setup_board(world: &mut World) {
    let config = world
        .get_resource::<BoardConfig>()
        .expect("BoardConfig must be inserted before the board is built")
        .clone();

    let mut grid = Grid::new();

    // The play area owns the orientation; its cells are those of the matrix and buffer
    let play_area = world
        .spawn()
        .insert(Container {
            tag: ContainerTag::PlayArea,
            width: config.matrix_width,
            height: config.matrix_height + config.buffer_depth,
            cell_size: config.cell_size,
        })
        .insert(CardinalDirection::default())
        .id();

    let matrix_spec = Container {
        tag: ContainerTag::Matrix,
        width: config.matrix_width,
        height: config.matrix_height,
        cell_size: config.cell_size,
    };
    let buffer_spec = Container {
        tag: ContainerTag::Buffer,
        width: config.matrix_width,
        height: config.buffer_depth,
        cell_size: config.cell_size,
    };
    let bag_spec = Container {
        tag: ContainerTag::BagArea,
        width: SLOT_SIZE,
        height: SLOT_SIZE * config.preview_count,
        cell_size: config.cell_size,
    };

    let matrix = world
        .spawn()
        .insert(matrix_spec.clone())
        .insert(PlayAreaRef(play_area))
        .id();
    let buffer = world
        .spawn()
        .insert(buffer_spec.clone())
        .insert(PlayAreaRef(play_area))
        .id();
    let bag_area = world.spawn().insert(bag_spec.clone()).id();

    grid.build_grid(matrix, &matrix_spec);
    grid.build_grid(buffer, &buffer_spec);
    grid.build_grid(bag_area, &bag_spec);

    // The bottom row of the buffer feeds the top row of the matrix
    for x in 0..config.matrix_width {
        grid.link_coordinates(
            Coordinate::new(buffer, x, 0),
            Coordinate::new(matrix, x, config.matrix_height - 1),
            Direction::South,
            Direction::North,
        );
    }

    // Preview slots run down the bag area, the spawn node in the lowest slot
    let mut queue = Vec::with_capacity(config.preview_count as usize);
    for i in 0..config.preview_count {
        let slot = config.preview_count - 1 - i;
        let source = match queue.last() {
            Some(upstream) => QueueSource::Node(*upstream),
            None => QueueSource::Bag,
        };
        let node = world
            .spawn()
            .insert(QueueNode::new(
                source,
                Coordinate::new(bag_area, 1, slot * SLOT_SIZE + 1),
            ))
            .id();
        queue.push(node);
    }

    let spawn_point = Coordinate::new(
        buffer,
        config.matrix_width / 2 - 1,
        config.buffer_depth - 2,
    );

    info!(
        "board ready: {}x{} matrix, {} buffer rows, {} preview slots, {} cells",
        config.matrix_width,
        config.matrix_height,
        config.buffer_depth,
        config.preview_count,
        grid.len()
    );

    world.insert_resource(grid);
    world.insert_resource(BoardLayout {
        play_area,
        matrix,
        buffer,
        bag_area,
        queue,
        spawn_point,
    });
}

/// Print a text version of a container's occupancy, top row first
pub fn pretty_print(grid: &Grid, container: Entity, spec: &Container) -> Vec<String> {
    (0..spec.height)
        .rev()
        .map(|y| {
            let row: String = (0..spec.width)
                .map(|x| match grid.cell_at(Coordinate::new(container, x, y)) {
                    Some(id) if grid.occupant(id).is_some() => '#',
                    Some(_) => '.',
                    None => '?',
                })
                .collect();
            format!("{:2} {}", y, row)
        })
        .collect()
}
