use bevy::prelude::*;
use bevy::utils::HashMap;

use crate::direction::Direction;

// ========================================
// Components

/// The role a container plays on the board
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ContainerTag {
    PlayArea,
    Matrix,
    Buffer,
    BagArea,
}

/// A rectangular region of cells
#[derive(Component, Debug, Clone)]
pub struct Container {
    pub tag: ContainerTag,
    pub width: u32,
    pub height: u32,
    /// Size of one cell in render units, only used by presentation
    pub cell_size: f32,
}

/// Back-reference from a matrix or buffer to the play area that owns its orientation
#[derive(Component, Debug, Copy, Clone)]
pub struct PlayAreaRef(pub Entity);

/// A grid position scoped to its parent container
#[derive(Component, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub parent: Entity,
    pub x: u32,
    pub y: u32,
}

impl Coordinate {
    pub fn new(parent: Entity, x: u32, y: u32) -> Self {
        Coordinate { parent, x, y }
    }
}

// ========================================
// Cell arena

/// Stable handle of a cell inside the [`Grid`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(usize);

#[derive(Debug, Clone)]
pub struct Cell {
    coordinate: Coordinate,
    tag: ContainerTag,
    neighbors: [Option<CellId>; 4],
    occupant: Option<Entity>,
}

impl Cell {
    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn tag(&self) -> ContainerTag {
        self.tag
    }

    pub fn occupant(&self) -> Option<Entity> {
        self.occupant
    }
}

/// Every cell of every container, plus the directed links between containers
#[derive(Debug, Default)]
pub struct Grid {
    cells: Vec<Cell>,
    index: HashMap<Coordinate, CellId>,
    links: HashMap<(CellId, Direction), CellId>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the cells of a container and wire up the rectangular adjacency
    ///
    /// Rebuilding an untouched container leaves it as it was. Rebuilding one that holds
    /// blocks means the board graph is being torn up under live pieces, so that panics.
    pub fn build_grid(&mut self, container: Entity, spec: &Container) {
        if self.cells_of(container).next().is_some() {
            assert!(
                self.cells_of(container).all(|id| self.cells[id.0].occupant.is_none()),
                "build_grid called on occupied container {:?}",
                container
            );
            return;
        }

        let first = self.cells.len();
        let at = |x: u32, y: u32| CellId(first + (y * spec.width + x) as usize);

        for y in 0..spec.height {
            for x in 0..spec.width {
                let mut neighbors = [None; 4];
                if y + 1 < spec.height {
                    neighbors[Direction::North.index()] = Some(at(x, y + 1));
                }
                if y > 0 {
                    neighbors[Direction::South.index()] = Some(at(x, y - 1));
                }
                if x + 1 < spec.width {
                    neighbors[Direction::East.index()] = Some(at(x + 1, y));
                }
                if x > 0 {
                    neighbors[Direction::West.index()] = Some(at(x - 1, y));
                }

                let coordinate = Coordinate::new(container, x, y);
                self.index.insert(coordinate, at(x, y));
                self.cells.push(Cell {
                    coordinate,
                    tag: spec.tag,
                    neighbors,
                    occupant: None,
                });
            }
        }
        trace!(
            "built {}x{} {:?} grid for {:?}",
            spec.width,
            spec.height,
            spec.tag,
            container
        );
    }

    /// Link two cells that are not neighbours by row/column arithmetic
    ///
    /// Leaving `origin` toward `from_origin` enters `destination`, and leaving `destination`
    /// toward `from_destination` comes back to `origin`.
    pub fn link_coordinates(
        &mut self,
        origin: Coordinate,
        destination: Coordinate,
        from_origin: Direction,
        from_destination: Direction,
    ) {
        let origin_cell = *self
            .index
            .get(&origin)
            .unwrap_or_else(|| panic!("link origin {:?} is not a cell", origin));
        let destination_cell = *self
            .index
            .get(&destination)
            .unwrap_or_else(|| panic!("link destination {:?} is not a cell", destination));
        self.links.insert((origin_cell, from_origin), destination_cell);
        self.links
            .insert((destination_cell, from_destination), origin_cell);
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.0]
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell lookup by container tag and coordinate. `None` when there is no such cell.
    pub fn cell_at_coordinates(&self, tag: ContainerTag, coordinate: Coordinate) -> Option<CellId> {
        self.index
            .get(&coordinate)
            .copied()
            .filter(|id| self.cells[id.0].tag == tag)
    }

    /// Cell lookup by coordinate alone
    pub fn cell_at(&self, coordinate: Coordinate) -> Option<CellId> {
        self.index.get(&coordinate).copied()
    }

    pub fn coordinate(&self, id: CellId) -> Coordinate {
        self.cells[id.0].coordinate
    }

    pub fn tag_of(&self, coordinate: Coordinate) -> Option<ContainerTag> {
        self.cell_at(coordinate).map(|id| self.cells[id.0].tag)
    }

    /// The cell entered by leaving `id` toward `direction`. Explicit links win over adjacency.
    pub fn neighbor(&self, id: CellId, direction: Direction) -> Option<CellId> {
        self.links
            .get(&(id, direction))
            .copied()
            .or(self.cells[id.0].neighbors[direction.index()])
    }

    /// Walk `steps` cells toward `direction`, failing if the walk leaves the graph
    pub fn walk(&self, from: CellId, direction: Direction, steps: u32) -> Option<CellId> {
        let mut at = from;
        for _ in 0..steps {
            at = self.neighbor(at, direction)?;
        }
        Some(at)
    }

    /// Walk a signed (dx, dy) offset, x first
    pub fn offset(&self, from: CellId, dx: i32, dy: i32) -> Option<CellId> {
        let horizontal = if dx < 0 { Direction::West } else { Direction::East };
        let vertical = if dy < 0 { Direction::South } else { Direction::North };
        let at = self.walk(from, horizontal, dx.unsigned_abs())?;
        self.walk(at, vertical, dy.unsigned_abs())
    }

    pub fn can_occupy_cell(&self, cell: Option<CellId>, disable_obstruction: bool) -> bool {
        self.can_occupy_cell_ignoring(cell, disable_obstruction, &[])
    }

    /// Like [`Grid::can_occupy_cell`], but cells held by any of `ignore` count as free
    pub fn can_occupy_cell_ignoring(
        &self,
        cell: Option<CellId>,
        disable_obstruction: bool,
        ignore: &[Entity],
    ) -> bool {
        let cell = match cell {
            Some(id) => &self.cells[id.0],
            None => return false,
        };
        if disable_obstruction {
            return true;
        }
        match cell.occupant {
            Some(occupant) => ignore.contains(&occupant),
            None => true,
        }
    }

    /// Move up to `distance` cells toward `direction`, stopping before the first cell that cannot be occupied
    ///
    /// Returns the last cell reached, which is `origin` when not even one step succeeds.
    pub fn move_in_direction(
        &self,
        origin: CellId,
        direction: Direction,
        distance: u32,
        disable_obstruction: bool,
        ignore: &[Entity],
    ) -> CellId {
        let mut at = origin;
        for _ in 0..distance {
            let next = self.neighbor(at, direction);
            if !self.can_occupy_cell_ignoring(next, disable_obstruction, ignore) {
                break;
            }
            match next {
                Some(id) => at = id,
                None => break,
            }
        }
        at
    }

    pub fn occupant(&self, id: CellId) -> Option<Entity> {
        self.cells[id.0].occupant
    }

    pub fn occupy(&mut self, id: CellId, entity: Entity) {
        self.cells[id.0].occupant = Some(entity);
    }

    /// Clear a cell, but only while `entity` still holds it
    pub fn vacate(&mut self, id: CellId, entity: Entity) {
        let cell = &mut self.cells[id.0];
        if cell.occupant == Some(entity) {
            cell.occupant = None;
        }
    }

    pub fn clear_occupants(&mut self) {
        for cell in self.cells.iter_mut() {
            cell.occupant = None;
        }
    }

    /// All cells belonging to a container, row by row from (0, 0)
    pub fn cells_of(&self, container: Entity) -> impl Iterator<Item = CellId> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(move |(_, cell)| cell.coordinate.parent == container)
            .map(|(i, _)| CellId(i))
    }

    /// Compare occupancy with where blocks think they are, returning a line per mismatch
    pub fn occupancy_mismatches<'a>(
        &self,
        blocks: impl Iterator<Item = (Entity, &'a Coordinate)>,
    ) -> Vec<String> {
        let mut problems = Vec::new();
        let mut expected: HashMap<CellId, Entity> = HashMap::default();
        for (entity, coordinate) in blocks {
            match self.cell_at(*coordinate) {
                Some(id) => {
                    expected.insert(id, entity);
                }
                None => problems.push(format!("{:?} sits off the grid at {:?}", entity, coordinate)),
            }
        }
        for (i, cell) in self.cells.iter().enumerate() {
            let wanted = expected.get(&CellId(i)).copied();
            if wanted != cell.occupant {
                problems.push(format!(
                    "occupancy mismatch @({},{}) in {:?}: grid:{:?} vs blocks:{:?}",
                    cell.coordinate.x, cell.coordinate.y, cell.tag, cell.occupant, wanted
                ));
            }
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(tag: ContainerTag, width: u32, height: u32) -> Container {
        Container {
            tag,
            width,
            height,
            cell_size: 1.0,
        }
    }

    fn open_sides(grid: &Grid, id: CellId) -> usize {
        Direction::ALL
            .iter()
            .filter(|d| grid.neighbor(id, **d).is_none())
            .count()
    }

    #[test]
    fn neighbour_counts_by_position() {
        for width in 1..=4u32 {
            for height in 1..=4u32 {
                let mut grid = Grid::new();
                let owner = Entity::from_raw(1);
                grid.build_grid(owner, &container(ContainerTag::Matrix, width, height));
                assert_eq!(grid.len(), (width * height) as usize);

                for id in grid.cells_of(owner).collect::<Vec<_>>() {
                    let c = grid.coordinate(id);
                    let on_x_edge = c.x == 0 || c.x + 1 == width;
                    let on_y_edge = c.y == 0 || c.y + 1 == height;
                    let expected_open = (if width == 1 { 2 } else if on_x_edge { 1 } else { 0 })
                        + (if height == 1 { 2 } else if on_y_edge { 1 } else { 0 });
                    assert_eq!(open_sides(&grid, id), expected_open, "{}x{} at {:?}", width, height, c);
                }
            }
        }
    }

    #[test]
    fn neighbours_follow_compass() {
        let mut grid = Grid::new();
        let owner = Entity::from_raw(3);
        grid.build_grid(owner, &container(ContainerTag::Matrix, 3, 3));
        let centre = grid.cell_at(Coordinate::new(owner, 1, 1)).unwrap();
        let at = |d| grid.coordinate(grid.neighbor(centre, d).unwrap());
        assert_eq!(at(Direction::North), Coordinate::new(owner, 1, 2));
        assert_eq!(at(Direction::South), Coordinate::new(owner, 1, 0));
        assert_eq!(at(Direction::East), Coordinate::new(owner, 2, 1));
        assert_eq!(at(Direction::West), Coordinate::new(owner, 0, 1));
    }

    #[test]
    fn rebuilding_empty_container_is_a_no_op() {
        let mut grid = Grid::new();
        let owner = Entity::from_raw(1);
        let spec = container(ContainerTag::Matrix, 2, 2);
        grid.build_grid(owner, &spec);
        grid.build_grid(owner, &spec);
        assert_eq!(grid.len(), 4);
    }

    #[test]
    #[should_panic(expected = "occupied")]
    fn rebuilding_occupied_container_panics() {
        let mut grid = Grid::new();
        let owner = Entity::from_raw(1);
        let spec = container(ContainerTag::Matrix, 2, 2);
        grid.build_grid(owner, &spec);
        let id = grid.cell_at(Coordinate::new(owner, 0, 0)).unwrap();
        grid.occupy(id, Entity::from_raw(99));
        grid.build_grid(owner, &spec);
    }

    #[test]
    fn lookup_is_scoped_by_tag() {
        let mut grid = Grid::new();
        let matrix = Entity::from_raw(1);
        grid.build_grid(matrix, &container(ContainerTag::Matrix, 2, 2));
        let c = Coordinate::new(matrix, 1, 1);
        assert!(grid.cell_at_coordinates(ContainerTag::Matrix, c).is_some());
        assert!(grid.cell_at_coordinates(ContainerTag::Buffer, c).is_none());
        assert!(grid
            .cell_at_coordinates(ContainerTag::Matrix, Coordinate::new(matrix, 2, 0))
            .is_none());
    }

    #[test]
    fn links_cross_containers_and_round_trip() {
        let mut grid = Grid::new();
        let matrix = Entity::from_raw(1);
        let buffer = Entity::from_raw(2);
        grid.build_grid(matrix, &container(ContainerTag::Matrix, 2, 3));
        grid.build_grid(buffer, &container(ContainerTag::Buffer, 2, 2));
        for x in 0..2 {
            grid.link_coordinates(
                Coordinate::new(buffer, x, 0),
                Coordinate::new(matrix, x, 2),
                Direction::South,
                Direction::North,
            );
        }

        let start = grid.cell_at(Coordinate::new(buffer, 1, 0)).unwrap();
        let entered = grid.neighbor(start, Direction::South).unwrap();
        assert_eq!(grid.coordinate(entered), Coordinate::new(matrix, 1, 2));
        assert_eq!(grid.neighbor(entered, Direction::North), Some(start));
        // Sideways adjacency is unchanged by the link
        assert_eq!(
            grid.coordinate(grid.neighbor(entered, Direction::West).unwrap()),
            Coordinate::new(matrix, 0, 2)
        );
    }

    #[test]
    fn move_is_clamped_by_edge_and_occupants() {
        let mut grid = Grid::new();
        let owner = Entity::from_raw(1);
        grid.build_grid(owner, &container(ContainerTag::Matrix, 6, 1));
        let start = grid.cell_at(Coordinate::new(owner, 1, 0)).unwrap();

        for distance in 0..10 {
            let end = grid.move_in_direction(start, Direction::East, distance, false, &[]);
            assert_eq!(grid.coordinate(end).x, (1 + distance).min(5));
        }

        let wall = grid.cell_at(Coordinate::new(owner, 4, 0)).unwrap();
        grid.occupy(wall, Entity::from_raw(50));
        let end = grid.move_in_direction(start, Direction::East, 9, false, &[]);
        assert_eq!(grid.coordinate(end).x, 3);
        let ghost = grid.move_in_direction(start, Direction::East, 9, true, &[]);
        assert_eq!(grid.coordinate(ghost).x, 5);
        let ignoring = grid.move_in_direction(start, Direction::East, 9, false, &[Entity::from_raw(50)]);
        assert_eq!(grid.coordinate(ignoring).x, 5);

        let blocked = grid.move_in_direction(start, Direction::West, 0, false, &[]);
        assert_eq!(blocked, start);
    }

    #[test]
    fn vacate_only_clears_own_cell() {
        let mut grid = Grid::new();
        let owner = Entity::from_raw(1);
        grid.build_grid(owner, &container(ContainerTag::Matrix, 1, 1));
        let id = grid.cell_at(Coordinate::new(owner, 0, 0)).unwrap();
        grid.occupy(id, Entity::from_raw(7));
        grid.vacate(id, Entity::from_raw(8));
        assert_eq!(grid.occupant(id), Some(Entity::from_raw(7)));
        grid.vacate(id, Entity::from_raw(7));
        assert!(grid.can_occupy_cell(Some(id), false));
        assert!(!grid.can_occupy_cell(None, true));
    }
}
