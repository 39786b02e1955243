mod common;

use bevy::prelude::*;
use proptest::prelude::*;

use common::{config, Harness};
use rotris::block::{Block, Controllable};
use rotris::{
    Bag, Container, ContainerTag, ControlEvent, Coordinate, Direction, Grid, Rotation, ScreenDirection,
    Shape,
};

fn action(roll: usize) -> Option<ControlEvent> {
    match roll % 12 {
        0 | 1 => Some(ControlEvent::Move(ScreenDirection::Left)),
        2 | 3 => Some(ControlEvent::Move(ScreenDirection::Right)),
        4 => Some(ControlEvent::Move(ScreenDirection::Down)),
        5 => Some(ControlEvent::Rotate(Rotation::Clockwise)),
        6 => Some(ControlEvent::Rotate(Rotation::CounterClockwise)),
        7 => Some(ControlEvent::HardDrop),
        8 => Some(ControlEvent::RotateBoard(Rotation::Clockwise)),
        9 => Some(ControlEvent::RotateBoard(Rotation::CounterClockwise)),
        _ => None,
    }
}

fn occupancy_problems(h: &mut Harness) -> Vec<String> {
    let mut blocks = h.world.query_filtered::<(Entity, &Coordinate), With<Block>>();
    let grid = h.world.get_resource::<Grid>().unwrap();
    grid.occupancy_mismatches(blocks.iter(&h.world))
}

#[test]
fn quiet_board_keeps_occupancy_in_step() {
    let mut h = Harness::new(config(10, 20));
    for _ in 0..40 {
        h.tick(0.25);
        assert!(occupancy_problems(&mut h).is_empty());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn every_bag_window_is_a_full_set(seed in any::<u64>(), bags in 1usize..6) {
        let mut bag = Bag::new(seed);
        for _ in 0..bags {
            let mut window: Vec<Shape> = (0..7).map(|_| bag.pop_tetromino()).collect();
            window.sort_by_key(|s| *s as usize);
            prop_assert_eq!(window, Shape::ALL.to_vec());
        }
    }

    #[test]
    fn rectangular_containers_link_every_inner_edge(width in 1u32..12, height in 1u32..12) {
        let mut grid = Grid::new();
        let owner = Entity::from_raw(0);
        grid.build_grid(owner, &Container { tag: ContainerTag::Matrix, width, height, cell_size: 1.0 });

        let links: u32 = grid
            .cells_of(owner)
            .map(|id| Direction::ALL.iter().filter(|d| grid.neighbor(id, **d).is_some()).count() as u32)
            .sum();
        prop_assert_eq!(links, 2 * (width * (height - 1) + height * (width - 1)));
    }

    #[test]
    fn random_play_keeps_the_board_consistent(seed in any::<u64>(), steps in 1usize..60) {
        let mut h = Harness::new(rotris::BoardConfig { seed, ..config(8, 12) });
        let mut score = 0;

        for i in 0..steps {
            if let Some(event) = action((seed as usize).wrapping_add(i * 31)) {
                h.send(event);
            }
            h.tick(0.125);

            let problems = occupancy_problems(&mut h);
            prop_assert!(problems.is_empty(), "{:?}", problems);

            let mut active = h.world.query_filtered::<Entity, With<Controllable>>();
            prop_assert!(active.iter(&h.world).count() <= 1);

            let session = h.session();
            prop_assert!(session.score >= score);
            score = session.score;
            if session.game_over {
                break;
            }
        }
    }
}
