use crate::types::{Cell, Direction, FireState, WallCellView, WallKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WallHit {
    pub passable: bool,
    pub damaged: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adjacent {
    pub cell: Cell,
    pub wall: WallKind,
    pub direction: Direction,
}

// Wall slots belong to the source cell: crossing from `a` to its eastern
// neighbor consults `a`'s east slot and never the neighbor's west slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridWorld {
    width: i32,
    height: i32,
    walls: Vec<[WallKind; 4]>,
    fire: Vec<FireState>,
}

impl GridWorld {
    pub fn from_layout(layout: &[Vec<[WallKind; 4]>]) -> Self {
        let height = layout.len() as i32;
        let width = layout.iter().map(Vec::len).max().unwrap_or(0) as i32;
        let mut walls = Vec::with_capacity((width * height) as usize);
        for row in layout {
            for x in 0..width as usize {
                walls.push(row.get(x).copied().unwrap_or([WallKind::None; 4]));
            }
        }
        Self {
            width,
            height,
            fire: vec![FireState::Clear; walls.len()],
            walls,
        }
    }

    pub fn open(width: i32, height: i32) -> Self {
        let row = vec![[WallKind::None; 4]; width.max(0) as usize];
        Self::from_layout(&vec![row; height.max(0) as usize])
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        if !self.in_bounds(cell) {
            return None;
        }
        Some((cell.y * self.width + cell.x) as usize)
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Cell::new(x, y)))
    }

    pub fn cell_count(&self) -> usize {
        self.walls.len()
    }

    pub fn wall(&self, cell: Cell, direction: Direction) -> Option<WallKind> {
        self.index(cell).map(|idx| self.walls[idx][direction.index()])
    }

    pub fn set_wall(&mut self, cell: Cell, direction: Direction, wall: WallKind) -> bool {
        let Some(idx) = self.index(cell) else {
            return false;
        };
        self.walls[idx][direction.index()] = wall;
        true
    }

    pub fn fire_state(&self, cell: Cell) -> Option<FireState> {
        self.index(cell).map(|idx| self.fire[idx])
    }

    pub fn is_on_fire(&self, cell: Cell) -> bool {
        self.fire_state(cell) == Some(FireState::Fire)
    }

    pub fn set_fire_state(&mut self, cell: Cell, state: FireState) -> bool {
        let Some(idx) = self.index(cell) else {
            return false;
        };
        self.fire[idx] = state;
        true
    }

    pub fn cells_in_state(&self, state: FireState) -> Vec<Cell> {
        self.cells()
            .filter(|cell| self.fire_state(*cell) == Some(state))
            .collect()
    }

    pub fn adjacent(&self, cell: Cell) -> Vec<Adjacent> {
        let Some(idx) = self.index(cell) else {
            return Vec::new();
        };
        Direction::ALL
            .into_iter()
            .filter_map(|direction| {
                let neighbor = cell.offset(direction);
                self.in_bounds(neighbor).then(|| Adjacent {
                    cell: neighbor,
                    wall: self.walls[idx][direction.index()],
                    direction,
                })
            })
            .collect()
    }

    pub fn damage_wall(&mut self, cell: Cell, direction: Direction) -> WallHit {
        let Some(idx) = self.index(cell) else {
            return WallHit {
                passable: false,
                damaged: false,
            };
        };
        let slot = &mut self.walls[idx][direction.index()];
        let (next, passable) = match *slot {
            WallKind::Intact => (WallKind::Damaged, false),
            WallKind::Damaged | WallKind::OpenDoor | WallKind::ClosedDoor => (WallKind::None, true),
            WallKind::None => {
                return WallHit {
                    passable: true,
                    damaged: false,
                }
            }
        };
        *slot = next;
        WallHit {
            passable,
            damaged: true,
        }
    }

    pub fn open_door(&mut self, cell: Cell, direction: Direction) -> bool {
        let Some(idx) = self.index(cell) else {
            return false;
        };
        let slot = &mut self.walls[idx][direction.index()];
        if *slot != WallKind::ClosedDoor {
            return false;
        }
        *slot = WallKind::OpenDoor;
        true
    }

    pub fn wall_views(&self) -> Vec<WallCellView> {
        self.cells()
            .zip(self.walls.iter())
            .map(|(cell, walls)| WallCellView {
                row: cell.y,
                col: cell.x,
                walls: (*walls).map(WallKind::code),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_wall_world(wall: WallKind) -> (GridWorld, Cell) {
        let mut world = GridWorld::open(3, 3);
        let cell = Cell::new(1, 1);
        assert!(world.set_wall(cell, Direction::East, wall));
        (world, cell)
    }

    #[test]
    fn intact_wall_takes_two_hits() {
        let (mut world, cell) = single_wall_world(WallKind::Intact);

        let first = world.damage_wall(cell, Direction::East);
        assert_eq!(
            first,
            WallHit {
                passable: false,
                damaged: true
            }
        );
        assert_eq!(world.wall(cell, Direction::East), Some(WallKind::Damaged));

        let second = world.damage_wall(cell, Direction::East);
        assert_eq!(
            second,
            WallHit {
                passable: true,
                damaged: true
            }
        );
        assert_eq!(world.wall(cell, Direction::East), Some(WallKind::None));

        let third = world.damage_wall(cell, Direction::East);
        assert!(third.passable);
        assert!(!third.damaged);
    }

    #[test]
    fn doors_are_destroyed_by_one_hit() {
        for door in [WallKind::OpenDoor, WallKind::ClosedDoor] {
            let (mut world, cell) = single_wall_world(door);
            let hit = world.damage_wall(cell, Direction::East);
            assert!(hit.passable && hit.damaged);
            assert_eq!(world.wall(cell, Direction::East), Some(WallKind::None));
        }
    }

    #[test]
    fn wall_slots_are_not_mirrored_on_neighbor() {
        let (world, cell) = single_wall_world(WallKind::Intact);
        assert_eq!(world.wall(cell, Direction::East), Some(WallKind::Intact));
        assert_eq!(
            world.wall(Cell::new(2, 1), Direction::West),
            Some(WallKind::None)
        );
    }

    #[test]
    fn adjacent_skips_out_of_bounds_neighbors() {
        let world = GridWorld::open(3, 3);
        let corner = world.adjacent(Cell::new(0, 0));
        let directions: Vec<Direction> = corner.iter().map(|adj| adj.direction).collect();
        assert_eq!(directions, vec![Direction::East, Direction::South]);
        assert_eq!(world.adjacent(Cell::new(1, 1)).len(), 4);
        assert!(world.adjacent(Cell::new(-1, 0)).is_empty());
    }

    #[test]
    fn out_of_range_queries_are_not_found() {
        let mut world = GridWorld::open(2, 2);
        assert_eq!(world.fire_state(Cell::new(5, 5)), None);
        assert_eq!(world.wall(Cell::new(-1, 0), Direction::North), None);
        assert!(!world.set_fire_state(Cell::new(2, 0), FireState::Fire));
        let hit = world.damage_wall(Cell::new(9, 9), Direction::East);
        assert!(!hit.damaged);
    }

    #[test]
    fn open_door_only_affects_closed_doors() {
        let (mut world, cell) = single_wall_world(WallKind::ClosedDoor);
        assert!(world.open_door(cell, Direction::East));
        assert_eq!(world.wall(cell, Direction::East), Some(WallKind::OpenDoor));
        assert!(!world.open_door(cell, Direction::East));
    }

    #[test]
    fn cells_scan_row_major() {
        let world = GridWorld::open(2, 2);
        let cells: Vec<Cell> = world.cells().collect();
        assert_eq!(
            cells,
            vec![
                Cell::new(0, 0),
                Cell::new(1, 0),
                Cell::new(0, 1),
                Cell::new(1, 1)
            ]
        );
    }
}
