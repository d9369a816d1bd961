use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::types::Cell;
use crate::world::GridWorld;

#[derive(Debug)]
struct OpenNode {
    f: u32,
    order: u64,
    g: u32,
    idx: usize,
}

impl OpenNode {
    fn key(&self) -> (u32, u64) {
        (self.f, self.order)
    }
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap pops the lowest f first, earliest discovery on ties.
        other.key().cmp(&self.key())
    }
}

fn heuristic(a: Cell, b: Cell) -> u32 {
    a.manhattan(b) as u32
}

fn index_of(world: &GridWorld, cell: Cell) -> usize {
    (cell.y * world.width() + cell.x) as usize
}

fn cell_of(world: &GridWorld, idx: usize) -> Cell {
    let idx = idx as i32;
    Cell::new(idx % world.width(), idx / world.width())
}

/// A* from `start` to `goal` over the wall-cost graph. Returns both endpoints
/// inclusive, `[start]` when they coincide, and an empty path when either end
/// is off the grid or the goal cannot be reached.
pub fn find_path(world: &GridWorld, start: Cell, goal: Cell) -> Vec<Cell> {
    if !world.in_bounds(start) || !world.in_bounds(goal) {
        return Vec::new();
    }
    if start == goal {
        return vec![start];
    }

    let cell_count = world.cell_count();
    let mut g_score = vec![u32::MAX; cell_count];
    let mut came_from: Vec<Option<usize>> = vec![None; cell_count];
    let mut open = BinaryHeap::new();
    let mut order = 0u64;

    let start_idx = index_of(world, start);
    let goal_idx = index_of(world, goal);
    g_score[start_idx] = 0;
    open.push(OpenNode {
        f: heuristic(start, goal),
        order,
        g: 0,
        idx: start_idx,
    });

    while let Some(node) = open.pop() {
        if node.idx == goal_idx {
            return reconstruct(world, &came_from, goal_idx);
        }
        if node.g != g_score[node.idx] {
            continue;
        }

        let current = cell_of(world, node.idx);
        for adjacent in world.adjacent(current) {
            let next_idx = index_of(world, adjacent.cell);
            let tentative = node.g.saturating_add(u32::from(adjacent.wall.step_cost()));
            if tentative >= g_score[next_idx] {
                continue;
            }
            came_from[next_idx] = Some(node.idx);
            g_score[next_idx] = tentative;
            order += 1;
            open.push(OpenNode {
                f: tentative.saturating_add(heuristic(adjacent.cell, goal)),
                order,
                g: tentative,
                idx: next_idx,
            });
        }
    }

    Vec::new()
}

fn reconstruct(world: &GridWorld, came_from: &[Option<usize>], mut current: usize) -> Vec<Cell> {
    let mut path = vec![cell_of(world, current)];
    while let Some(prev) = came_from[current] {
        current = prev;
        path.push(cell_of(world, current));
    }
    path.reverse();
    path
}

pub fn path_cost(world: &GridWorld, path: &[Cell]) -> Option<u32> {
    path.windows(2).try_fold(0u32, |total, pair| {
        let direction = crate::types::Direction::between(pair[0], pair[1])?;
        let wall = world.wall(pair[0], direction)?;
        Some(total + u32::from(wall.step_cost()))
    })
}
