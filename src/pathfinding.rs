use std::collections::VecDeque;

use crate::constants::MAX_SEARCH_ITERATIONS;
use crate::types::Cell;
use crate::world::Grid;

/// Dequeue budget for one search: the cell count, capped so large mazes stay cheap.
pub fn search_budget(grid: &Grid) -> usize {
    grid.cell_count().min(MAX_SEARCH_ITERATIONS)
}

/// Shortest 4-connected route from `start` to `end`, both endpoints included.
///
/// `None` when the destination is a wall, lies outside the grid, or is not dequeued
/// within [`search_budget`]. A budget miss is reported as `None` even if a route exists.
pub fn find_path(grid: &Grid, start: Cell, end: Cell) -> Option<Vec<Cell>> {
    find_path_with_budget(grid, start, end, search_budget(grid))
}

pub fn find_path_with_budget(
    grid: &Grid,
    start: Cell,
    end: Cell,
    budget: usize,
) -> Option<Vec<Cell>> {
    if start == end {
        return Some(vec![start]);
    }
    if !grid.is_walkable(end) {
        return None;
    }
    let start_index = grid.index(start)?;

    let mut visited = vec![false; grid.cell_count()];
    let mut parent: Vec<Option<usize>> = vec![None; grid.cell_count()];
    let mut queue = VecDeque::new();
    visited[start_index] = true;
    queue.push_back(start);

    let mut iterations = 0;
    while iterations < budget {
        let Some(current) = queue.pop_front() else {
            break;
        };
        iterations += 1;

        if current == end {
            return Some(rebuild_path(grid, &parent, current));
        }
        let Some(current_index) = grid.index(current) else {
            continue;
        };

        for next in grid.walkable_neighbors(current) {
            let Some(next_index) = grid.index(next) else {
                continue;
            };
            if visited[next_index] {
                continue;
            }
            visited[next_index] = true;
            parent[next_index] = Some(current_index);
            queue.push_back(next);
        }
    }

    None
}

fn rebuild_path(grid: &Grid, parent: &[Option<usize>], end: Cell) -> Vec<Cell> {
    let mut path = vec![end];
    let mut cursor = grid.index(end).and_then(|index| parent[index]);
    while let Some(index) = cursor {
        path.push(grid.cell_at(index));
        cursor = parent[index];
    }
    path.reverse();
    path
}
