use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::constants::level_definition;
use crate::error::LevelLoadError;
use crate::types::{Cell, Direction, EnemyKind, WorldInit};

pub const WALL_SYMBOL: &str = "#";
pub const EMPTY_SYMBOL: &str = " ";

/// Enemy roster for a level: how many, and the variant rotation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SpawnDescriptor {
    pub count: usize,
    pub kinds: Vec<EnemyKind>,
}

/// Level as handed over by the maze source.
#[derive(Clone, Debug, Deserialize)]
pub struct LevelDescriptor {
    #[serde(default = "default_level")]
    pub level: u32,
    pub rows: usize,
    pub cols: usize,
    pub maze_grid: Vec<Vec<String>>,
    pub start: [i32; 2],
    pub goal: [i32; 2],
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub total_foods: Option<u32>,
    #[serde(default)]
    pub enemies: Option<SpawnDescriptor>,
}

fn default_level() -> u32 {
    1
}

impl LevelDescriptor {
    pub fn from_json(raw: &str) -> Result<Self, LevelLoadError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Builds a descriptor from text rows, one symbol per character.
    pub fn from_rows(level: u32, rows: &[&str], start: Cell, goal: Cell) -> Self {
        let maze_grid: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.chars().map(|c| c.to_string()).collect())
            .collect();
        Self {
            level,
            rows: maze_grid.len(),
            cols: maze_grid.first().map(|row| row.len()).unwrap_or(0),
            maze_grid,
            start: [start.x, start.y],
            goal: [goal.x, goal.y],
            theme: None,
            total_foods: None,
            enemies: None,
        }
    }

    pub fn spawn_descriptor(&self) -> SpawnDescriptor {
        if let Some(spawn) = &self.enemies {
            if !spawn.kinds.is_empty() {
                return spawn.clone();
            }
        }
        let definition = level_definition(self.level);
        SpawnDescriptor {
            count: definition.enemy_count,
            kinds: definition.enemy_kinds.to_vec(),
        }
    }

    pub fn theme(&self) -> String {
        self.theme
            .clone()
            .unwrap_or_else(|| level_definition(self.level).theme.to_string())
    }
}

pub fn level_file_path(dir: &Path, level: u32) -> PathBuf {
    dir.join(format!("level_{level}.json"))
}

pub fn load_level_file(path: &Path) -> Result<LevelDescriptor, LevelLoadError> {
    let raw = fs::read_to_string(path).map_err(|error| LevelLoadError::Io {
        path: path.to_string_lossy().to_string(),
        message: error.to_string(),
    })?;
    LevelDescriptor::from_json(&raw)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellKind {
    Wall,
    Empty,
    Collectible,
}

impl CellKind {
    fn from_symbol(symbol: &str) -> Self {
        match symbol {
            WALL_SYMBOL => CellKind::Wall,
            EMPTY_SYMBOL | "" => CellKind::Empty,
            _ => CellKind::Collectible,
        }
    }
}

/// Row-major maze owned by the simulation loop.
///
/// Only collection mutates it, and a collectible becomes empty at most once.
#[derive(Clone, Debug)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<CellKind>,
    start: Cell,
    goal: Cell,
    remaining_collectibles: usize,
}

impl Grid {
    pub fn from_descriptor(descriptor: &LevelDescriptor) -> Result<Self, LevelLoadError> {
        let rows = descriptor.maze_grid.len();
        if rows == 0 || descriptor.rows == 0 || descriptor.cols == 0 {
            return Err(LevelLoadError::EmptyGrid);
        }
        if rows != descriptor.rows {
            return Err(LevelLoadError::DimensionMismatch {
                expected: descriptor.rows,
                actual: rows,
                axis: "rows",
            });
        }

        let cols = descriptor.cols;
        let mut cells = Vec::with_capacity(rows * cols);
        for row in &descriptor.maze_grid {
            if row.len() != cols {
                return Err(LevelLoadError::DimensionMismatch {
                    expected: cols,
                    actual: row.len(),
                    axis: "cols",
                });
            }
            cells.extend(row.iter().map(|symbol| CellKind::from_symbol(symbol)));
        }

        let remaining_collectibles = cells
            .iter()
            .filter(|kind| **kind == CellKind::Collectible)
            .count();
        let grid = Self {
            rows,
            cols,
            cells,
            start: Cell::new(descriptor.start[0], descriptor.start[1]),
            goal: Cell::new(descriptor.goal[0], descriptor.goal[1]),
            remaining_collectibles,
        };
        grid.check_endpoint("start", grid.start)?;
        grid.check_endpoint("goal", grid.goal)?;
        Ok(grid)
    }

    fn check_endpoint(&self, what: &'static str, cell: Cell) -> Result<(), LevelLoadError> {
        if !self.in_bounds(cell) {
            return Err(LevelLoadError::OutOfBounds {
                what,
                x: cell.x,
                y: cell.y,
            });
        }
        if !self.is_walkable(cell) {
            return Err(LevelLoadError::BlockedEndpoint {
                what,
                x: cell.x,
                y: cell.y,
            });
        }
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn start(&self) -> Cell {
        self.start
    }

    pub fn goal(&self) -> Cell {
        self.goal
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn remaining_collectibles(&self) -> usize {
        self.remaining_collectibles
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < self.cols && (cell.y as usize) < self.rows
    }

    pub fn index(&self, cell: Cell) -> Option<usize> {
        if !self.in_bounds(cell) {
            return None;
        }
        Some(cell.y as usize * self.cols + cell.x as usize)
    }

    pub fn cell_at(&self, index: usize) -> Cell {
        Cell::new((index % self.cols) as i32, (index / self.cols) as i32)
    }

    pub fn kind(&self, cell: Cell) -> Option<CellKind> {
        self.index(cell).map(|index| self.cells[index])
    }

    pub fn is_walkable(&self, cell: Cell) -> bool {
        matches!(
            self.kind(cell),
            Some(CellKind::Empty) | Some(CellKind::Collectible)
        )
    }

    /// Turns a collectible into an empty cell. Returns whether anything was collected.
    pub fn collect(&mut self, cell: Cell) -> bool {
        let Some(index) = self.index(cell) else {
            return false;
        };
        if self.cells[index] != CellKind::Collectible {
            return false;
        }
        self.cells[index] = CellKind::Empty;
        self.remaining_collectibles -= 1;
        true
    }

    pub fn clamp(&self, cell: Cell) -> Cell {
        Cell::new(
            cell.x.clamp(0, self.cols as i32 - 1),
            cell.y.clamp(0, self.rows as i32 - 1),
        )
    }

    pub fn walkable_neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        Direction::ALL
            .into_iter()
            .map(move |dir| cell.offset(dir))
            .filter(|next| self.is_walkable(*next))
    }

    pub fn collectible_cells(&self) -> Vec<Cell> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, kind)| **kind == CellKind::Collectible)
            .map(|(index, _)| self.cell_at(index))
            .collect()
    }

    pub fn walkable_cells(&self) -> Vec<Cell> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, kind)| **kind != CellKind::Wall)
            .map(|(index, _)| self.cell_at(index))
            .collect()
    }

    pub fn tiles(&self) -> Vec<String> {
        (0..self.rows)
            .map(|row| {
                self.cells[row * self.cols..(row + 1) * self.cols]
                    .iter()
                    .map(|kind| match kind {
                        CellKind::Wall => '#',
                        CellKind::Empty => ' ',
                        CellKind::Collectible => '.',
                    })
                    .collect::<String>()
            })
            .collect()
    }
}

pub fn to_world_init(level: u32, theme: &str, grid: &Grid) -> WorldInit {
    WorldInit {
        level,
        rows: grid.rows(),
        cols: grid.cols(),
        tiles: grid.tiles(),
        start: grid.start(),
        goal: grid.goal(),
        theme: theme.to_string(),
        collectibles: grid.collectible_cells(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor() -> LevelDescriptor {
        LevelDescriptor::from_rows(
            1,
            &["..#..", ". #  ", "....."],
            Cell::new(0, 0),
            Cell::new(4, 2),
        )
    }

    #[test]
    fn parses_symbols_into_cell_kinds() {
        let grid = Grid::from_descriptor(&corridor()).expect("valid grid");
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.cols(), 5);
        assert_eq!(grid.kind(Cell::new(2, 0)), Some(CellKind::Wall));
        assert_eq!(grid.kind(Cell::new(1, 1)), Some(CellKind::Empty));
        assert_eq!(grid.kind(Cell::new(0, 2)), Some(CellKind::Collectible));
        assert_eq!(grid.kind(Cell::new(5, 0)), None);
        assert_eq!(grid.remaining_collectibles(), 10);
    }

    #[test]
    fn collect_transitions_exactly_once() {
        let mut grid = Grid::from_descriptor(&corridor()).expect("valid grid");
        let before = grid.remaining_collectibles();
        assert!(grid.collect(Cell::new(1, 0)));
        assert!(!grid.collect(Cell::new(1, 0)));
        assert!(!grid.collect(Cell::new(2, 0)));
        assert!(!grid.collect(Cell::new(-1, 0)));
        assert_eq!(grid.remaining_collectibles(), before - 1);
        assert_eq!(grid.kind(Cell::new(1, 0)), Some(CellKind::Empty));
    }

    #[test]
    fn rejects_wall_endpoints_and_bad_dimensions() {
        let walled_goal =
            LevelDescriptor::from_rows(1, &["..#"], Cell::new(0, 0), Cell::new(2, 0));
        assert_eq!(
            Grid::from_descriptor(&walled_goal).err(),
            Some(LevelLoadError::BlockedEndpoint {
                what: "goal",
                x: 2,
                y: 0
            })
        );

        let outside = LevelDescriptor::from_rows(1, &["..."], Cell::new(0, 3), Cell::new(2, 0));
        assert!(matches!(
            Grid::from_descriptor(&outside),
            Err(LevelLoadError::OutOfBounds { what: "start", .. })
        ));

        let mut ragged = corridor();
        ragged.maze_grid[1].pop();
        assert!(matches!(
            Grid::from_descriptor(&ragged),
            Err(LevelLoadError::DimensionMismatch { axis: "cols", .. })
        ));

        let mut empty = corridor();
        empty.maze_grid.clear();
        assert_eq!(
            Grid::from_descriptor(&empty).err(),
            Some(LevelLoadError::EmptyGrid)
        );
    }

    #[test]
    fn parses_json_descriptor_with_defaults() {
        let raw = r##"{
            "level": 4,
            "rows": 2,
            "cols": 3,
            "maze_grid": [["#", " ", "🍗"], ["🍕", " ", "#"]],
            "start": [1, 0],
            "goal": [1, 1],
            "total_foods": 2
        }"##;
        let descriptor = LevelDescriptor::from_json(raw).expect("descriptor parses");
        let grid = Grid::from_descriptor(&descriptor).expect("valid grid");
        assert_eq!(grid.remaining_collectibles(), 2);
        assert_eq!(descriptor.theme(), "jungle");
        let spawn = descriptor.spawn_descriptor();
        assert_eq!(spawn.count, 2);
        assert_eq!(spawn.kinds, vec![EnemyKind::Random, EnemyKind::Chaser]);
    }

    #[test]
    fn explicit_spawn_descriptor_wins() {
        let raw = r##"{
            "rows": 1, "cols": 2, "maze_grid": [[" ", " "]],
            "start": [0, 0], "goal": [1, 0],
            "enemies": { "count": 3, "kinds": ["smart", "patrol"] }
        }"##;
        let descriptor = LevelDescriptor::from_json(raw).expect("descriptor parses");
        assert_eq!(descriptor.level, 1);
        assert_eq!(
            descriptor.spawn_descriptor(),
            SpawnDescriptor {
                count: 3,
                kinds: vec![EnemyKind::Predictive, EnemyKind::Patrol],
            }
        );
    }

    #[test]
    fn malformed_json_is_a_load_error() {
        assert!(matches!(
            LevelDescriptor::from_json("{\"rows\": 1"),
            Err(LevelLoadError::Malformed { .. })
        ));
    }

    #[test]
    fn missing_level_file_is_an_io_error() {
        let path = std::env::temp_dir()
            .join("tiger-maze-missing-dir")
            .join("level_1.json");
        assert!(matches!(
            load_level_file(&path),
            Err(LevelLoadError::Io { .. })
        ));
    }

    #[test]
    fn walkable_neighbors_skip_walls_and_edges() {
        let grid = Grid::from_descriptor(&corridor()).expect("valid grid");
        let neighbors: Vec<Cell> = grid.walkable_neighbors(Cell::new(0, 0)).collect();
        assert_eq!(neighbors, vec![Cell::new(0, 1), Cell::new(1, 0)]);
    }
}
