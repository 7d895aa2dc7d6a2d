use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::REFERENCE_CELL_SIZE;
use crate::types::{Cell, Position};

pub fn now_ms() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    now as u64
}

/// Grid cell under a continuous position: floor division by the cell size.
pub(super) fn cell_of(position: Position, cell_size: f32) -> Cell {
    Cell::new(
        (position.x / cell_size).floor() as i32,
        (position.y / cell_size).floor() as i32,
    )
}

pub(super) fn cell_center(cell: Cell, cell_size: f32) -> Position {
    Position::new(
        (cell.x as f32 + 0.5) * cell_size,
        (cell.y as f32 + 0.5) * cell_size,
    )
}

/// Pixels per tick for a base rate tuned at the reference cell size.
pub(super) fn tick_speed(base: f32, cell_size: f32, multiplier: f32) -> f32 {
    base * (cell_size / REFERENCE_CELL_SIZE) * multiplier
}

pub(super) fn remaining_ms(until: u64, now_ms: u64) -> u64 {
    until.saturating_sub(now_ms)
}
