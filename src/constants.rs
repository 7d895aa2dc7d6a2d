use crate::types::{EnemyKind, PowerUpKind};

/// One simulation tick per rendered frame at ~60 fps.
pub const TICK_MS: u64 = 16;

/// Cell size the base speeds are tuned against.
pub const REFERENCE_CELL_SIZE: f32 = 40.0;
pub const DEFAULT_CELL_SIZE: f32 = 40.0;
pub const MIN_SAFE_CELL_SIZE: f32 = 8.0;
pub const VIEWPORT_MIN_CELL_SIZE: f32 = 20.0;
pub const VIEWPORT_MAX_CELL_SIZE: f32 = 60.0;

pub const PLAYER_BASE_SPEED: f32 = 3.0;
pub const PLAYER_LIVES: u32 = 3;
pub const HIT_INVINCIBILITY_MS: u64 = 2_000;
pub const RESPAWN_DELAY_MS: u64 = 1_000;
/// Hit radius as a fraction of the cell size.
pub const HIT_RADIUS_FACTOR: f32 = 0.6;

pub const ENEMY_SPEED_PER_LEVEL: f32 = 0.05;
pub const ENEMY_SAFE_SPAWN_DISTANCE: f32 = 8.0;
pub const ENEMY_SPAWN_ATTEMPTS: usize = 100;

pub const POWER_UP_MIN_START_DISTANCE: i32 = 3;
pub const POWER_UP_SPAWN_ATTEMPTS: usize = 200;
pub const MAX_POWER_UPS: usize = 5;

pub const BASE_COLLECT_POINTS: u64 = 100;
pub const COMBO_WINDOW_MS: u64 = 1_500;
/// Multiplier arithmetic is done in tenths so awarded points never lose a unit to rounding.
pub const COMBO_BASE_TENTHS: u32 = 10;
pub const COMBO_STEP_TENTHS: u32 = 1;
pub const COMBO_CAP_TENTHS: u32 = 30;

pub const MAX_SEARCH_ITERATIONS: usize = 800;

pub const PATROL_OFFSET: i32 = 3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyProfile {
    pub speed: f32,
    pub aggro_range: i32,
    pub replan_interval_ms: u64,
}

pub fn enemy_profile(kind: EnemyKind) -> EnemyProfile {
    match kind {
        EnemyKind::Chaser => EnemyProfile {
            speed: 1.4,
            aggro_range: 10,
            replan_interval_ms: 500,
        },
        EnemyKind::Predictive => EnemyProfile {
            speed: 1.3,
            aggro_range: 12,
            replan_interval_ms: 400,
        },
        EnemyKind::Patrol => EnemyProfile {
            speed: 1.1,
            aggro_range: 6,
            replan_interval_ms: 500,
        },
        EnemyKind::Random => EnemyProfile {
            speed: 1.0,
            aggro_range: 0,
            replan_interval_ms: 500,
        },
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowerUpProfile {
    pub duration_ms: u64,
    pub speed_multiplier: f32,
    pub score_multiplier: u32,
}

pub fn power_up_profile(kind: PowerUpKind) -> PowerUpProfile {
    match kind {
        PowerUpKind::Freeze => PowerUpProfile {
            duration_ms: 5_000,
            speed_multiplier: 1.0,
            score_multiplier: 1,
        },
        PowerUpKind::Speed => PowerUpProfile {
            duration_ms: 6_000,
            speed_multiplier: 2.0,
            score_multiplier: 1,
        },
        PowerUpKind::Invincible => PowerUpProfile {
            duration_ms: 5_000,
            speed_multiplier: 1.0,
            score_multiplier: 1,
        },
        PowerUpKind::ScoreMultiplier => PowerUpProfile {
            duration_ms: 8_000,
            speed_multiplier: 1.0,
            score_multiplier: 2,
        },
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelDefinition {
    pub enemy_count: usize,
    pub enemy_kinds: &'static [EnemyKind],
    pub theme: &'static str,
}

pub fn level_definition(level: u32) -> LevelDefinition {
    if level <= 2 {
        return LevelDefinition {
            enemy_count: 1,
            enemy_kinds: &[EnemyKind::Random],
            theme: "classic",
        };
    }
    if level <= 4 {
        return LevelDefinition {
            enemy_count: 2,
            enemy_kinds: &[EnemyKind::Random, EnemyKind::Chaser],
            theme: "jungle",
        };
    }
    if level <= 7 {
        return LevelDefinition {
            enemy_count: 3,
            enemy_kinds: &[EnemyKind::Chaser, EnemyKind::Patrol, EnemyKind::Random],
            theme: "ice",
        };
    }
    if level <= 10 {
        return LevelDefinition {
            enemy_count: 4,
            enemy_kinds: &[
                EnemyKind::Chaser,
                EnemyKind::Predictive,
                EnemyKind::Patrol,
                EnemyKind::Random,
            ],
            theme: "volcano",
        };
    }
    LevelDefinition {
        enemy_count: (5 + (level as usize - 11) / 5).min(8),
        enemy_kinds: &[
            EnemyKind::Chaser,
            EnemyKind::Predictive,
            EnemyKind::Patrol,
            EnemyKind::Predictive,
            EnemyKind::Random,
        ],
        theme: "space",
    }
}

pub fn power_up_count(level: u32) -> usize {
    (1 + level as usize / 2).min(MAX_POWER_UPS)
}

/// Picks a cell size that fits the viewport, clamped to the playable range.
pub fn compute_cell_size(viewport_width: f32, viewport_height: f32, rows: usize, cols: usize) -> f32 {
    if rows == 0 || cols == 0 {
        return DEFAULT_CELL_SIZE;
    }
    let by_width = (viewport_width / cols as f32).floor();
    let by_height = (viewport_height / rows as f32).floor();
    let size = by_width.min(by_height);
    if !size.is_finite() {
        return VIEWPORT_MIN_CELL_SIZE;
    }
    size.clamp(VIEWPORT_MIN_CELL_SIZE, VIEWPORT_MAX_CELL_SIZE)
}

/// Zero, negative or non-finite sizes collapse to the safe minimum.
pub fn sanitize_cell_size(raw: f32) -> f32 {
    if raw.is_finite() && raw >= MIN_SAFE_CELL_SIZE {
        raw
    } else {
        MIN_SAFE_CELL_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enemy_count_grows_and_caps() {
        assert_eq!(level_definition(1).enemy_count, 1);
        assert_eq!(level_definition(9).enemy_count, 4);
        assert_eq!(level_definition(11).enemy_count, 5);
        assert_eq!(level_definition(500).enemy_count, 8);
        for level in 1..60 {
            assert!(!level_definition(level).enemy_kinds.is_empty());
        }
    }

    #[test]
    fn power_up_count_is_capped() {
        assert_eq!(power_up_count(1), 1);
        assert_eq!(power_up_count(4), 3);
        assert_eq!(power_up_count(100), MAX_POWER_UPS);
    }

    #[test]
    fn viewport_cell_size_is_clamped() {
        assert_eq!(compute_cell_size(4_000.0, 4_000.0, 10, 10), VIEWPORT_MAX_CELL_SIZE);
        assert_eq!(compute_cell_size(100.0, 100.0, 50, 50), VIEWPORT_MIN_CELL_SIZE);
        assert_eq!(compute_cell_size(300.0, 500.0, 10, 10), 30.0);
        assert_eq!(compute_cell_size(300.0, 500.0, 0, 10), DEFAULT_CELL_SIZE);
    }

    #[test]
    fn degenerate_cell_size_is_sanitized() {
        assert_eq!(sanitize_cell_size(0.0), MIN_SAFE_CELL_SIZE);
        assert_eq!(sanitize_cell_size(-12.0), MIN_SAFE_CELL_SIZE);
        assert_eq!(sanitize_cell_size(f32::NAN), MIN_SAFE_CELL_SIZE);
        assert_eq!(sanitize_cell_size(32.0), 32.0);
    }
}
