use serde::{Deserialize, Serialize};

/// Discrete grid coordinate: `x` is the column, `y` the row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: Cell) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn offset(self, dir: Direction) -> Cell {
        let (dx, dy) = dir.delta();
        Cell::new(self.x + dx, self.y + dy)
    }
}

/// Continuous position in pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Down,
        Direction::Up,
        Direction::Right,
        Direction::Left,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    Chaser,
    #[serde(alias = "smart")]
    Predictive,
    Patrol,
    Random,
}

impl EnemyKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "chaser" => Some(Self::Chaser),
            "predictive" | "smart" => Some(Self::Predictive),
            "patrol" => Some(Self::Patrol),
            "random" => Some(Self::Random),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    Freeze,
    Speed,
    Invincible,
    #[serde(alias = "multiplier")]
    ScoreMultiplier,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 4] = [
        PowerUpKind::Freeze,
        PowerUpKind::Speed,
        PowerUpKind::Invincible,
        PowerUpKind::ScoreMultiplier,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelStatus {
    Loading,
    LoadFailed,
    Active,
    Paused,
    Completed,
    Failed,
}

impl LevelStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LevelStatus::Completed | LevelStatus::Failed | LevelStatus::LoadFailed
        )
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub x: f32,
    pub y: f32,
    pub cell: Cell,
    pub lives: u32,
    pub invincible: bool,
    #[serde(rename = "invincibleRemainingMs")]
    pub invincible_remaining_ms: u64,
    pub path: Vec<Cell>,
    #[serde(rename = "targetIndex")]
    pub target_index: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct EnemyView {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub cell: Cell,
    #[serde(rename = "type")]
    pub kind: EnemyKind,
    pub frozen: bool,
    #[serde(rename = "frozenRemainingMs")]
    pub frozen_remaining_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct PowerUpView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PowerUpKind,
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActiveEffectView {
    #[serde(rename = "type")]
    pub kind: PowerUpKind,
    #[serde(rename = "remainingMs")]
    pub remaining_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ComboView {
    pub count: u32,
    pub multiplier: f64,
}

/// Everything the progress tracker needs once a level is won.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LevelCompletion {
    pub level: u32,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    pub score: u64,
    #[serde(rename = "foodsCollected")]
    pub foods_collected: u32,
    #[serde(rename = "totalFoods")]
    pub total_foods: u32,
    #[serde(rename = "damageTaken")]
    pub damage_taken: bool,
    #[serde(rename = "usedPowerUps")]
    pub used_power_ups: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    ItemCollected {
        x: i32,
        y: i32,
        points: u64,
        #[serde(rename = "comboCount")]
        combo_count: u32,
        #[serde(rename = "comboMultiplier")]
        combo_multiplier: f64,
    },
    PowerUpCollected {
        id: String,
        #[serde(rename = "powerUpType")]
        kind: PowerUpKind,
        x: i32,
        y: i32,
        #[serde(rename = "expiresInMs")]
        expires_in_ms: u64,
    },
    PowerUpExpired {
        #[serde(rename = "powerUpType")]
        kind: PowerUpKind,
    },
    PlayerHit {
        #[serde(rename = "enemyId")]
        enemy_id: String,
        #[serde(rename = "livesLeft")]
        lives_left: u32,
    },
    PlayerRespawned {
        x: f32,
        y: f32,
    },
    LevelCompleted {
        completion: LevelCompletion,
    },
    LevelFailed {
        level: u32,
        #[serde(rename = "elapsedMs")]
        elapsed_ms: u64,
        score: u64,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    pub level: u32,
    pub status: LevelStatus,
    #[serde(rename = "cellSize")]
    pub cell_size: f32,
    pub score: u64,
    #[serde(rename = "foodsCollected")]
    pub foods_collected: u32,
    #[serde(rename = "totalFoods")]
    pub total_foods: u32,
    #[serde(rename = "remainingCollectibles")]
    pub remaining_collectibles: usize,
    pub player: PlayerView,
    pub enemies: Vec<EnemyView>,
    #[serde(rename = "powerUps")]
    pub power_ups: Vec<PowerUpView>,
    #[serde(rename = "activeEffects")]
    pub active_effects: Vec<ActiveEffectView>,
    pub combo: ComboView,
    pub events: Vec<RuntimeEvent>,
}

/// Static level layout sent once before the first snapshot.
#[derive(Clone, Debug, Serialize)]
pub struct WorldInit {
    pub level: u32,
    pub rows: usize,
    pub cols: usize,
    pub tiles: Vec<String>,
    pub start: Cell,
    pub goal: Cell,
    pub theme: String,
    pub collectibles: Vec<Cell>,
}
