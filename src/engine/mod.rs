use std::collections::HashSet;

use tracing::{debug, info};

use crate::constants::{
    enemy_profile, power_up_count, sanitize_cell_size, BASE_COLLECT_POINTS, DEFAULT_CELL_SIZE,
    ENEMY_SAFE_SPAWN_DISTANCE, ENEMY_SPAWN_ATTEMPTS, ENEMY_SPEED_PER_LEVEL, HIT_INVINCIBILITY_MS,
    PLAYER_BASE_SPEED, PLAYER_LIVES, POWER_UP_MIN_START_DISTANCE, POWER_UP_SPAWN_ATTEMPTS,
    RESPAWN_DELAY_MS,
};
use crate::error::LevelLoadError;
use crate::pathfinding::find_path;
use crate::rng::{RandomSource, Rng};
use crate::types::{
    Cell, Direction, EnemyKind, EnemyView, LevelCompletion, LevelStatus, PlayerView, Position,
    PowerUpKind, RuntimeEvent, Snapshot, WorldInit,
};
use crate::world::{to_world_init, Grid, LevelDescriptor, SpawnDescriptor};

pub mod collision;
pub mod combo;
pub mod enemy_ai;
pub mod movement;
pub mod power_ups;
mod spawn_system;
mod utils;

use self::collision::{detect_hit, EnemyBody};
use self::combo::ComboScorer;
use self::enemy_ai::{behavior_for, AiContext, EnemyCtx};
use self::movement::{advance, PathFollower};
use self::power_ups::{apply_freeze, EffectStacking, FreezeState, PowerUp, PowerUpManager};
use self::utils::{cell_center, cell_of, remaining_ms, tick_speed};

pub use self::utils::now_ms;

#[derive(Clone, Debug)]
struct PlayerInternal {
    position: Position,
    follower: PathFollower,
    lives: u32,
    invincible_until: u64,
    respawn_at: Option<u64>,
}

#[derive(Clone, Debug)]
struct EnemyInternal {
    id: String,
    kind: EnemyKind,
    position: Position,
    speed: f32,
    follower: PathFollower,
    freeze: FreezeState,
    next_replan_at: u64,
}

#[derive(Clone, Debug)]
pub struct EngineOptions {
    pub cell_size: f32,
    pub seed: u32,
    /// Player pixels per tick at the reference cell size.
    pub player_base_speed: f32,
    pub player_lives: u32,
    pub stacking: EffectStacking,
    /// Fixed enemy roster; bypasses random spawning when set.
    pub enemy_placements: Option<Vec<(EnemyKind, Cell)>>,
    /// Fixed pickups; bypasses random placement when set.
    pub power_up_placements: Option<Vec<(PowerUpKind, Cell)>>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            seed: 1,
            player_base_speed: PLAYER_BASE_SPEED,
            player_lives: PLAYER_LIVES,
            stacking: EffectStacking::Refresh,
            enemy_placements: None,
            power_up_placements: None,
        }
    }
}

/// Owns one level's simulation state and advances it one tick at a time.
///
/// Every timestamp handed in is wall-clock milliseconds; internally everything runs on a
/// simulation clock that starts at zero and does not advance while paused.
#[derive(Clone, Debug)]
pub struct GameEngine<R: RandomSource = Rng> {
    level: u32,
    theme: String,
    grid: Grid,
    cell_size: f32,
    options: EngineOptions,
    rng: R,

    player: PlayerInternal,
    enemies: Vec<EnemyInternal>,
    power_ups: PowerUpManager,
    combo: ComboScorer,
    events: Vec<RuntimeEvent>,

    status: LevelStatus,
    started_at_ms: u64,
    paused_total_ms: u64,
    paused_at_ms: Option<u64>,
    elapsed_ms: u64,
    tick_counter: u64,

    score: u64,
    foods_collected: u32,
    total_foods: u32,
    damage_taken: bool,
    completion: Option<LevelCompletion>,
    next_id_counter: u64,
}

impl GameEngine<Rng> {
    pub fn new(
        descriptor: &LevelDescriptor,
        options: EngineOptions,
        now_ms: u64,
    ) -> Result<Self, LevelLoadError> {
        let rng = Rng::new(options.seed);
        Self::with_rng(descriptor, options, rng, now_ms)
    }
}

impl<R: RandomSource> GameEngine<R> {
    pub fn with_rng(
        descriptor: &LevelDescriptor,
        options: EngineOptions,
        rng: R,
        now_ms: u64,
    ) -> Result<Self, LevelLoadError> {
        let grid = Grid::from_descriptor(descriptor)?;
        let cell_size = sanitize_cell_size(options.cell_size);
        let total_foods = descriptor
            .total_foods
            .unwrap_or(grid.remaining_collectibles() as u32);

        let mut engine = Self {
            level: descriptor.level,
            theme: descriptor.theme(),
            cell_size,
            rng,
            player: PlayerInternal {
                position: cell_center(grid.start(), cell_size),
                follower: PathFollower::default(),
                lives: options.player_lives.max(1),
                invincible_until: 0,
                respawn_at: None,
            },
            grid,
            options,
            enemies: Vec::new(),
            power_ups: PowerUpManager::default(),
            combo: ComboScorer::default(),
            events: Vec::new(),
            status: LevelStatus::Active,
            started_at_ms: now_ms,
            paused_total_ms: 0,
            paused_at_ms: None,
            elapsed_ms: 0,
            tick_counter: 0,
            score: 0,
            foods_collected: 0,
            total_foods,
            damage_taken: false,
            completion: None,
            next_id_counter: 1,
        };

        engine.spawn_enemies(&descriptor.spawn_descriptor());
        let pickups = engine.place_power_ups();
        engine.power_ups = PowerUpManager::new(pickups, engine.options.stacking);

        info!(
            level = engine.level,
            rows = engine.grid.rows(),
            cols = engine.grid.cols(),
            enemies = engine.enemies.len(),
            power_ups = engine.power_ups.pickups().len(),
            collectibles = engine.grid.remaining_collectibles(),
            "level started"
        );
        Ok(engine)
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn status(&self) -> LevelStatus {
        self.status
    }

    pub fn is_ended(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn completion(&self) -> Option<&LevelCompletion> {
        self.completion.as_ref()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.player.lives
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn player_cell(&self) -> Cell {
        cell_of(self.player.position, self.cell_size)
    }

    /// True when the player has no waypoints left to walk.
    pub fn player_route_done(&self) -> bool {
        self.player.follower.is_exhausted()
    }

    pub fn world_init(&self) -> WorldInit {
        to_world_init(self.level, &self.theme, &self.grid)
    }

    fn sim_now(&self, now_ms: u64) -> u64 {
        now_ms
            .saturating_sub(self.started_at_ms)
            .saturating_sub(self.paused_total_ms)
    }

    /// Plans a player route to `target`. Walls, out-of-bounds and unreachable cells are ignored.
    pub fn request_move(&mut self, target: Cell) -> bool {
        if self.status != LevelStatus::Active || self.player.respawn_at.is_some() {
            return false;
        }
        if !self.grid.is_walkable(target) {
            return false;
        }
        let from = self.player_cell();
        match find_path(&self.grid, from, target) {
            Some(path) => {
                self.player.follower.assign(path);
                true
            }
            None => false,
        }
    }

    pub fn request_step(&mut self, dir: Direction) -> bool {
        let target = self.player_cell().offset(dir);
        self.request_move(target)
    }

    pub fn pause(&mut self, now_ms: u64) -> bool {
        if self.status != LevelStatus::Active {
            return false;
        }
        self.status = LevelStatus::Paused;
        self.paused_at_ms = Some(now_ms);
        true
    }

    pub fn resume(&mut self, now_ms: u64) -> bool {
        if self.status != LevelStatus::Paused {
            return false;
        }
        if let Some(paused_at) = self.paused_at_ms.take() {
            self.paused_total_ms = self
                .paused_total_ms
                .saturating_add(now_ms.saturating_sub(paused_at));
        }
        self.status = LevelStatus::Active;
        true
    }

    /// Applies a new cell size and rescales every continuous position to match.
    pub fn set_cell_size(&mut self, raw: f32) {
        let next = sanitize_cell_size(raw);
        let ratio = next / self.cell_size;
        let scale = |position: &mut Position| {
            position.x *= ratio;
            position.y *= ratio;
        };
        scale(&mut self.player.position);
        for enemy in &mut self.enemies {
            scale(&mut enemy.position);
        }
        self.cell_size = next;
    }

    pub fn tick(&mut self, now_ms: u64) -> Snapshot {
        self.step(now_ms);
        self.build_snapshot(true)
    }

    pub fn step(&mut self, now_ms: u64) {
        if self.status != LevelStatus::Active {
            return;
        }
        let now = self.sim_now(now_ms).max(self.elapsed_ms);
        self.elapsed_ms = now;
        self.tick_counter += 1;

        self.update_respawn(now);
        if self.update_player(now) {
            return;
        }
        self.update_enemies(now);
        self.replan_enemies(now);
        if self.resolve_collision(now) {
            return;
        }
        for effect in self.power_ups.tick(now) {
            debug!(kind = ?effect.kind, "power-up expired");
            self.events
                .push(RuntimeEvent::PowerUpExpired { kind: effect.kind });
        }
        for enemy in &mut self.enemies {
            enemy.freeze.thaw_if_expired(now);
        }
        self.combo.expire(now);
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let now = self.elapsed_ms;
        let invincible_until = self.player.invincible_until.max(
            self.power_ups
                .expires_at(PowerUpKind::Invincible)
                .unwrap_or(0),
        );

        Snapshot {
            tick: self.tick_counter,
            elapsed_ms: now,
            level: self.level,
            status: self.status,
            cell_size: self.cell_size,
            score: self.score,
            foods_collected: self.foods_collected,
            total_foods: self.total_foods,
            remaining_collectibles: self.grid.remaining_collectibles(),
            player: PlayerView {
                x: self.player.position.x,
                y: self.player.position.y,
                cell: self.player_cell(),
                lives: self.player.lives,
                invincible: invincible_until > now,
                invincible_remaining_ms: remaining_ms(invincible_until, now),
                path: self.player.follower.path.clone(),
                target_index: self.player.follower.target_index,
            },
            enemies: self
                .enemies
                .iter()
                .map(|enemy| EnemyView {
                    id: enemy.id.clone(),
                    x: enemy.position.x,
                    y: enemy.position.y,
                    cell: cell_of(enemy.position, self.cell_size),
                    kind: enemy.kind,
                    frozen: enemy.freeze.is_active(now),
                    frozen_remaining_ms: if enemy.freeze.frozen {
                        remaining_ms(enemy.freeze.frozen_until, now)
                    } else {
                        0
                    },
                })
                .collect(),
            power_ups: self.power_ups.pickup_views(),
            active_effects: self.power_ups.active_effects(now),
            combo: self.combo.view(),
            events: if include_events {
                std::mem::take(&mut self.events)
            } else {
                Vec::new()
            },
        }
    }

    fn update_respawn(&mut self, now: u64) {
        let Some(respawn_at) = self.player.respawn_at else {
            return;
        };
        if now < respawn_at {
            return;
        }
        self.player.respawn_at = None;
        self.player.invincible_until = 0;
        self.player.position = cell_center(self.grid.start(), self.cell_size);
        self.player.follower.clear();
        debug!(lives = self.player.lives, "player respawned");
        self.events.push(RuntimeEvent::PlayerRespawned {
            x: self.player.position.x,
            y: self.player.position.y,
        });
    }

    /// Moves the player and handles at most one arrival. Returns true once the level is won.
    fn update_player(&mut self, now: u64) -> bool {
        if self.player.respawn_at.is_some() {
            return false;
        }
        let speed = tick_speed(
            self.options.player_base_speed,
            self.cell_size,
            self.power_ups.speed_multiplier(now),
        );
        let Some(arrived) = advance(
            &mut self.player.position,
            &mut self.player.follower,
            speed,
            self.cell_size,
        ) else {
            return false;
        };

        if self.grid.collect(arrived) {
            self.combo.on_collect(now);
            let points = self
                .combo
                .points(BASE_COLLECT_POINTS, self.power_ups.score_multiplier(now));
            self.score += points;
            self.foods_collected += 1;
            self.events.push(RuntimeEvent::ItemCollected {
                x: arrived.x,
                y: arrived.y,
                points,
                combo_count: self.combo.count(),
                combo_multiplier: self.combo.multiplier(),
            });
        }

        if let Some((pickup, effect)) = self.power_ups.collect_at(arrived, now) {
            if pickup.kind == PowerUpKind::Freeze {
                apply_freeze(
                    self.enemies.iter_mut().map(|enemy| &mut enemy.freeze),
                    effect.expires_at,
                );
            }
            debug!(id = %pickup.id, kind = ?pickup.kind, expires_at = effect.expires_at, "power-up collected");
            self.events.push(RuntimeEvent::PowerUpCollected {
                id: pickup.id,
                kind: pickup.kind,
                x: arrived.x,
                y: arrived.y,
                expires_in_ms: remaining_ms(effect.expires_at, now),
            });
        }

        if arrived == self.grid.goal() {
            self.complete(now);
            return true;
        }
        false
    }

    fn update_enemies(&mut self, now: u64) {
        for enemy in &mut self.enemies {
            if enemy.freeze.is_active(now) {
                continue;
            }
            let speed = tick_speed(enemy.speed, self.cell_size, 1.0);
            advance(&mut enemy.position, &mut enemy.follower, speed, self.cell_size);
        }
    }

    fn replan_enemies(&mut self, now: u64) {
        let player_cell = self.player_cell();
        let ctx = AiContext {
            grid: &self.grid,
            player_cell,
            player_next: self
                .player
                .follower
                .upcoming_from(player_cell)
                .unwrap_or(player_cell),
        };
        for enemy in &mut self.enemies {
            if enemy.freeze.is_active(now) || now < enemy.next_replan_at {
                continue;
            }
            let profile = enemy_profile(enemy.kind);
            enemy.next_replan_at = now + profile.replan_interval_ms;
            let me = EnemyCtx {
                cell: cell_of(enemy.position, self.cell_size),
                path_exhausted: enemy.follower.is_exhausted(),
                profile,
            };
            if let Some(path) = behavior_for(enemy.kind)(&me, &ctx, &mut self.rng) {
                enemy.follower.assign(path);
            }
        }
    }

    /// Applies the first hit of this tick. Returns true when it ended the level.
    fn resolve_collision(&mut self, now: u64) -> bool {
        let protected = self.player.invincible_until > now
            || self.power_ups.is_active(PowerUpKind::Invincible, now);
        let bodies = self.enemies.iter().map(|enemy| EnemyBody {
            position: enemy.position,
            frozen: enemy.freeze.is_active(now),
        });
        let Some(index) = detect_hit(self.player.position, protected, bodies, self.cell_size)
        else {
            return false;
        };

        let enemy_id = self.enemies[index].id.clone();
        self.damage_taken = true;
        if self.player.lives <= 1 {
            self.player.lives = 0;
            self.events.push(RuntimeEvent::PlayerHit {
                enemy_id,
                lives_left: 0,
            });
            self.fail(now);
            return true;
        }

        self.player.lives -= 1;
        self.player.invincible_until = now + HIT_INVINCIBILITY_MS;
        self.player.respawn_at = Some(now + RESPAWN_DELAY_MS);
        debug!(%enemy_id, lives = self.player.lives, "player hit");
        self.events.push(RuntimeEvent::PlayerHit {
            enemy_id,
            lives_left: self.player.lives,
        });
        false
    }

    fn complete(&mut self, now: u64) {
        let completion = LevelCompletion {
            level: self.level,
            elapsed_ms: now,
            score: self.score,
            foods_collected: self.foods_collected,
            total_foods: self.total_foods,
            damage_taken: self.damage_taken,
            used_power_ups: self.power_ups.used_any(),
        };
        info!(
            level = self.level,
            elapsed_ms = now,
            score = self.score,
            foods = self.foods_collected,
            "level completed"
        );
        self.status = LevelStatus::Completed;
        self.events.push(RuntimeEvent::LevelCompleted {
            completion: completion.clone(),
        });
        self.completion = Some(completion);
    }

    fn fail(&mut self, now: u64) {
        info!(level = self.level, elapsed_ms = now, score = self.score, "level failed");
        self.status = LevelStatus::Failed;
        self.player.follower.clear();
        self.events.push(RuntimeEvent::LevelFailed {
            level: self.level,
            elapsed_ms: now,
            score: self.score,
        });
    }

    fn make_id(&mut self, prefix: &str) -> String {
        let id = format!("{}_{}", prefix, self.next_id_counter);
        self.next_id_counter = self.next_id_counter.saturating_add(1);
        id
    }
}
