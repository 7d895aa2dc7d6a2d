use super::*;

impl<R: RandomSource> GameEngine<R> {
    pub(super) fn spawn_enemies(&mut self, spawn: &SpawnDescriptor) {
        if let Some(placements) = self.options.enemy_placements.clone() {
            for (kind, cell) in placements {
                if self.grid.is_walkable(cell) {
                    self.push_enemy(kind, cell);
                } else {
                    debug!(x = cell.x, y = cell.y, "skipping enemy placement on a wall");
                }
            }
            return;
        }
        if spawn.kinds.is_empty() {
            return;
        }

        for index in 0..spawn.count {
            let kind = spawn.kinds[index % spawn.kinds.len()];
            match self.pick_enemy_spawn_cell() {
                Some(cell) => self.push_enemy(kind, cell),
                None => debug!(index, "no passable spawn cell found for enemy"),
            }
        }
    }

    fn push_enemy(&mut self, kind: EnemyKind, cell: Cell) {
        let id = self.make_id("enemy");
        let speed = enemy_profile(kind).speed + ENEMY_SPEED_PER_LEVEL * self.level as f32;
        debug!(%id, ?kind, x = cell.x, y = cell.y, speed, "spawned enemy");
        self.enemies.push(EnemyInternal {
            id,
            kind,
            position: cell_center(cell, self.cell_size),
            speed,
            follower: PathFollower::default(),
            freeze: FreezeState::default(),
            next_replan_at: 0,
        });
    }

    /// Random cells far from the start; the last passable sample is kept if nothing far turns up.
    fn pick_enemy_spawn_cell(&mut self) -> Option<Cell> {
        let start = self.grid.start();
        let mut last_passable = None;
        for _ in 0..ENEMY_SPAWN_ATTEMPTS {
            let cell = self.random_cell();
            if !self.grid.is_walkable(cell) {
                continue;
            }
            let dx = (cell.x - start.x) as f32;
            let dy = (cell.y - start.y) as f32;
            if (dx * dx + dy * dy).sqrt() >= ENEMY_SAFE_SPAWN_DISTANCE {
                return Some(cell);
            }
            last_passable = Some(cell);
        }
        last_passable
    }

    pub(super) fn place_power_ups(&mut self) -> Vec<PowerUp> {
        if let Some(placements) = self.options.power_up_placements.clone() {
            let mut placed = Vec::with_capacity(placements.len());
            for (kind, cell) in placements {
                if !self.grid.is_walkable(cell) {
                    continue;
                }
                placed.push(PowerUp {
                    id: self.make_id("power_up"),
                    kind,
                    cell,
                });
            }
            return placed;
        }

        let wanted = power_up_count(self.level);
        let rotation = self.rng.pick_index(PowerUpKind::ALL.len());
        let start = self.grid.start();
        let goal = self.grid.goal();
        let mut taken: HashSet<Cell> = HashSet::new();
        let mut placed = Vec::with_capacity(wanted);

        for _ in 0..POWER_UP_SPAWN_ATTEMPTS {
            if placed.len() >= wanted {
                break;
            }
            let cell = self.random_cell();
            if !self.grid.is_walkable(cell)
                || cell == start
                || cell == goal
                || cell.manhattan(start) < POWER_UP_MIN_START_DISTANCE
                || taken.contains(&cell)
            {
                continue;
            }
            taken.insert(cell);
            let kind = PowerUpKind::ALL[(rotation + placed.len()) % PowerUpKind::ALL.len()];
            placed.push(PowerUp {
                id: self.make_id("power_up"),
                kind,
                cell,
            });
        }
        if placed.len() < wanted {
            debug!(placed = placed.len(), wanted, "maze too small for every power-up");
        }
        placed
    }

    fn random_cell(&mut self) -> Cell {
        let x = self.rng.int(0, self.grid.cols() as i32 - 1);
        let y = self.rng.int(0, self.grid.rows() as i32 - 1);
        Cell::new(x, y)
    }
}
