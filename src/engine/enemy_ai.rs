use crate::constants::{EnemyProfile, PATROL_OFFSET};
use crate::pathfinding::find_path;
use crate::rng::RandomSource;
use crate::types::{Cell, EnemyKind};
use crate::world::Grid;

/// Read-only view of the world an enemy plans against.
pub struct AiContext<'a> {
    pub grid: &'a Grid,
    pub player_cell: Cell,
    /// Cell the player is currently heading for; equals `player_cell` when idle.
    pub player_next: Cell,
}

/// Everything one behaviour needs about the enemy it drives.
#[derive(Clone, Copy, Debug)]
pub struct EnemyCtx {
    pub cell: Cell,
    pub path_exhausted: bool,
    pub profile: EnemyProfile,
}

/// A new route to follow (waypoints after the current cell), or `None` to keep the old one.
pub type Behavior = fn(&EnemyCtx, &AiContext<'_>, &mut dyn RandomSource) -> Option<Vec<Cell>>;

pub fn behavior_for(kind: EnemyKind) -> Behavior {
    match kind {
        EnemyKind::Chaser => chase,
        EnemyKind::Predictive => predict,
        EnemyKind::Patrol => patrol,
        EnemyKind::Random => wander,
    }
}

fn in_aggro_range(enemy: &EnemyCtx, ctx: &AiContext<'_>) -> bool {
    enemy.cell.manhattan(ctx.player_cell) < enemy.profile.aggro_range
}

/// Plans toward `target` and drops the enemy's own cell. A no-op route counts as a failure.
fn plan(grid: &Grid, from: Cell, target: Cell) -> Option<Vec<Cell>> {
    let path = find_path(grid, from, target)?;
    if path.len() <= 1 {
        return None;
    }
    Some(path[1..].to_vec())
}

fn chase(enemy: &EnemyCtx, ctx: &AiContext<'_>, _rng: &mut dyn RandomSource) -> Option<Vec<Cell>> {
    if !in_aggro_range(enemy, ctx) {
        return None;
    }
    plan(ctx.grid, enemy.cell, ctx.player_cell)
}

fn predict(enemy: &EnemyCtx, ctx: &AiContext<'_>, _rng: &mut dyn RandomSource) -> Option<Vec<Cell>> {
    if !in_aggro_range(enemy, ctx) {
        return None;
    }
    let ahead = Cell::new(
        ctx.player_cell.x + (ctx.player_next.x - ctx.player_cell.x) * 2,
        ctx.player_cell.y + (ctx.player_next.y - ctx.player_cell.y) * 2,
    );
    plan(ctx.grid, enemy.cell, ctx.grid.clamp(ahead))
}

fn patrol(enemy: &EnemyCtx, ctx: &AiContext<'_>, rng: &mut dyn RandomSource) -> Option<Vec<Cell>> {
    if in_aggro_range(enemy, ctx) {
        return plan(ctx.grid, enemy.cell, ctx.player_cell);
    }
    if !enemy.path_exhausted {
        return None;
    }
    let offsets = [
        (0, PATROL_OFFSET),
        (0, -PATROL_OFFSET),
        (PATROL_OFFSET, 0),
        (-PATROL_OFFSET, 0),
    ];
    let (dx, dy) = offsets[rng.pick_index(offsets.len())];
    let target = ctx
        .grid
        .clamp(Cell::new(enemy.cell.x + dx, enemy.cell.y + dy));
    plan(ctx.grid, enemy.cell, target)
}

fn wander(enemy: &EnemyCtx, ctx: &AiContext<'_>, rng: &mut dyn RandomSource) -> Option<Vec<Cell>> {
    if !enemy.path_exhausted {
        return None;
    }
    let options: Vec<Cell> = ctx.grid.walkable_neighbors(enemy.cell).collect();
    if options.is_empty() {
        return None;
    }
    Some(vec![options[rng.pick_index(options.len())]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::enemy_profile;
    use crate::rng::ScriptedRng;
    use crate::world::LevelDescriptor;

    fn open_grid() -> Grid {
        let rows = ["........", "........", "........", "........", "........", "........"];
        let descriptor = LevelDescriptor::from_rows(1, &rows, Cell::new(0, 0), Cell::new(7, 5));
        Grid::from_descriptor(&descriptor).expect("valid grid")
    }

    fn enemy(kind: EnemyKind, x: i32, y: i32, path_exhausted: bool) -> EnemyCtx {
        EnemyCtx {
            cell: Cell::new(x, y),
            path_exhausted,
            profile: enemy_profile(kind),
        }
    }

    fn ctx(grid: &Grid, player: (i32, i32), next: (i32, i32)) -> AiContext<'_> {
        AiContext {
            grid,
            player_cell: Cell::new(player.0, player.1),
            player_next: Cell::new(next.0, next.1),
        }
    }

    #[test]
    fn chaser_plans_to_player_inside_aggro_range() {
        let grid = open_grid();
        let mut rng = ScriptedRng::new(vec![0.0]);
        let path = behavior_for(EnemyKind::Chaser)(
            &enemy(EnemyKind::Chaser, 0, 0, false),
            &ctx(&grid, (3, 0), (3, 0)),
            &mut rng,
        )
        .expect("player is close");
        assert_eq!(path.len(), 3);
        assert_eq!(path.last(), Some(&Cell::new(3, 0)));
        assert!(!path.contains(&Cell::new(0, 0)));
    }

    #[test]
    fn chaser_idles_outside_aggro_range() {
        let descriptor = LevelDescriptor::from_rows(
            1,
            &["..............", ".............."],
            Cell::new(0, 0),
            Cell::new(13, 1),
        );
        let grid = Grid::from_descriptor(&descriptor).expect("valid grid");
        let mut rng = ScriptedRng::new(vec![0.0]);
        let far = behavior_for(EnemyKind::Chaser)(
            &enemy(EnemyKind::Chaser, 0, 0, true),
            &ctx(&grid, (10, 0), (10, 0)),
            &mut rng,
        );
        assert_eq!(far, None);
    }

    #[test]
    fn chaser_on_player_cell_keeps_existing_path() {
        let grid = open_grid();
        let mut rng = ScriptedRng::new(vec![0.0]);
        let same = behavior_for(EnemyKind::Chaser)(
            &enemy(EnemyKind::Chaser, 2, 2, false),
            &ctx(&grid, (2, 2), (2, 2)),
            &mut rng,
        );
        assert_eq!(same, None);
    }

    #[test]
    fn predictive_aims_two_cells_past_player_heading() {
        let grid = open_grid();
        let mut rng = ScriptedRng::new(vec![0.0]);
        let path = behavior_for(EnemyKind::Predictive)(
            &enemy(EnemyKind::Predictive, 0, 3, false),
            &ctx(&grid, (2, 3), (3, 3)),
            &mut rng,
        )
        .expect("player is close");
        assert_eq!(path.last(), Some(&Cell::new(4, 3)));
    }

    #[test]
    fn predictive_target_is_clamped_to_grid() {
        let grid = open_grid();
        let mut rng = ScriptedRng::new(vec![0.0]);
        let path = behavior_for(EnemyKind::Predictive)(
            &enemy(EnemyKind::Predictive, 0, 0, false),
            &ctx(&grid, (7, 4), (7, 5)),
            &mut rng,
        )
        .expect("player is close");
        assert_eq!(path.last(), Some(&Cell::new(7, 5)));

        let path = behavior_for(EnemyKind::Predictive)(
            &enemy(EnemyKind::Predictive, 0, 0, false),
            &ctx(&grid, (6, 5), (6, 6)),
            &mut rng,
        )
        .expect("player is close");
        assert_eq!(path.last(), Some(&Cell::new(6, 5)));
    }

    #[test]
    fn patrol_picks_scripted_offset_when_idle() {
        let grid = open_grid();
        // pick_index(4) with 0.5 selects the +x offset.
        let mut rng = ScriptedRng::new(vec![0.5]);
        let path = behavior_for(EnemyKind::Patrol)(
            &enemy(EnemyKind::Patrol, 0, 0, true),
            &ctx(&grid, (7, 5), (7, 5)),
            &mut rng,
        )
        .expect("patrol target is reachable");
        assert_eq!(path, vec![Cell::new(1, 0), Cell::new(2, 0), Cell::new(3, 0)]);
    }

    #[test]
    fn patrol_keeps_route_until_exhausted_then_chases_when_close() {
        let grid = open_grid();
        let mut rng = ScriptedRng::new(vec![0.0]);
        let busy = behavior_for(EnemyKind::Patrol)(
            &enemy(EnemyKind::Patrol, 0, 0, false),
            &ctx(&grid, (7, 5), (7, 5)),
            &mut rng,
        );
        assert_eq!(busy, None);

        let chase = behavior_for(EnemyKind::Patrol)(
            &enemy(EnemyKind::Patrol, 0, 0, false),
            &ctx(&grid, (2, 1), (2, 1)),
            &mut rng,
        )
        .expect("player is inside patrol aggro range");
        assert_eq!(chase.last(), Some(&Cell::new(2, 1)));
    }

    #[test]
    fn patrol_offset_into_corner_clamps_to_no_op() {
        let grid = open_grid();
        // 0.8 selects the -x offset, which clamps back onto the enemy's own column.
        let mut rng = ScriptedRng::new(vec![0.8]);
        let stay = behavior_for(EnemyKind::Patrol)(
            &enemy(EnemyKind::Patrol, 0, 0, true),
            &ctx(&grid, (7, 5), (7, 5)),
            &mut rng,
        );
        assert_eq!(stay, None);
    }

    #[test]
    fn random_steps_to_a_passable_neighbor() {
        let descriptor =
            LevelDescriptor::from_rows(1, &["#.#", "...", "###"], Cell::new(1, 1), Cell::new(0, 1));
        let grid = Grid::from_descriptor(&descriptor).expect("valid grid");
        for roll in [0.0, 0.3, 0.6, 0.9] {
            let mut rng = ScriptedRng::new(vec![roll]);
            let step = behavior_for(EnemyKind::Random)(
                &enemy(EnemyKind::Random, 1, 1, true),
                &ctx(&grid, (0, 1), (0, 1)),
                &mut rng,
            )
            .expect("some neighbor is open");
            assert_eq!(step.len(), 1);
            assert!(grid.is_walkable(step[0]));
            assert_eq!(step[0].manhattan(Cell::new(1, 1)), 1);
        }
    }

    #[test]
    fn random_boxed_in_stays_put() {
        let descriptor =
            LevelDescriptor::from_rows(1, &["###", "#.#", "###"], Cell::new(1, 1), Cell::new(1, 1));
        let grid = Grid::from_descriptor(&descriptor).expect("valid grid");
        let mut rng = ScriptedRng::new(vec![0.0]);
        let step = behavior_for(EnemyKind::Random)(
            &enemy(EnemyKind::Random, 1, 1, true),
            &ctx(&grid, (1, 1), (1, 1)),
            &mut rng,
        );
        assert_eq!(step, None);
    }
}
