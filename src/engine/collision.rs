use crate::constants::HIT_RADIUS_FACTOR;
use crate::types::Position;

/// What the detector needs to know about one enemy.
#[derive(Clone, Copy, Debug)]
pub struct EnemyBody {
    pub position: Position,
    pub frozen: bool,
}

/// Index of the first enemy touching the player, if any.
///
/// A protected player (damage cooldown or invincibility effect) is never hit, and frozen
/// enemies never hit. Only the first overlap is reported.
pub fn detect_hit(
    player: Position,
    protected: bool,
    enemies: impl IntoIterator<Item = EnemyBody>,
    cell_size: f32,
) -> Option<usize> {
    if protected {
        return None;
    }
    let radius = cell_size * HIT_RADIUS_FACTOR;
    enemies
        .into_iter()
        .position(|enemy| !enemy.frozen && player.distance(enemy.position) < radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(x: f32, y: f32, frozen: bool) -> EnemyBody {
        EnemyBody {
            position: Position::new(x, y),
            frozen,
        }
    }

    #[test]
    fn reports_first_overlapping_enemy() {
        let player = Position::new(100.0, 100.0);
        let enemies = [
            body(300.0, 100.0, false),
            body(110.0, 100.0, false),
            body(100.0, 100.0, false),
        ];
        assert_eq!(detect_hit(player, false, enemies, 40.0), Some(1));
    }

    #[test]
    fn hit_radius_scales_with_cell_size() {
        let player = Position::new(0.0, 0.0);
        assert_eq!(detect_hit(player, false, [body(23.9, 0.0, false)], 40.0), Some(0));
        assert_eq!(detect_hit(player, false, [body(24.5, 0.0, false)], 40.0), None);
    }

    #[test]
    fn protected_player_is_never_hit_even_on_exact_overlap() {
        let player = Position::new(60.0, 60.0);
        assert_eq!(detect_hit(player, true, [body(60.0, 60.0, false)], 40.0), None);
    }

    #[test]
    fn frozen_enemies_are_skipped() {
        let player = Position::new(60.0, 60.0);
        let enemies = [body(60.0, 60.0, true), body(65.0, 60.0, false)];
        assert_eq!(detect_hit(player, false, enemies, 40.0), Some(1));
        assert_eq!(detect_hit(player, false, [body(60.0, 60.0, true)], 40.0), None);
    }
}
