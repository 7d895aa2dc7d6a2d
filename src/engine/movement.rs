use crate::types::{Cell, Position};

use super::utils::cell_center;

/// Planned route plus the index of the waypoint currently being approached.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathFollower {
    pub path: Vec<Cell>,
    pub target_index: usize,
}

impl PathFollower {
    pub fn assign(&mut self, path: Vec<Cell>) {
        self.path = path;
        self.target_index = 0;
    }

    pub fn clear(&mut self) {
        self.path.clear();
        self.target_index = 0;
    }

    pub fn current_waypoint(&self) -> Option<Cell> {
        self.path.get(self.target_index).copied()
    }

    pub fn is_exhausted(&self) -> bool {
        self.target_index >= self.path.len()
    }

    /// First waypoint that is not `here`. Paths start on the walker's own cell, so the
    /// opening leg would otherwise report no movement at all.
    pub fn upcoming_from(&self, here: Cell) -> Option<Cell> {
        self.path
            .get(self.target_index..)?
            .iter()
            .copied()
            .find(|cell| *cell != here)
    }
}

/// Moves `position` toward the current waypoint by `speed` pixels.
///
/// When the waypoint is within `speed` the position snaps onto its centre, the
/// follower advances and the reached cell is returned. That return value is the only
/// source of cell-level events. A non-finite or non-positive speed leaves everything
/// untouched.
pub fn advance(
    position: &mut Position,
    follower: &mut PathFollower,
    speed: f32,
    cell_size: f32,
) -> Option<Cell> {
    let waypoint = follower.current_waypoint()?;
    if !speed.is_finite() || speed <= 0.0 {
        return None;
    }

    let target = cell_center(waypoint, cell_size);
    let distance = position.distance(target);
    if distance <= speed {
        *position = target;
        follower.target_index += 1;
        return Some(waypoint);
    }

    position.x += (target.x - position.x) / distance * speed;
    position.y += (target.y - position.y) / distance * speed;
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn follower(cells: &[(i32, i32)]) -> PathFollower {
        let mut follower = PathFollower::default();
        follower.assign(cells.iter().map(|(x, y)| Cell::new(*x, *y)).collect());
        follower
    }

    #[test]
    fn zero_distance_counts_as_arrival() {
        let mut position = cell_center(Cell::new(2, 2), 40.0);
        let mut follower = follower(&[(2, 2), (3, 2)]);
        assert_eq!(
            advance(&mut position, &mut follower, 3.0, 40.0),
            Some(Cell::new(2, 2))
        );
        assert!(position.is_finite());
        assert_eq!(follower.target_index, 1);
    }

    #[test]
    fn upcoming_cell_skips_the_walkers_own_cell() {
        let mut route = follower(&[(2, 2), (3, 2), (4, 2)]);
        assert_eq!(route.upcoming_from(Cell::new(2, 2)), Some(Cell::new(3, 2)));
        route.target_index = 1;
        assert_eq!(route.upcoming_from(Cell::new(2, 2)), Some(Cell::new(3, 2)));
        assert_eq!(route.upcoming_from(Cell::new(3, 2)), Some(Cell::new(4, 2)));
        route.target_index = 3;
        assert_eq!(route.upcoming_from(Cell::new(4, 2)), None);
        assert_eq!(follower(&[(1, 1)]).upcoming_from(Cell::new(1, 1)), None);
    }

    #[test]
    fn partial_step_moves_along_direction() {
        let mut position = cell_center(Cell::new(0, 0), 40.0);
        let mut follower = follower(&[(1, 0)]);
        assert_eq!(advance(&mut position, &mut follower, 10.0, 40.0), None);
        assert_eq!(position, Position::new(30.0, 20.0));
        assert_eq!(follower.target_index, 0);
    }

    #[test]
    fn arrival_snaps_exactly_onto_waypoint() {
        let mut position = Position::new(51.5, 20.0);
        let mut follower = follower(&[(1, 0)]);
        assert_eq!(
            advance(&mut position, &mut follower, 10.0, 40.0),
            Some(Cell::new(1, 0))
        );
        assert_eq!(position, cell_center(Cell::new(1, 0), 40.0));
        assert!(follower.is_exhausted());
        assert_eq!(advance(&mut position, &mut follower, 10.0, 40.0), None);
    }

    #[test]
    fn degenerate_speed_never_moves_or_produces_nan() {
        let start = cell_center(Cell::new(0, 0), 40.0);
        for speed in [0.0, -4.0, f32::NAN, f32::INFINITY] {
            let mut position = start;
            let mut follower = follower(&[(3, 0)]);
            assert_eq!(advance(&mut position, &mut follower, speed, 40.0), None);
            assert_eq!(position, start);
        }
    }

    #[test]
    fn diagonal_approach_stays_finite_until_arrival() {
        let mut position = Position::new(3.0, 97.0);
        let mut follower = follower(&[(4, 0)]);
        let mut arrived = false;
        for _ in 0..200 {
            if advance(&mut position, &mut follower, 2.5, 40.0).is_some() {
                arrived = true;
                break;
            }
            assert!(position.is_finite());
        }
        assert!(arrived);
    }
}
