use std::collections::BTreeMap;

use crate::constants::power_up_profile;
use crate::types::{ActiveEffectView, Cell, PowerUpKind, PowerUpView};

use super::utils::remaining_ms;

/// How a pickup of an already-active effect type changes its expiry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EffectStacking {
    /// Expiry becomes `now + duration`.
    #[default]
    Refresh,
    /// Remaining time is kept and the full duration is added on top.
    Extend,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PowerUp {
    pub id: String,
    pub kind: PowerUpKind,
    pub cell: Cell,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveEffect {
    pub kind: PowerUpKind,
    pub expires_at: u64,
}

/// Grid pickups plus the effects currently running on the player.
///
/// `active` is keyed by type, so there is never more than one entry per effect type.
#[derive(Clone, Debug, Default)]
pub struct PowerUpManager {
    pickups: Vec<PowerUp>,
    active: BTreeMap<PowerUpKind, u64>,
    stacking: EffectStacking,
    used_any: bool,
}

impl PowerUpManager {
    pub fn new(pickups: Vec<PowerUp>, stacking: EffectStacking) -> Self {
        Self {
            pickups,
            active: BTreeMap::new(),
            stacking,
            used_any: false,
        }
    }

    pub fn pickups(&self) -> &[PowerUp] {
        &self.pickups
    }

    pub fn used_any(&self) -> bool {
        self.used_any
    }

    pub fn collect(&mut self, id: &str, now_ms: u64) -> Option<(PowerUp, ActiveEffect)> {
        let index = self.pickups.iter().position(|pickup| pickup.id == id)?;
        Some(self.take(index, now_ms))
    }

    pub fn collect_at(&mut self, cell: Cell, now_ms: u64) -> Option<(PowerUp, ActiveEffect)> {
        let index = self.pickups.iter().position(|pickup| pickup.cell == cell)?;
        Some(self.take(index, now_ms))
    }

    fn take(&mut self, index: usize, now_ms: u64) -> (PowerUp, ActiveEffect) {
        let pickup = self.pickups.remove(index);
        let effect = self.activate(pickup.kind, now_ms);
        (pickup, effect)
    }

    fn activate(&mut self, kind: PowerUpKind, now_ms: u64) -> ActiveEffect {
        let duration = power_up_profile(kind).duration_ms;
        let expires_at = match (self.stacking, self.active.get(&kind)) {
            (EffectStacking::Extend, Some(&until)) if until > now_ms => until + duration,
            _ => now_ms + duration,
        };
        self.active.insert(kind, expires_at);
        self.used_any = true;
        ActiveEffect { kind, expires_at }
    }

    /// Removes and returns every effect whose expiry has passed.
    pub fn tick(&mut self, now_ms: u64) -> Vec<ActiveEffect> {
        let expired: Vec<ActiveEffect> = self
            .active
            .iter()
            .filter(|(_, &expires_at)| expires_at <= now_ms)
            .map(|(&kind, &expires_at)| ActiveEffect { kind, expires_at })
            .collect();
        for effect in &expired {
            self.active.remove(&effect.kind);
        }
        expired
    }

    pub fn is_active(&self, kind: PowerUpKind, now_ms: u64) -> bool {
        self.active
            .get(&kind)
            .is_some_and(|&expires_at| expires_at > now_ms)
    }

    pub fn expires_at(&self, kind: PowerUpKind) -> Option<u64> {
        self.active.get(&kind).copied()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn speed_multiplier(&self, now_ms: u64) -> f32 {
        if self.is_active(PowerUpKind::Speed, now_ms) {
            power_up_profile(PowerUpKind::Speed).speed_multiplier
        } else {
            1.0
        }
    }

    pub fn score_multiplier(&self, now_ms: u64) -> u32 {
        if self.is_active(PowerUpKind::ScoreMultiplier, now_ms) {
            power_up_profile(PowerUpKind::ScoreMultiplier).score_multiplier
        } else {
            1
        }
    }

    pub fn active_effects(&self, now_ms: u64) -> Vec<ActiveEffectView> {
        self.active
            .iter()
            .map(|(&kind, &expires_at)| ActiveEffectView {
                kind,
                remaining_ms: remaining_ms(expires_at, now_ms),
            })
            .collect()
    }

    pub fn pickup_views(&self) -> Vec<PowerUpView> {
        self.pickups
            .iter()
            .map(|pickup| PowerUpView {
                id: pickup.id.clone(),
                kind: pickup.kind,
                x: pickup.cell.x,
                y: pickup.cell.y,
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FreezeState {
    pub frozen: bool,
    pub frozen_until: u64,
}

impl FreezeState {
    pub fn freeze(&mut self, until: u64) {
        self.frozen = true;
        self.frozen_until = until;
    }

    pub fn is_active(&self, now_ms: u64) -> bool {
        self.frozen && now_ms < self.frozen_until
    }

    /// Clears an elapsed freeze. Returns whether the enemy thawed.
    pub fn thaw_if_expired(&mut self, now_ms: u64) -> bool {
        if self.frozen && now_ms >= self.frozen_until {
            self.frozen = false;
            self.frozen_until = 0;
            return true;
        }
        false
    }
}

/// Freezes every tracked enemy until `until`.
pub fn apply_freeze<'a>(states: impl IntoIterator<Item = &'a mut FreezeState>, until: u64) {
    for state in states {
        state.freeze(until);
    }
}
