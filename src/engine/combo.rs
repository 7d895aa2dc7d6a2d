use crate::constants::{COMBO_BASE_TENTHS, COMBO_CAP_TENTHS, COMBO_STEP_TENTHS, COMBO_WINDOW_MS};
use crate::types::ComboView;

/// Streak of collections that land within the combo window of each other.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComboScorer {
    count: u32,
    last_collect_ms: Option<u64>,
}

impl ComboScorer {
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Registers a collection and returns the new `(count, multiplier)`.
    pub fn on_collect(&mut self, now_ms: u64) -> (u32, f64) {
        let within_window = self
            .last_collect_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < COMBO_WINDOW_MS);
        self.count = if within_window {
            self.count.saturating_add(1)
        } else {
            1
        };
        self.last_collect_ms = Some(now_ms);
        (self.count, self.multiplier())
    }

    /// Drops a streak whose window has lapsed. Returns whether anything was reset.
    pub fn expire(&mut self, now_ms: u64) -> bool {
        let Some(last) = self.last_collect_ms else {
            return false;
        };
        if self.count == 0 || now_ms.saturating_sub(last) < COMBO_WINDOW_MS {
            return false;
        }
        self.count = 0;
        true
    }

    /// Multiplier in tenths: `10 + count`, capped at 30. A count of zero is 1.0.
    pub fn multiplier_tenths(&self) -> u32 {
        if self.count == 0 {
            return COMBO_BASE_TENTHS;
        }
        COMBO_BASE_TENTHS
            .saturating_add(self.count.saturating_mul(COMBO_STEP_TENTHS))
            .min(COMBO_CAP_TENTHS)
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier_tenths() as f64 / 10.0
    }

    /// `base * combo * effect`, floored.
    pub fn points(&self, base: u64, effect_multiplier: u32) -> u64 {
        base * self.multiplier_tenths() as u64 * effect_multiplier as u64 / 10
    }

    pub fn view(&self) -> ComboView {
        ComboView {
            count: self.count,
            multiplier: self.multiplier(),
        }
    }
}
