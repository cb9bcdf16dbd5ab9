// Growth threshold: alert when new > baseline * (1 + threshold / 100), strictly.

use crate::models::{GrowthAlert, SizeSnapshot};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy)]
pub struct GrowthPolicy {
    threshold_percent: Decimal,
    factor: Decimal,
}

impl GrowthPolicy {
    pub fn new(threshold_percent: Decimal) -> Self {
        Self {
            threshold_percent,
            factor: Decimal::ONE + threshold_percent / Decimal::ONE_HUNDRED,
        }
    }

    pub fn threshold_percent(&self) -> Decimal {
        self.threshold_percent
    }

    /// Exactly at the threshold does not count as growth.
    pub fn exceeds(&self, baseline_mb: Decimal, new_mb: Decimal) -> bool {
        new_mb > baseline_mb * self.factor
    }

    /// Compare a fresh snapshot with its baseline. No baseline (cold start) never alerts.
    pub fn evaluate(
        &self,
        baseline: Option<&SizeSnapshot>,
        current: &SizeSnapshot,
    ) -> Option<GrowthAlert> {
        let baseline = baseline?;
        if !self.exceeds(baseline.size_mb, current.size_mb) {
            return None;
        }
        Some(GrowthAlert {
            server_alias: current.server_alias.clone(),
            label: current.label.clone(),
            baseline_mb: baseline.size_mb,
            new_mb: current.size_mb,
        })
    }
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self::new(Decimal::from(3))
    }
}
