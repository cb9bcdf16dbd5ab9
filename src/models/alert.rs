// Growth alert raised by the evaluator and delivered by the dispatcher

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthAlert {
    pub server_alias: String,
    pub label: String,
    pub baseline_mb: Decimal,
    pub new_mb: Decimal,
}

impl GrowthAlert {
    /// Text sent to every recipient, e.g.
    /// `Alert! Fichas_Data on Copernico grew from 1000.00MB to 1035.01MB (>3%).`
    pub fn message(&self, threshold_percent: Decimal) -> String {
        format!(
            "Alert! {} on {} grew from {:.2}MB to {:.2}MB (>{}%).",
            self.label,
            self.server_alias,
            round_mb(self.baseline_mb),
            round_mb(self.new_mb),
            threshold_percent.normalize()
        )
    }
}

// `{:.2}` on a Decimal truncates; sizes are rounded half away from zero.
fn round_mb(mb: Decimal) -> Decimal {
    mb.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
