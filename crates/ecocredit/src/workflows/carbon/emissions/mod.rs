mod factors;

pub use factors::EmissionFactors;

use super::domain::EmissionBreakdown;
use super::input::FootprintInput;

/// Monthly utility readings are spread evenly over this many days.
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Stateless calculator applying an immutable factor table to daily inputs.
#[derive(Debug, Clone)]
pub struct EmissionsCalculator {
    factors: EmissionFactors,
}

impl EmissionsCalculator {
    pub fn new(factors: EmissionFactors) -> Self {
        Self { factors }
    }

    pub fn standard() -> Self {
        Self::new(EmissionFactors::standard())
    }

    /// Never fails: unusable quantities were already zeroed by normalization.
    pub fn derive(&self, input: &FootprintInput) -> EmissionBreakdown {
        let input = input.normalized();

        let travel = self.factors.vehicle_factor(input.vehicle_type) * input.distance;
        let food = self.factors.diet_factor(input.diet_type);
        let energy = (input.electricity_usage / DAYS_PER_MONTH) * self.factors.electricity_per_kwh
            + (input.gas_usage / DAYS_PER_MONTH) * self.factors.gas_per_kwh;

        breakdown(travel, food, energy)
    }
}

impl Default for EmissionsCalculator {
    fn default() -> Self {
        Self::standard()
    }
}

fn breakdown(travel: f64, food: f64, energy: f64) -> EmissionBreakdown {
    let travel = round_to_cents(travel);
    let food = round_to_cents(food);
    let energy = round_to_cents(energy);

    EmissionBreakdown {
        travel,
        food,
        energy,
        total: round_to_cents(travel + food + energy),
    }
}

pub(crate) fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
