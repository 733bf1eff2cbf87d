use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::super::domain::{DietType, VehicleType};

/// Conversion tables in kg CO2e. Types missing from a table contribute nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionFactors {
    /// Per kilometre travelled.
    pub vehicles: BTreeMap<VehicleType, f64>,
    /// Per day on the given diet.
    pub diets: BTreeMap<DietType, f64>,
    /// Per kWh of electricity.
    pub electricity_per_kwh: f64,
    /// Per kWh of gas.
    pub gas_per_kwh: f64,
}

impl EmissionFactors {
    pub fn standard() -> Self {
        let vehicles = BTreeMap::from([
            (VehicleType::CarPetrol, 0.171),
            (VehicleType::CarDiesel, 0.168),
            (VehicleType::CarHybrid, 0.120),
            (VehicleType::CarElectric, 0.047),
            (VehicleType::Motorbike, 0.114),
            (VehicleType::Bus, 0.105),
            (VehicleType::Train, 0.041),
            (VehicleType::Bicycle, 0.0),
            (VehicleType::Walking, 0.0),
        ]);

        let diets = BTreeMap::from([
            (DietType::Vegan, 2.89),
            (DietType::Vegetarian, 3.81),
            (DietType::Pescatarian, 3.91),
            (DietType::LowMeat, 4.67),
            (DietType::MediumMeat, 5.63),
            (DietType::HighMeat, 7.19),
        ]);

        Self {
            vehicles,
            diets,
            electricity_per_kwh: 0.233,
            gas_per_kwh: 0.184,
        }
    }

    pub fn vehicle_factor(&self, vehicle: VehicleType) -> f64 {
        self.vehicles.get(&vehicle).copied().unwrap_or(0.0)
    }

    pub fn diet_factor(&self, diet: DietType) -> f64 {
        self.diets.get(&diet).copied().unwrap_or(0.0)
    }
}

impl Default for EmissionFactors {
    fn default() -> Self {
        Self::standard()
    }
}
