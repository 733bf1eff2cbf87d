//! Raw submission payloads and the normalization step that turns them into calculator input.
//!
//! Lifestyle quantities arrive from forms and CSV exports, so the numeric fields are read
//! leniently: numbers and numeric strings are accepted, anything else is treated as absent.
//! [`FootprintInput::normalized`] then applies the default-substitution table:
//!
//! | field               | absent / non-numeric | negative or non-finite |
//! |---------------------|----------------------|------------------------|
//! | `distance`          | 0                    | 0                      |
//! | `electricity_usage` | 0                    | 0                      |
//! | `gas_usage`         | 0                    | 0                      |
//! | `vehicle_type`      | `Unknown`            | n/a                    |
//! | `diet_type`         | `Unknown`            | n/a                    |

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::domain::{DietType, EmissionBreakdown, FootprintRecord, VehicleType};

/// Lifestyle quantities for one day, as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FootprintInput {
    #[serde(default)]
    pub vehicle_type: Option<VehicleType>,
    /// Kilometres travelled today.
    #[serde(default, deserialize_with = "lenient_number")]
    pub distance: Option<f64>,
    #[serde(default)]
    pub diet_type: Option<DietType>,
    /// Monthly electricity usage in kWh.
    #[serde(default, deserialize_with = "lenient_number")]
    pub electricity_usage: Option<f64>,
    /// Monthly gas usage in kWh.
    #[serde(default, deserialize_with = "lenient_number")]
    pub gas_usage: Option<f64>,
}

/// Calculator-ready quantities after default substitution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedInput {
    pub vehicle_type: VehicleType,
    pub distance: f64,
    pub diet_type: DietType,
    pub electricity_usage: f64,
    pub gas_usage: f64,
}

impl FootprintInput {
    pub fn normalized(&self) -> NormalizedInput {
        NormalizedInput {
            vehicle_type: self.vehicle_type.unwrap_or_default(),
            distance: non_negative(self.distance),
            diet_type: self.diet_type.unwrap_or_default(),
            electricity_usage: non_negative(self.electricity_usage),
            gas_usage: non_negative(self.gas_usage),
        }
    }

    /// Rebuilds the input that produced a stored record so updates can be merged onto it.
    pub fn from_record(record: &FootprintRecord) -> Self {
        Self {
            vehicle_type: Some(record.vehicle_type),
            distance: Some(record.distance),
            diet_type: Some(record.diet_type),
            electricity_usage: Some(record.electricity_usage),
            gas_usage: Some(record.gas_usage),
        }
    }
}

fn non_negative(value: Option<f64>) -> f64 {
    match value {
        Some(value) if value.is_finite() && value > 0.0 => value,
        _ => 0.0,
    }
}

/// Caller-supplied emission values that take precedence over derived ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionOverrides {
    #[serde(default, deserialize_with = "lenient_number")]
    pub travel_emissions: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub food_emissions: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub energy_emissions: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_score: Option<f64>,
}

impl EmissionOverrides {
    /// Fills every absent value from `derived`; supplied values are kept verbatim.
    pub fn resolve(&self, derived: EmissionBreakdown) -> EmissionBreakdown {
        EmissionBreakdown {
            travel: self.travel_emissions.unwrap_or(derived.travel),
            food: self.food_emissions.unwrap_or(derived.food),
            energy: self.energy_emissions.unwrap_or(derived.energy),
            total: self.total_score.unwrap_or(derived.total),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.travel_emissions.is_none()
            && self.food_emissions.is_none()
            && self.energy_emissions.is_none()
            && self.total_score.is_none()
    }
}

/// Body of a footprint submission. The user comes from the identity collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FootprintSubmission {
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(flatten)]
    pub input: FootprintInput,
    #[serde(flatten)]
    pub overrides: EmissionOverrides,
}

/// Partial update for an existing record; absent fields keep their stored values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FootprintPatch {
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(flatten)]
    pub input: FootprintInput,
}

impl FootprintPatch {
    pub fn merge_into(&self, base: FootprintInput) -> FootprintInput {
        FootprintInput {
            vehicle_type: self.input.vehicle_type.or(base.vehicle_type),
            distance: self.input.distance.or(base.distance),
            diet_type: self.input.diet_type.or(base.diet_type),
            electricity_usage: self.input.electricity_usage.or(base.electricity_usage),
            gas_usage: self.input.gas_usage.or(base.gas_usage),
        }
    }
}

/// Reads a number or numeric string; other JSON shapes and non-finite values become `None`.
pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_number))
}

pub(crate) fn coerce_number(value: &serde_json::Value) -> Option<f64> {
    let number = match value {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.filter(|value| !value.trim().is_empty())
        .map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lenient_fields_treat_garbage_as_absent() {
        let submission: FootprintSubmission = serde_json::from_value(json!({
            "vehicle_type": "car-petrol",
            "distance": "20",
            "diet_type": 7,
            "electricity_usage": "lots",
            "gas_usage": null,
        }))
        .expect("payload parses");

        assert_eq!(submission.input.vehicle_type, Some(VehicleType::CarPetrol));
        assert_eq!(submission.input.distance, Some(20.0));
        assert_eq!(submission.input.diet_type, Some(DietType::Unknown));
        assert_eq!(submission.input.electricity_usage, None);
        assert_eq!(submission.input.gas_usage, None);
        assert!(submission.overrides.is_empty());
        assert!(submission.date.is_none());
    }

    #[test]
    fn normalization_zeroes_negative_and_missing_quantities() {
        let input = FootprintInput {
            vehicle_type: None,
            distance: Some(-4.0),
            diet_type: None,
            electricity_usage: Some(f64::NAN),
            gas_usage: Some(90.0),
        };

        let normalized = input.normalized();
        assert_eq!(normalized.vehicle_type, VehicleType::Unknown);
        assert_eq!(normalized.diet_type, DietType::Unknown);
        assert_eq!(normalized.distance, 0.0);
        assert_eq!(normalized.electricity_usage, 0.0);
        assert_eq!(normalized.gas_usage, 90.0);
    }

    #[test]
    fn overrides_only_replace_supplied_values() {
        let overrides = EmissionOverrides {
            travel_emissions: Some(1.0),
            total_score: Some(4.5),
            ..EmissionOverrides::default()
        };
        let derived = EmissionBreakdown {
            travel: 3.42,
            food: 2.89,
            energy: 0.0,
            total: 6.31,
        };

        let resolved = overrides.resolve(derived);
        assert_eq!(resolved.travel, 1.0);
        assert_eq!(resolved.food, 2.89);
        assert_eq!(resolved.total, 4.5);
    }

    #[test]
    fn patch_merges_over_stored_input() {
        let base = FootprintInput {
            vehicle_type: Some(VehicleType::Bus),
            distance: Some(12.0),
            diet_type: Some(DietType::Vegetarian),
            electricity_usage: Some(300.0),
            gas_usage: Some(150.0),
        };
        let patch: FootprintPatch =
            serde_json::from_value(json!({ "distance": 30, "diet_type": "vegan" }))
                .expect("patch parses");

        let merged = patch.merge_into(base);
        assert_eq!(merged.vehicle_type, Some(VehicleType::Bus));
        assert_eq!(merged.distance, Some(30.0));
        assert_eq!(merged.diet_type, Some(DietType::Vegan));
        assert_eq!(merged.gas_usage, Some(150.0));
    }

    #[test]
    fn malformed_dates_are_rejected() {
        let result = serde_json::from_value::<FootprintSubmission>(json!({ "date": "01/02/2024" }));
        assert!(result.is_err());
    }
}
