use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Identity string supplied by the authentication collaborator (usually an e-mail address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for stored footprint submissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FootprintId(pub String);

impl fmt::Display for FootprintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

/// Commute mode reported with a daily submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VehicleType {
    CarPetrol,
    CarDiesel,
    CarHybrid,
    CarElectric,
    Motorbike,
    Bus,
    Train,
    Bicycle,
    Walking,
    #[default]
    Unknown,
}

impl VehicleType {
    /// Accepts `car-petrol`, `car_petrol` or `Car Petrol`; anything else is `Unknown`.
    pub fn from_label(raw: &str) -> Self {
        match normalize_label(raw).as_str() {
            "car-petrol" | "petrol-car" => Self::CarPetrol,
            "car-diesel" | "diesel-car" => Self::CarDiesel,
            "car-hybrid" | "hybrid-car" => Self::CarHybrid,
            "car-electric" | "electric-car" | "ev" => Self::CarElectric,
            "motorbike" | "motorcycle" => Self::Motorbike,
            "bus" => Self::Bus,
            "train" | "rail" => Self::Train,
            "bicycle" | "bike" | "cycling" => Self::Bicycle,
            "walking" | "walk" => Self::Walking,
            _ => Self::Unknown,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::CarPetrol => "Petrol car",
            Self::CarDiesel => "Diesel car",
            Self::CarHybrid => "Hybrid car",
            Self::CarElectric => "Electric car",
            Self::Motorbike => "Motorbike",
            Self::Bus => "Bus",
            Self::Train => "Train",
            Self::Bicycle => "Bicycle",
            Self::Walking => "Walking",
            Self::Unknown => "Unknown",
        }
    }
}

impl<'de> Deserialize<'de> for VehicleType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().map(Self::from_label).unwrap_or_default())
    }
}

/// Diet profile reported with a daily submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DietType {
    Vegan,
    Vegetarian,
    Pescatarian,
    LowMeat,
    MediumMeat,
    HighMeat,
    #[default]
    Unknown,
}

impl DietType {
    pub fn from_label(raw: &str) -> Self {
        match normalize_label(raw).as_str() {
            "vegan" => Self::Vegan,
            "vegetarian" => Self::Vegetarian,
            "pescatarian" => Self::Pescatarian,
            "low-meat" => Self::LowMeat,
            "medium-meat" | "average" => Self::MediumMeat,
            "high-meat" | "meat-heavy" => Self::HighMeat,
            _ => Self::Unknown,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Vegan => "Vegan",
            Self::Vegetarian => "Vegetarian",
            Self::Pescatarian => "Pescatarian",
            Self::LowMeat => "Low meat",
            Self::MediumMeat => "Medium meat",
            Self::HighMeat => "High meat",
            Self::Unknown => "Unknown",
        }
    }
}

impl<'de> Deserialize<'de> for DietType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().map(Self::from_label).unwrap_or_default())
    }
}

fn normalize_label(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .replace(['_', ' '], "-")
}

/// Per-category emissions in kg CO2e for a single day.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmissionBreakdown {
    pub travel: f64,
    pub food: f64,
    pub energy: f64,
    pub total: f64,
}

/// Persisted daily submission. At most one exists per (user, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintRecord {
    pub id: FootprintId,
    pub user: UserId,
    pub date: NaiveDate,
    pub vehicle_type: VehicleType,
    pub distance: f64,
    pub diet_type: DietType,
    pub electricity_usage: f64,
    pub gas_usage: f64,
    pub emissions: EmissionBreakdown,
}

impl FootprintRecord {
    pub fn total_score(&self) -> f64 {
        self.emissions.total
    }
}

/// Per-user running balance, created on first award.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub user: UserId,
    pub credits: i64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Earn,
    Bonus,
}

impl TransactionKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Earn => "earn",
            Self::Bonus => "bonus",
        }
    }
}

/// Immutable ledger entry; the sum of a user's amounts equals their wallet balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: TransactionId,
    pub user: UserId,
    pub amount: i64,
    pub kind: TransactionKind,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a single award, returned to both submission and manual award callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditSummary {
    pub base_credits: i64,
    pub bonus_credits: i64,
    pub total_awarded: i64,
    pub wallet: Wallet,
    pub transactions: Vec<CreditTransaction>,
}
