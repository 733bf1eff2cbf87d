//! Back-fill of historical submissions from a CSV export.
//!
//! Expected header: `user,date,vehicle_type,distance,diet_type,electricity_usage,gas_usage`.
//! Rows are replayed oldest first through [`CarbonCreditService::submit_footprint`], so the
//! credits they earn are identical to on-time submissions.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use super::domain::{DietType, UserId, VehicleType};
use super::error::CreditError;
use super::input::{parse_date, EmissionOverrides, FootprintInput, FootprintSubmission};
use super::repository::{FootprintRepository, WalletRepository};
use super::service::CarbonCreditService;

#[derive(Debug, thiserror::Error)]
pub enum BackfillError {
    #[error("failed to read back-fill export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid back-fill CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackfillEntry {
    pub user: UserId,
    pub submission: FootprintSubmission,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct BackfillReport {
    pub submitted: usize,
    pub duplicates: usize,
    pub credits_awarded: i64,
    pub rejected: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BackfillRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    user: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    vehicle_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    distance: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    diet_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    electricity_usage: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    gas_usage: Option<String>,
}

impl BackfillRow {
    fn into_entry(self, row: usize) -> Result<BackfillEntry, BackfillError> {
        let user = self.user.ok_or_else(|| BackfillError::InvalidRow {
            row,
            reason: "missing user".to_string(),
        })?;
        let date = self
            .date
            .as_deref()
            .map(parse_date)
            .transpose()
            .map_err(|reason| BackfillError::InvalidRow { row, reason })?;

        let input = FootprintInput {
            vehicle_type: self.vehicle_type.as_deref().map(VehicleType::from_label),
            distance: self.distance.as_deref().and_then(parse_quantity),
            diet_type: self.diet_type.as_deref().map(DietType::from_label),
            electricity_usage: self.electricity_usage.as_deref().and_then(parse_quantity),
            gas_usage: self.gas_usage.as_deref().and_then(parse_quantity),
        };

        Ok(BackfillEntry {
            user: UserId::new(user.trim()),
            submission: FootprintSubmission {
                date,
                input,
                overrides: EmissionOverrides::default(),
            },
        })
    }
}

fn parse_quantity(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

pub struct BackfillImporter;

impl BackfillImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<BackfillEntry>, BackfillError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<BackfillEntry>, BackfillError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut entries = Vec::new();

        for (index, row) in csv_reader.deserialize::<BackfillRow>().enumerate() {
            // Header is line 1.
            entries.push(row?.into_entry(index + 2)?);
        }

        Ok(entries)
    }

    /// Submits entries oldest first. Duplicate days are skipped; storage failures abort.
    pub fn replay<F, W>(
        service: &CarbonCreditService<F, W>,
        mut entries: Vec<BackfillEntry>,
    ) -> Result<BackfillReport, CreditError>
    where
        F: FootprintRepository + 'static,
        W: WalletRepository + 'static,
    {
        entries.sort_by_key(|entry| entry.submission.date.unwrap_or(NaiveDate::MAX));
        let mut report = BackfillReport::default();

        for entry in entries {
            let date = entry.submission.date;
            match service.submit_footprint(&entry.user, entry.submission) {
                Ok(receipt) => {
                    report.submitted += 1;
                    report.credits_awarded += receipt.credit_summary.total_awarded;
                }
                Err(CreditError::DuplicateSubmission { user, date }) => {
                    warn!(%user, %date, "back-fill row skipped; day already submitted");
                    report.duplicates += 1;
                }
                Err(err) if err.is_retryable() => return Err(err),
                Err(err) => {
                    let day = date.map(|date| date.to_string()).unwrap_or_default();
                    report
                        .rejected
                        .push(format!("{} {}: {}", entry.user, day, err));
                }
            }
        }

        info!(
            submitted = report.submitted,
            duplicates = report.duplicates,
            rejected = report.rejected.len(),
            "back-fill replay finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const EXPORT: &str = "user,date,vehicle_type,distance,diet_type,electricity_usage,gas_usage\n\
a@x.com,2024-01-02,car-petrol,20,vegan,,\n\
b@x.com,2024-01-01,bus,abc,high_meat,300,150\n";

    #[test]
    fn parses_rows_with_lenient_quantities() {
        let entries = BackfillImporter::from_reader(Cursor::new(EXPORT)).expect("export parses");

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].user, UserId::new("a@x.com"));
        assert_eq!(entries[0].submission.input.distance, Some(20.0));
        assert_eq!(entries[0].submission.input.gas_usage, None);
        assert_eq!(entries[1].submission.input.distance, None);
        assert_eq!(
            entries[1].submission.input.diet_type,
            Some(DietType::HighMeat)
        );
    }

    #[test]
    fn reports_row_number_for_bad_dates() {
        let export = "user,date\na@x.com,2024-01-01\na@x.com,yesterday\n";
        match BackfillImporter::from_reader(Cursor::new(export)) {
            Err(BackfillError::InvalidRow { row, .. }) => assert_eq!(row, 3),
            other => panic!("expected invalid row, got {other:?}"),
        }
    }

    #[test]
    fn missing_user_is_rejected() {
        let export = "user,date\n,2024-01-01\n";
        assert!(matches!(
            BackfillImporter::from_reader(Cursor::new(export)),
            Err(BackfillError::InvalidRow { row: 2, .. })
        ));
    }
}
