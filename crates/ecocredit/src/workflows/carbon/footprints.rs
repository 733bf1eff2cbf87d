use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use super::clock::Clock;
use super::domain::{FootprintId, FootprintRecord, UserId};
use super::emissions::EmissionsCalculator;
use super::error::CreditError;
use super::input::{FootprintInput, FootprintPatch, FootprintSubmission};
use super::repository::{FootprintRepository, RepositoryError};

static FOOTPRINT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_footprint_id() -> FootprintId {
    let id = FOOTPRINT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    FootprintId(format!("fp-{id:06}"))
}

/// Owns footprint records: derivation on write, per-day uniqueness, and history lookups.
pub struct FootprintLedger<R> {
    repository: Arc<R>,
    calculator: EmissionsCalculator,
    clock: Arc<dyn Clock>,
}

impl<R> FootprintLedger<R>
where
    R: FootprintRepository + 'static,
{
    pub fn new(repository: Arc<R>, calculator: EmissionsCalculator, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            calculator,
            clock,
        }
    }

    /// Persist a day's submission. Emission values supplied by the caller win over derived ones.
    pub fn submit(
        &self,
        user: &UserId,
        submission: FootprintSubmission,
    ) -> Result<FootprintRecord, CreditError> {
        if user.is_blank() {
            return Err(CreditError::InvalidRequest(
                "user identifier is required".to_string(),
            ));
        }

        let date = submission.date.unwrap_or_else(|| self.clock.today());
        let derived = self.calculator.derive(&submission.input);
        let emissions = submission.overrides.resolve(derived);
        let input = submission.input.normalized();

        let record = FootprintRecord {
            id: next_footprint_id(),
            user: user.clone(),
            date,
            vehicle_type: input.vehicle_type,
            distance: input.distance,
            diet_type: input.diet_type,
            electricity_usage: input.electricity_usage,
            gas_usage: input.gas_usage,
            emissions,
        };

        let stored = self
            .repository
            .insert(record)
            .map_err(|err| duplicate_or(err, user, date))?;
        debug!(user = %stored.user, date = %stored.date, score = stored.total_score(), "footprint stored");
        Ok(stored)
    }

    /// Merge `patch` over the stored inputs and recompute every emission field.
    pub fn update(
        &self,
        id: &FootprintId,
        patch: FootprintPatch,
    ) -> Result<FootprintRecord, CreditError> {
        let existing = self
            .repository
            .fetch(id)?
            .ok_or_else(|| CreditError::NotFound(format!("footprint {id}")))?;

        let merged = patch.merge_into(FootprintInput::from_record(&existing));
        let emissions = self.calculator.derive(&merged);
        let input = merged.normalized();
        let date = patch.date.unwrap_or(existing.date);

        let record = FootprintRecord {
            id: existing.id,
            user: existing.user,
            date,
            vehicle_type: input.vehicle_type,
            distance: input.distance,
            diet_type: input.diet_type,
            electricity_usage: input.electricity_usage,
            gas_usage: input.gas_usage,
            emissions,
        };

        let user = record.user.clone();
        match self.repository.update(record) {
            Ok(updated) => Ok(updated),
            Err(RepositoryError::NotFound) => Err(CreditError::NotFound(format!("footprint {id}"))),
            Err(err) => Err(duplicate_or(err, &user, date)),
        }
    }

    pub fn get(&self, id: &FootprintId) -> Result<FootprintRecord, CreditError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| CreditError::NotFound(format!("footprint {id}")))
    }

    /// Latest submission strictly before `before`, however many days back.
    pub fn find_previous(
        &self,
        user: &UserId,
        before: NaiveDate,
    ) -> Result<Option<FootprintRecord>, CreditError> {
        Ok(self.repository.latest_before(user, before)?)
    }

    pub fn list_for_user(&self, user: &UserId) -> Result<Vec<FootprintRecord>, CreditError> {
        Ok(self.repository.for_user(user)?)
    }

    pub fn list_all(&self) -> Result<Vec<FootprintRecord>, CreditError> {
        Ok(self.repository.all()?)
    }

    /// Succeeds whether or not the record exists.
    pub fn delete(&self, id: &FootprintId) -> Result<(), CreditError> {
        let removed = self.repository.remove(id)?;
        debug!(%id, removed, "footprint delete");
        Ok(())
    }
}

fn duplicate_or(err: RepositoryError, user: &UserId, date: NaiveDate) -> CreditError {
    match err {
        RepositoryError::Conflict => CreditError::DuplicateSubmission {
            user: user.clone(),
            date,
        },
        other => other.into(),
    }
}
