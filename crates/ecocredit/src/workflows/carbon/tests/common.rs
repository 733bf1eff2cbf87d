use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::workflows::carbon::domain::{
    CreditTransaction, DietType, FootprintId, FootprintRecord, UserId, VehicleType, Wallet,
};
use crate::workflows::carbon::input::{FootprintInput, FootprintSubmission};
use crate::workflows::carbon::repository::{
    FootprintRepository, NewTransaction, RepositoryError, UserScoreStats, WalletRepository,
};
use crate::workflows::carbon::{
    credit_router, CarbonCreditService, CreditSettings, FixedClock, InMemoryFootprintRepository,
    InMemoryWalletRepository,
};

pub(super) type MemoryService =
    CarbonCreditService<InMemoryFootprintRepository, InMemoryWalletRepository>;

pub(super) struct Harness {
    pub(super) service: Arc<MemoryService>,
    pub(super) footprints: Arc<InMemoryFootprintRepository>,
    pub(super) wallets: Arc<InMemoryWalletRepository>,
    pub(super) clock: Arc<FixedClock>,
}

pub(super) fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn build_harness(today: NaiveDate) -> Harness {
    let footprints = Arc::new(InMemoryFootprintRepository::default());
    let wallets = Arc::new(InMemoryWalletRepository::default());
    let clock = Arc::new(FixedClock::at_date(today));
    let service = Arc::new(CarbonCreditService::with_clock(
        footprints.clone(),
        wallets.clone(),
        CreditSettings::default(),
        clock.clone(),
    ));

    Harness {
        service,
        footprints,
        wallets,
        clock,
    }
}

pub(super) fn submission(
    date: Option<NaiveDate>,
    vehicle: VehicleType,
    distance: f64,
    diet: DietType,
) -> FootprintSubmission {
    FootprintSubmission {
        date,
        input: FootprintInput {
            vehicle_type: Some(vehicle),
            distance: Some(distance),
            diet_type: Some(diet),
            electricity_usage: None,
            gas_usage: None,
        },
        ..FootprintSubmission::default()
    }
}

/// car-petrol 20 km on a vegan diet: total 6.31.
pub(super) fn petrol_vegan(date: NaiveDate) -> FootprintSubmission {
    submission(Some(date), VehicleType::CarPetrol, 20.0, DietType::Vegan)
}

/// Submission whose total is forced to `score` through the override path.
pub(super) fn scored(date: NaiveDate, score: f64) -> FootprintSubmission {
    let mut submission = submission(Some(date), VehicleType::Walking, 0.0, DietType::Vegan);
    submission.overrides.total_score = Some(score);
    submission
}

pub(super) fn user(raw: &str) -> UserId {
    UserId::new(raw)
}

pub(super) fn ledger_total(service: &MemoryService, user: &UserId) -> i64 {
    service
        .get_transactions(user, Some(usize::MAX))
        .expect("ledger readable")
        .iter()
        .map(|tx| tx.amount)
        .sum()
}

pub(super) fn memory_router(harness: &Harness) -> axum::Router {
    credit_router(harness.service.clone())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}

/// Footprint store that is always offline.
pub(super) struct UnavailableFootprintRepository;

impl FootprintRepository for UnavailableFootprintRepository {
    fn insert(&self, _record: FootprintRecord) -> Result<FootprintRecord, RepositoryError> {
        Err(offline())
    }

    fn update(&self, _record: FootprintRecord) -> Result<FootprintRecord, RepositoryError> {
        Err(offline())
    }

    fn fetch(&self, _id: &FootprintId) -> Result<Option<FootprintRecord>, RepositoryError> {
        Err(offline())
    }

    fn latest_before(
        &self,
        _user: &UserId,
        _date: NaiveDate,
    ) -> Result<Option<FootprintRecord>, RepositoryError> {
        Err(offline())
    }

    fn for_user(&self, _user: &UserId) -> Result<Vec<FootprintRecord>, RepositoryError> {
        Err(offline())
    }

    fn all(&self) -> Result<Vec<FootprintRecord>, RepositoryError> {
        Err(offline())
    }

    fn remove(&self, _id: &FootprintId) -> Result<bool, RepositoryError> {
        Err(offline())
    }

    fn score_stats(&self) -> Result<Vec<UserScoreStats>, RepositoryError> {
        Err(offline())
    }
}

/// Wallet store that is always offline.
pub(super) struct UnavailableWalletRepository;

impl WalletRepository for UnavailableWalletRepository {
    fn upsert(&self, _user: &UserId, _at: DateTime<Utc>) -> Result<Wallet, RepositoryError> {
        Err(offline())
    }

    fn append_and_credit(
        &self,
        _user: &UserId,
        _entries: Vec<NewTransaction>,
        _at: DateTime<Utc>,
    ) -> Result<(Wallet, Vec<CreditTransaction>), RepositoryError> {
        Err(offline())
    }

    fn fetch(&self, _user: &UserId) -> Result<Option<Wallet>, RepositoryError> {
        Err(offline())
    }

    fn wallets(&self) -> Result<Vec<Wallet>, RepositoryError> {
        Err(offline())
    }

    fn recent_transactions(
        &self,
        _user: &UserId,
        _limit: usize,
    ) -> Result<Vec<CreditTransaction>, RepositoryError> {
        Err(offline())
    }

    fn transactions_between(
        &self,
        _user: &UserId,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<CreditTransaction>, RepositoryError> {
        Err(offline())
    }

    fn rebalance(&self, _user: &UserId, _at: DateTime<Utc>) -> Result<Wallet, RepositoryError> {
        Err(offline())
    }
}

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("connection refused".to_string())
}

pub(super) fn at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    date.and_hms_opt(hour, 0, 0)
        .map(|naive: NaiveDateTime| naive.and_utc())
        .expect("valid time")
}
