use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::domain::{
    CreditTransaction, FootprintId, FootprintRecord, TransactionKind, UserId, Wallet,
};

/// Footprint storage. Implementations must enforce (user, date) uniqueness inside `insert` and
/// `update` rather than relying on callers to check first.
pub trait FootprintRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the (user, date) slot is taken.
    fn insert(&self, record: FootprintRecord) -> Result<FootprintRecord, RepositoryError>;
    /// Replaces a record by id, re-checking the unique key if the date moved.
    fn update(&self, record: FootprintRecord) -> Result<FootprintRecord, RepositoryError>;
    fn fetch(&self, id: &FootprintId) -> Result<Option<FootprintRecord>, RepositoryError>;
    /// Most recent record for `user` strictly before `date`.
    fn latest_before(
        &self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<Option<FootprintRecord>, RepositoryError>;
    fn for_user(&self, user: &UserId) -> Result<Vec<FootprintRecord>, RepositoryError>;
    fn all(&self) -> Result<Vec<FootprintRecord>, RepositoryError>;
    /// Returns whether a record was removed.
    fn remove(&self, id: &FootprintId) -> Result<bool, RepositoryError>;
    /// Group-by-user aggregation of `total_score`.
    fn score_stats(&self) -> Result<Vec<UserScoreStats>, RepositoryError>;
}

/// Wallet and ledger storage. Every mutation for a user is serialized by the implementation.
pub trait WalletRepository: Send + Sync {
    /// Find-or-create with a zero balance.
    fn upsert(&self, user: &UserId, at: DateTime<Utc>) -> Result<Wallet, RepositoryError>;
    /// Appends `entries` and increments the balance by their sum as one atomic step, creating the
    /// wallet if needed.
    fn append_and_credit(
        &self,
        user: &UserId,
        entries: Vec<NewTransaction>,
        at: DateTime<Utc>,
    ) -> Result<(Wallet, Vec<CreditTransaction>), RepositoryError>;
    fn fetch(&self, user: &UserId) -> Result<Option<Wallet>, RepositoryError>;
    fn wallets(&self) -> Result<Vec<Wallet>, RepositoryError>;
    /// Newest first.
    fn recent_transactions(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<CreditTransaction>, RepositoryError>;
    /// Transactions with `start <= created_at < end`, oldest first.
    fn transactions_between(
        &self,
        user: &UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CreditTransaction>, RepositoryError>;
    /// Resets the balance to the sum of the user's ledger entries.
    fn rebalance(&self, user: &UserId, at: DateTime<Utc>) -> Result<Wallet, RepositoryError>;
}

/// Ledger entry before the store assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub amount: i64,
    pub kind: TransactionKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserScoreStats {
    pub user: UserId,
    pub average_score: f64,
    pub entries: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
