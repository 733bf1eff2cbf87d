use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::{debug, warn};

use super::clock::Clock;
use super::domain::{CreditTransaction, TransactionKind, UserId, Wallet};
use super::error::CreditError;
use super::repository::{NewTransaction, WalletRepository};

pub const DEFAULT_TRANSACTION_LIMIT: usize = 25;

/// Owns wallets and the append-only credit ledger. The ledger is authoritative: a balance can
/// always be rebuilt from it with [`WalletLedger::reconcile`].
pub struct WalletLedger<W> {
    repository: Arc<W>,
    clock: Arc<dyn Clock>,
}

impl<W> WalletLedger<W>
where
    W: WalletRepository + 'static,
{
    pub fn new(repository: Arc<W>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub fn ensure_wallet(&self, user: &UserId) -> Result<Wallet, CreditError> {
        if user.is_blank() {
            return Err(CreditError::InvalidUser);
        }
        Ok(self.repository.upsert(user, self.clock.now())?)
    }

    /// Record an `earn` entry (and a `bonus` entry when `bonus > 0`) and credit their sum.
    pub fn apply_award(
        &self,
        user: &UserId,
        base: i64,
        bonus: i64,
        reason_base: String,
        reason_bonus: String,
    ) -> Result<(Wallet, Vec<CreditTransaction>), CreditError> {
        if user.is_blank() {
            return Err(CreditError::InvalidUser);
        }

        let mut entries = vec![NewTransaction {
            amount: base,
            kind: TransactionKind::Earn,
            reason: reason_base,
        }];
        if bonus > 0 {
            entries.push(NewTransaction {
                amount: bonus,
                kind: TransactionKind::Bonus,
                reason: reason_bonus,
            });
        }

        let (wallet, transactions) =
            self.repository
                .append_and_credit(user, entries, self.clock.now())?;
        debug!(%user, base, bonus, balance = wallet.credits, "credits applied");
        Ok((wallet, transactions))
    }

    pub fn wallet(&self, user: &UserId) -> Result<Option<Wallet>, CreditError> {
        Ok(self.repository.fetch(user)?)
    }

    pub fn wallets(&self) -> Result<Vec<Wallet>, CreditError> {
        Ok(self.repository.wallets()?)
    }

    /// Newest first, capped at `limit` (25 when `None`).
    pub fn transactions_for_user(
        &self,
        user: &UserId,
        limit: Option<usize>,
    ) -> Result<Vec<CreditTransaction>, CreditError> {
        let limit = limit.unwrap_or(DEFAULT_TRANSACTION_LIMIT);
        Ok(self.repository.recent_transactions(user, limit)?)
    }

    /// Every entry stamped within the UTC calendar day `date`.
    pub fn transactions_on_date(
        &self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<Vec<CreditTransaction>, CreditError> {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1);
        Ok(self.repository.transactions_between(user, start, end)?)
    }

    pub fn credits_on_date(&self, user: &UserId, date: NaiveDate) -> Result<i64, CreditError> {
        Ok(self
            .transactions_on_date(user, date)?
            .iter()
            .map(|tx| tx.amount)
            .sum())
    }

    /// Rebuild the balance from the ledger after a partially applied award.
    pub fn reconcile(&self, user: &UserId) -> Result<Wallet, CreditError> {
        if user.is_blank() {
            return Err(CreditError::InvalidUser);
        }

        let before = self.repository.fetch(user)?;
        let wallet = self.repository.rebalance(user, self.clock.now())?;
        if let Some(before) = before {
            if before.credits != wallet.credits {
                warn!(
                    %user,
                    recorded = before.credits,
                    ledger = wallet.credits,
                    "wallet balance drifted from ledger; corrected"
                );
            }
        }
        Ok(wallet)
    }
}
