//! Mutex-guarded stores used by the API service, the CLI, and tests.
//!
//! Each store keeps its state behind a single lock so the unique-key check and the insert (or the
//! ledger append and the balance increment) happen in one critical section.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{
    CreditTransaction, FootprintId, FootprintRecord, TransactionId, UserId, Wallet,
};
use super::repository::{
    FootprintRepository, NewTransaction, RepositoryError, UserScoreStats, WalletRepository,
};

#[derive(Debug, Default)]
struct FootprintTable {
    records: Vec<FootprintRecord>,
    by_day: HashMap<(UserId, NaiveDate), FootprintId>,
}

impl FootprintTable {
    fn position(&self, id: &FootprintId) -> Option<usize> {
        self.records.iter().position(|record| &record.id == id)
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryFootprintRepository {
    table: Arc<Mutex<FootprintTable>>,
}

impl InMemoryFootprintRepository {
    fn lock(&self) -> Result<MutexGuard<'_, FootprintTable>, RepositoryError> {
        self.table
            .lock()
            .map_err(|_| RepositoryError::Unavailable("footprint store lock poisoned".to_string()))
    }
}

impl FootprintRepository for InMemoryFootprintRepository {
    fn insert(&self, record: FootprintRecord) -> Result<FootprintRecord, RepositoryError> {
        let mut table = self.lock()?;
        let key = (record.user.clone(), record.date);
        if table.by_day.contains_key(&key) || table.position(&record.id).is_some() {
            return Err(RepositoryError::Conflict);
        }
        table.by_day.insert(key, record.id.clone());
        table.records.push(record.clone());
        Ok(record)
    }

    fn update(&self, record: FootprintRecord) -> Result<FootprintRecord, RepositoryError> {
        let mut table = self.lock()?;
        let index = table.position(&record.id).ok_or(RepositoryError::NotFound)?;

        let old_key = {
            let existing = &table.records[index];
            (existing.user.clone(), existing.date)
        };
        let new_key = (record.user.clone(), record.date);
        if new_key != old_key {
            if table.by_day.contains_key(&new_key) {
                return Err(RepositoryError::Conflict);
            }
            table.by_day.remove(&old_key);
            table.by_day.insert(new_key, record.id.clone());
        }

        table.records[index] = record.clone();
        Ok(record)
    }

    fn fetch(&self, id: &FootprintId) -> Result<Option<FootprintRecord>, RepositoryError> {
        let table = self.lock()?;
        Ok(table.records.iter().find(|record| &record.id == id).cloned())
    }

    fn latest_before(
        &self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<Option<FootprintRecord>, RepositoryError> {
        let table = self.lock()?;
        Ok(table
            .records
            .iter()
            .filter(|record| &record.user == user && record.date < date)
            .max_by_key(|record| record.date)
            .cloned())
    }

    fn for_user(&self, user: &UserId) -> Result<Vec<FootprintRecord>, RepositoryError> {
        let table = self.lock()?;
        Ok(table
            .records
            .iter()
            .filter(|record| &record.user == user)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<FootprintRecord>, RepositoryError> {
        Ok(self.lock()?.records.clone())
    }

    fn remove(&self, id: &FootprintId) -> Result<bool, RepositoryError> {
        let mut table = self.lock()?;
        let Some(index) = table.position(id) else {
            return Ok(false);
        };
        let removed = table.records.remove(index);
        table.by_day.remove(&(removed.user, removed.date));
        Ok(true)
    }

    fn score_stats(&self) -> Result<Vec<UserScoreStats>, RepositoryError> {
        let table = self.lock()?;
        let mut order: Vec<UserId> = Vec::new();
        let mut sums: HashMap<UserId, (f64, usize)> = HashMap::new();

        for record in &table.records {
            let entry = sums.entry(record.user.clone()).or_insert_with(|| {
                order.push(record.user.clone());
                (0.0, 0)
            });
            entry.0 += record.total_score();
            entry.1 += 1;
        }

        Ok(order
            .into_iter()
            .filter_map(|user| {
                sums.get(&user).map(|(sum, entries)| UserScoreStats {
                    average_score: sum / *entries as f64,
                    entries: *entries,
                    user,
                })
            })
            .collect())
    }
}

#[derive(Debug, Default)]
struct WalletBook {
    wallets: Vec<Wallet>,
    index: HashMap<UserId, usize>,
    transactions: Vec<CreditTransaction>,
    next_transaction: u64,
}

impl WalletBook {
    fn wallet_mut(&mut self, user: &UserId, at: DateTime<Utc>) -> &mut Wallet {
        let position = match self.index.get(user) {
            Some(position) => *position,
            None => {
                self.wallets.push(Wallet {
                    user: user.clone(),
                    credits: 0,
                    last_updated: at,
                });
                let position = self.wallets.len() - 1;
                self.index.insert(user.clone(), position);
                position
            }
        };
        &mut self.wallets[position]
    }

    fn next_transaction_id(&mut self) -> TransactionId {
        self.next_transaction += 1;
        TransactionId(format!("tx-{:06}", self.next_transaction))
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryWalletRepository {
    book: Arc<Mutex<WalletBook>>,
}

impl InMemoryWalletRepository {
    fn lock(&self) -> Result<MutexGuard<'_, WalletBook>, RepositoryError> {
        self.book
            .lock()
            .map_err(|_| RepositoryError::Unavailable("wallet store lock poisoned".to_string()))
    }

    /// Overwrites a balance without touching the ledger, simulating a half-applied award.
    #[doc(hidden)]
    pub fn force_balance(&self, user: &UserId, credits: i64) -> Result<(), RepositoryError> {
        let mut book = self.lock()?;
        let at = Utc::now();
        book.wallet_mut(user, at).credits = credits;
        Ok(())
    }
}

impl WalletRepository for InMemoryWalletRepository {
    fn upsert(&self, user: &UserId, at: DateTime<Utc>) -> Result<Wallet, RepositoryError> {
        let mut book = self.lock()?;
        Ok(book.wallet_mut(user, at).clone())
    }

    fn append_and_credit(
        &self,
        user: &UserId,
        entries: Vec<NewTransaction>,
        at: DateTime<Utc>,
    ) -> Result<(Wallet, Vec<CreditTransaction>), RepositoryError> {
        let mut book = self.lock()?;
        let mut appended = Vec::with_capacity(entries.len());

        for entry in entries {
            let id = book.next_transaction_id();
            appended.push(CreditTransaction {
                id,
                user: user.clone(),
                amount: entry.amount,
                kind: entry.kind,
                reason: entry.reason,
                created_at: at,
            });
        }
        book.transactions.extend(appended.iter().cloned());

        let increment: i64 = appended.iter().map(|tx| tx.amount).sum();
        let wallet = book.wallet_mut(user, at);
        wallet.credits += increment;
        wallet.last_updated = at;

        Ok((wallet.clone(), appended))
    }

    fn fetch(&self, user: &UserId) -> Result<Option<Wallet>, RepositoryError> {
        let book = self.lock()?;
        Ok(book
            .index
            .get(user)
            .map(|position| book.wallets[*position].clone()))
    }

    fn wallets(&self) -> Result<Vec<Wallet>, RepositoryError> {
        Ok(self.lock()?.wallets.clone())
    }

    fn recent_transactions(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<CreditTransaction>, RepositoryError> {
        let book = self.lock()?;
        Ok(book
            .transactions
            .iter()
            .rev()
            .filter(|tx| &tx.user == user)
            .take(limit)
            .cloned()
            .collect())
    }

    fn transactions_between(
        &self,
        user: &UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CreditTransaction>, RepositoryError> {
        let book = self.lock()?;
        Ok(book
            .transactions
            .iter()
            .filter(|tx| &tx.user == user && tx.created_at >= start && tx.created_at < end)
            .cloned()
            .collect())
    }

    fn rebalance(&self, user: &UserId, at: DateTime<Utc>) -> Result<Wallet, RepositoryError> {
        let mut book = self.lock()?;
        let total: i64 = book
            .transactions
            .iter()
            .filter(|tx| &tx.user == user)
            .map(|tx| tx.amount)
            .sum();
        let wallet = book.wallet_mut(user, at);
        if wallet.credits != total {
            wallet.credits = total;
            wallet.last_updated = at;
        }
        Ok(wallet.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::carbon::domain::{
        DietType, EmissionBreakdown, TransactionKind, VehicleType,
    };
    use chrono::TimeZone;

    fn record(id: &str, user: &str, date: (i32, u32, u32), total: f64) -> FootprintRecord {
        FootprintRecord {
            id: FootprintId(id.to_string()),
            user: UserId::new(user),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).expect("valid date"),
            vehicle_type: VehicleType::Bus,
            distance: 10.0,
            diet_type: DietType::Vegan,
            electricity_usage: 0.0,
            gas_usage: 0.0,
            emissions: EmissionBreakdown {
                total,
                ..EmissionBreakdown::default()
            },
        }
    }

    fn earn(amount: i64) -> NewTransaction {
        NewTransaction {
            amount,
            kind: TransactionKind::Earn,
            reason: "test".to_string(),
        }
    }

    #[test]
    fn insert_rejects_second_record_for_same_day() {
        let store = InMemoryFootprintRepository::default();
        store
            .insert(record("fp-1", "a@x.com", (2024, 1, 1), 6.0))
            .expect("first insert");

        let result = store.insert(record("fp-2", "a@x.com", (2024, 1, 1), 4.0));
        assert!(matches!(result, Err(RepositoryError::Conflict)));

        store
            .insert(record("fp-3", "b@x.com", (2024, 1, 1), 4.0))
            .expect("other users are independent");
    }

    #[test]
    fn update_moves_unique_key_with_the_date() {
        let store = InMemoryFootprintRepository::default();
        store
            .insert(record("fp-1", "a@x.com", (2024, 1, 1), 6.0))
            .expect("insert");
        store
            .insert(record("fp-2", "a@x.com", (2024, 1, 3), 6.0))
            .expect("insert");

        let clash = store.update(record("fp-1", "a@x.com", (2024, 1, 3), 6.0));
        assert!(matches!(clash, Err(RepositoryError::Conflict)));

        store
            .update(record("fp-1", "a@x.com", (2024, 1, 2), 6.0))
            .expect("free slot");
        store
            .insert(record("fp-4", "a@x.com", (2024, 1, 1), 6.0))
            .expect("old slot released");
    }

    #[test]
    fn latest_before_skips_gaps_and_later_days() {
        let store = InMemoryFootprintRepository::default();
        store
            .insert(record("fp-1", "a@x.com", (2024, 1, 1), 9.0))
            .expect("insert");
        store
            .insert(record("fp-2", "a@x.com", (2024, 1, 10), 8.0))
            .expect("insert");
        store
            .insert(record("fp-3", "a@x.com", (2024, 1, 4), 7.0))
            .expect("insert");

        let date = NaiveDate::from_ymd_opt(2024, 1, 9).expect("valid");
        let previous = store
            .latest_before(&UserId::new("a@x.com"), date)
            .expect("query")
            .expect("previous exists");
        assert_eq!(previous.id, FootprintId("fp-3".to_string()));

        let first = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid");
        assert!(store
            .latest_before(&UserId::new("a@x.com"), first)
            .expect("query")
            .is_none());
    }

    #[test]
    fn score_stats_groups_by_user_in_first_seen_order() {
        let store = InMemoryFootprintRepository::default();
        store
            .insert(record("fp-1", "b@x.com", (2024, 1, 1), 10.0))
            .expect("insert");
        store
            .insert(record("fp-2", "a@x.com", (2024, 1, 1), 4.0))
            .expect("insert");
        store
            .insert(record("fp-3", "b@x.com", (2024, 1, 2), 20.0))
            .expect("insert");

        let stats = store.score_stats().expect("aggregation");
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].user, UserId::new("b@x.com"));
        assert_eq!(stats[0].average_score, 15.0);
        assert_eq!(stats[0].entries, 2);
        assert_eq!(stats[1].entries, 1);
    }

    #[test]
    fn append_and_credit_creates_wallet_and_orders_ledger() {
        let store = InMemoryWalletRepository::default();
        let user = UserId::new("a@x.com");
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).single().expect("valid");

        let (wallet, appended) = store
            .append_and_credit(&user, vec![earn(5), earn(2)], at)
            .expect("applied");
        assert_eq!(wallet.credits, 7);
        assert_eq!(appended.len(), 2);
        assert_eq!(appended[0].id, TransactionId("tx-000001".to_string()));

        store
            .append_and_credit(&user, vec![earn(3)], at)
            .expect("applied");
        let recent = store.recent_transactions(&user, 2).expect("query");
        assert_eq!(recent[0].amount, 3);
        assert_eq!(recent[1].amount, 2);
        assert_eq!(store.wallets().expect("wallets").len(), 1);
    }

    #[test]
    fn rebalance_restores_ledger_total() {
        let store = InMemoryWalletRepository::default();
        let user = UserId::new("a@x.com");
        store
            .append_and_credit(&user, vec![earn(5)], Utc::now())
            .expect("applied");
        store.force_balance(&user, 42).expect("forced");

        let wallet = store.rebalance(&user, Utc::now()).expect("rebalanced");
        assert_eq!(wallet.credits, 5);
    }
}
