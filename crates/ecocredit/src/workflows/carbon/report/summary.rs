use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::super::domain::{UserId, Wallet};
use super::super::error::CreditError;
use super::super::repository::{FootprintRepository, UserScoreStats, WalletRepository};
use super::views::{EmployeeSummary, OrganizationSummary, RankingEntry};

/// Read-only cross-user view over both stores.
pub struct ReportingAggregator<F, W> {
    footprints: Arc<F>,
    wallets: Arc<W>,
}

impl<F, W> ReportingAggregator<F, W>
where
    F: FootprintRepository + 'static,
    W: WalletRepository + 'static,
{
    pub fn new(footprints: Arc<F>, wallets: Arc<W>) -> Self {
        Self {
            footprints,
            wallets,
        }
    }

    pub fn organization_summary(&self) -> Result<OrganizationSummary, CreditError> {
        let stats = self.footprints.score_stats()?;
        let wallets = self.wallets.wallets()?;

        let employees = join_employees(&wallets, &stats);
        let ranking = rank_by_credits(&employees);

        let total_credits = employees.iter().map(|employee| employee.credits).sum();
        let averages: Vec<f64> = employees
            .iter()
            .filter_map(|employee| employee.average_score)
            .collect();
        // Each user weighs the same regardless of how many days they submitted.
        let organization_average = if averages.is_empty() {
            0.0
        } else {
            averages.iter().sum::<f64>() / averages.len() as f64
        };

        Ok(OrganizationSummary {
            total_employees: employees.len(),
            total_credits,
            organization_average,
            employees,
            ranking,
        })
    }
}

/// Full outer join keyed by user: wallet holders in storage order, then users who only have
/// footprints. A missing wallet means 0 credits; missing footprints mean no average, 0 entries.
pub(crate) fn join_employees(wallets: &[Wallet], stats: &[UserScoreStats]) -> Vec<EmployeeSummary> {
    let by_user: HashMap<&UserId, &UserScoreStats> =
        stats.iter().map(|stat| (&stat.user, stat)).collect();

    let mut employees: Vec<EmployeeSummary> = wallets
        .iter()
        .map(|wallet| {
            let stat = by_user.get(&wallet.user);
            EmployeeSummary {
                user: wallet.user.clone(),
                credits: wallet.credits,
                last_updated: Some(wallet.last_updated),
                average_score: stat.map(|stat| stat.average_score),
                entries: stat.map(|stat| stat.entries).unwrap_or(0),
            }
        })
        .collect();

    let with_wallet: HashSet<&UserId> = wallets.iter().map(|wallet| &wallet.user).collect();
    employees.extend(
        stats
            .iter()
            .filter(|stat| !with_wallet.contains(&stat.user))
            .map(|stat| EmployeeSummary {
                user: stat.user.clone(),
                credits: 0,
                last_updated: None,
                average_score: Some(stat.average_score),
                entries: stat.entries,
            }),
    );

    employees
}

/// Credits descending; ties keep their input order.
pub(crate) fn rank_by_credits(employees: &[EmployeeSummary]) -> Vec<RankingEntry> {
    let mut ordered: Vec<&EmployeeSummary> = employees.iter().collect();
    ordered.sort_by(|a, b| b.credits.cmp(&a.credits));

    ordered
        .into_iter()
        .enumerate()
        .map(|(index, employee)| RankingEntry {
            rank: index + 1,
            user: employee.user.clone(),
            credits: employee.credits,
            average_score: employee.average_score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn wallet(user: &str, credits: i64) -> Wallet {
        Wallet {
            user: UserId::new(user),
            credits,
            last_updated: Utc
                .with_ymd_and_hms(2024, 1, 2, 8, 0, 0)
                .single()
                .expect("valid"),
        }
    }

    fn stat(user: &str, average_score: f64, entries: usize) -> UserScoreStats {
        UserScoreStats {
            user: UserId::new(user),
            average_score,
            entries,
        }
    }

    #[test]
    fn join_fills_missing_sides_with_defaults() {
        let wallets = vec![wallet("a@x.com", 5), wallet("credit-only@x.com", 9)];
        let stats = vec![stat("a@x.com", 6.31, 1), stat("footprint-only@x.com", 12.0, 3)];

        let employees = join_employees(&wallets, &stats);
        assert_eq!(employees.len(), 3);

        let credit_only = &employees[1];
        assert_eq!(credit_only.user, UserId::new("credit-only@x.com"));
        assert_eq!(credit_only.average_score, None);
        assert_eq!(credit_only.entries, 0);

        let footprint_only = &employees[2];
        assert_eq!(footprint_only.credits, 0);
        assert!(footprint_only.last_updated.is_none());
        assert_eq!(footprint_only.entries, 3);
    }

    #[test]
    fn ranking_is_descending_and_stable_for_ties() {
        let wallets = vec![
            wallet("first@x.com", 3),
            wallet("top@x.com", 10),
            wallet("second@x.com", 3),
        ];
        let employees = join_employees(&wallets, &[]);

        let ranking = rank_by_credits(&employees);
        let order: Vec<(usize, &str)> = ranking
            .iter()
            .map(|entry| (entry.rank, entry.user.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![(1, "top@x.com"), (2, "first@x.com"), (3, "second@x.com")]
        );
    }
}
