use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::clock::Clock;
use super::domain::{CreditSummary, UserId};
use super::error::CreditError;
use super::footprints::FootprintLedger;
use super::input::{deserialize_optional_date, lenient_number};
use super::policy::CreditPolicy;
use super::repository::{FootprintRepository, WalletRepository};
use super::wallet::WalletLedger;

/// Score to be converted into credits for `user` on `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardRequest {
    #[serde(default)]
    pub user: Option<UserId>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub date: Option<NaiveDate>,
}

impl AwardRequest {
    pub fn new(user: UserId, score: f64, date: Option<NaiveDate>) -> Self {
        Self {
            user: Some(user),
            score: Some(score),
            date,
        }
    }
}

/// Stateless coordinator shared by footprint submission and manual awards.
pub struct AwardOrchestrator<F, W> {
    footprints: Arc<FootprintLedger<F>>,
    wallets: Arc<WalletLedger<W>>,
    policy: CreditPolicy,
    clock: Arc<dyn Clock>,
}

impl<F, W> AwardOrchestrator<F, W>
where
    F: FootprintRepository + 'static,
    W: WalletRepository + 'static,
{
    pub fn new(
        footprints: Arc<FootprintLedger<F>>,
        wallets: Arc<WalletLedger<W>>,
        policy: CreditPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            footprints,
            wallets,
            policy,
            clock,
        }
    }

    pub fn award_for_footprint(&self, request: AwardRequest) -> Result<CreditSummary, CreditError> {
        let user = request
            .user
            .filter(|user| !user.is_blank())
            .ok_or_else(|| CreditError::InvalidRequest("user is required".to_string()))?;
        let score = request
            .score
            .filter(|score| score.is_finite())
            .ok_or_else(|| {
                CreditError::InvalidRequest("score must be a finite number".to_string())
            })?;
        let date = request.date.unwrap_or_else(|| self.clock.today());

        let previous = self
            .footprints
            .find_previous(&user, date)?
            .map(|record| record.total_score());
        let award = self.policy.award(score, previous)?;

        let reason_base = format!("Daily footprint {date}: score {score:.1}");
        let reason_bonus = match previous {
            Some(previous) => format!("Improved on previous score {previous:.1}"),
            None => "Improved on previous score n/a".to_string(),
        };

        let (wallet, transactions) =
            self.wallets
                .apply_award(&user, award.base, award.bonus, reason_base, reason_bonus)?;

        info!(
            %user,
            %date,
            score,
            base = award.base,
            bonus = award.bonus,
            balance = wallet.credits,
            "credits awarded"
        );

        Ok(CreditSummary {
            base_credits: award.base,
            bonus_credits: award.bonus,
            total_awarded: award.total(),
            wallet,
            transactions,
        })
    }
}
