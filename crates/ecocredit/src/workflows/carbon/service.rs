use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::award::{AwardOrchestrator, AwardRequest};
use super::clock::{Clock, SystemClock};
use super::domain::{CreditSummary, CreditTransaction, FootprintId, FootprintRecord, UserId, Wallet};
use super::emissions::{EmissionFactors, EmissionsCalculator};
use super::error::CreditError;
use super::footprints::FootprintLedger;
use super::input::{FootprintPatch, FootprintSubmission};
use super::policy::{CreditPolicy, CreditPolicyConfig};
use super::report::views::OrganizationSummary;
use super::report::ReportingAggregator;
use super::repository::{FootprintRepository, WalletRepository};
use super::wallet::{WalletLedger, DEFAULT_TRANSACTION_LIMIT};

/// Tunables for the engine; the defaults reproduce the standard factor and credit tables.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditSettings {
    pub factors: EmissionFactors,
    pub policy: CreditPolicyConfig,
    pub transaction_page_size: usize,
    pub wallet_recent_limit: usize,
}

impl Default for CreditSettings {
    fn default() -> Self {
        Self {
            factors: EmissionFactors::standard(),
            policy: CreditPolicyConfig::default(),
            transaction_page_size: DEFAULT_TRANSACTION_LIMIT,
            wallet_recent_limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReceipt {
    pub record: FootprintRecord,
    pub credit_summary: CreditSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletOverview {
    pub wallet: Wallet,
    pub today_credits: i64,
    pub recent_transactions: Vec<CreditTransaction>,
}

/// Facade composing the ledgers, the award orchestrator, and reporting.
pub struct CarbonCreditService<F, W> {
    footprints: Arc<FootprintLedger<F>>,
    wallets: Arc<WalletLedger<W>>,
    awards: AwardOrchestrator<F, W>,
    reports: ReportingAggregator<F, W>,
    clock: Arc<dyn Clock>,
    settings: CreditSettings,
}

impl<F, W> CarbonCreditService<F, W>
where
    F: FootprintRepository + 'static,
    W: WalletRepository + 'static,
{
    pub fn new(footprints: Arc<F>, wallets: Arc<W>, settings: CreditSettings) -> Self {
        Self::with_clock(footprints, wallets, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        footprint_store: Arc<F>,
        wallet_store: Arc<W>,
        settings: CreditSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let calculator = EmissionsCalculator::new(settings.factors.clone());
        let footprints = Arc::new(FootprintLedger::new(
            footprint_store.clone(),
            calculator,
            clock.clone(),
        ));
        let wallets = Arc::new(WalletLedger::new(wallet_store.clone(), clock.clone()));
        let awards = AwardOrchestrator::new(
            footprints.clone(),
            wallets.clone(),
            CreditPolicy::new(settings.policy.clone()),
            clock.clone(),
        );
        let reports = ReportingAggregator::new(footprint_store, wallet_store);

        Self {
            footprints,
            wallets,
            awards,
            reports,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &CreditSettings {
        &self.settings
    }

    /// Store the day's footprint, then award credits through the shared award path.
    ///
    /// If the award fails the footprint stays recorded and the error is returned; the award can
    /// be back-filled with [`CarbonCreditService::manual_award`].
    pub fn submit_footprint(
        &self,
        user: &UserId,
        submission: FootprintSubmission,
    ) -> Result<SubmissionReceipt, CreditError> {
        let record = self.footprints.submit(user, submission)?;

        let request = AwardRequest::new(record.user.clone(), record.total_score(), Some(record.date));
        let credit_summary = match self.awards.award_for_footprint(request) {
            Ok(summary) => summary,
            Err(err) => {
                warn!(
                    user = %record.user,
                    date = %record.date,
                    footprint = %record.id,
                    error = %err,
                    "footprint recorded but credit award failed"
                );
                return Err(err);
            }
        };

        info!(
            user = %record.user,
            date = %record.date,
            score = record.total_score(),
            awarded = credit_summary.total_awarded,
            "footprint submitted"
        );

        Ok(SubmissionReceipt {
            record,
            credit_summary,
        })
    }

    pub fn update_footprint(
        &self,
        id: &FootprintId,
        patch: FootprintPatch,
    ) -> Result<FootprintRecord, CreditError> {
        self.footprints.update(id, patch)
    }

    pub fn get_footprint(&self, id: &FootprintId) -> Result<FootprintRecord, CreditError> {
        self.footprints.get(id)
    }

    /// One user's records, or every record when `user` is `None`.
    pub fn list_footprints(
        &self,
        user: Option<&UserId>,
    ) -> Result<Vec<FootprintRecord>, CreditError> {
        match user {
            Some(user) => self.footprints.list_for_user(user),
            None => self.footprints.list_all(),
        }
    }

    pub fn delete_footprint(&self, id: &FootprintId) -> Result<(), CreditError> {
        self.footprints.delete(id)
    }

    pub fn manual_award(&self, request: AwardRequest) -> Result<CreditSummary, CreditError> {
        self.awards.award_for_footprint(request)
    }

    pub fn get_wallet(&self, user: &UserId) -> Result<WalletOverview, CreditError> {
        let wallet = self.wallets.ensure_wallet(user)?;
        let today_credits = self.wallets.credits_on_date(user, self.clock.today())?;
        let recent_transactions = self
            .wallets
            .transactions_for_user(user, Some(self.settings.wallet_recent_limit))?;

        Ok(WalletOverview {
            wallet,
            today_credits,
            recent_transactions,
        })
    }

    pub fn get_transactions(
        &self,
        user: &UserId,
        limit: Option<usize>,
    ) -> Result<Vec<CreditTransaction>, CreditError> {
        let limit = limit.unwrap_or(self.settings.transaction_page_size);
        self.wallets.transactions_for_user(user, Some(limit))
    }

    pub fn admin_summary(&self) -> Result<OrganizationSummary, CreditError> {
        self.reports.organization_summary()
    }

    pub fn reconcile_wallet(&self, user: &UserId) -> Result<Wallet, CreditError> {
        self.wallets.reconcile(user)
    }
}
