//! Carbon footprint tracking and the credit-award engine.
//!
//! Daily submissions are scored by the [`EmissionsCalculator`], stored once per user and day by
//! the [`FootprintLedger`], and converted into wallet credits by the [`AwardOrchestrator`] using
//! the [`CreditPolicy`]. The [`WalletLedger`] keeps balances and the append-only transaction
//! history, and the [`ReportingAggregator`] builds the organization ranking.

pub mod award;
pub mod clock;
pub mod domain;
pub mod emissions;
mod error;
pub mod footprints;
pub mod import;
pub mod input;
pub mod memory;
pub mod policy;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub mod wallet;

#[cfg(test)]
mod tests;

pub use award::{AwardOrchestrator, AwardRequest};
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    CreditSummary, CreditTransaction, DietType, EmissionBreakdown, FootprintId, FootprintRecord,
    TransactionId, TransactionKind, UserId, VehicleType, Wallet,
};
pub use emissions::{EmissionFactors, EmissionsCalculator};
pub use error::CreditError;
pub use footprints::FootprintLedger;
pub use import::{BackfillEntry, BackfillError, BackfillImporter, BackfillReport};
pub use input::{EmissionOverrides, FootprintInput, FootprintPatch, FootprintSubmission};
pub use memory::{InMemoryFootprintRepository, InMemoryWalletRepository};
pub use policy::{CreditAward, CreditPolicy, CreditPolicyConfig, PolicyError};
pub use report::views::{EmployeeSummary, OrganizationSummary, RankingEntry};
pub use report::ReportingAggregator;
pub use repository::{
    FootprintRepository, NewTransaction, RepositoryError, UserScoreStats, WalletRepository,
};
pub use router::{credit_router, ApiError, Caller, ROLE_HEADER, USER_HEADER};
pub use service::{CarbonCreditService, CreditSettings, SubmissionReceipt, WalletOverview};
pub use wallet::{WalletLedger, DEFAULT_TRANSACTION_LIMIT};
