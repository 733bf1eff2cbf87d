use chrono::{DateTime, Utc};
use serde::Serialize;

use super::super::domain::UserId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeSummary {
    pub user: UserId,
    pub credits: i64,
    pub last_updated: Option<DateTime<Utc>>,
    pub average_score: Option<f64>,
    pub entries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub rank: usize,
    pub user: UserId,
    pub credits: i64,
    pub average_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationSummary {
    pub total_employees: usize,
    pub total_credits: i64,
    pub organization_average: f64,
    pub employees: Vec<EmployeeSummary>,
    pub ranking: Vec<RankingEntry>,
}
