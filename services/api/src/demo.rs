use crate::infra::{in_memory_service, in_memory_service_with_clock, MemoryCreditService};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use ecocredit::config::AppConfig;
use ecocredit::error::AppError;
use ecocredit::workflows::carbon::input::parse_date;
use ecocredit::workflows::carbon::{
    BackfillImporter, BackfillReport, CreditError, CreditSettings, DietType, FixedClock,
    FootprintInput, FootprintSubmission, OrganizationSummary, UserId, VehicleType,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct BackfillArgs {
    /// CSV export with columns user,date,vehicle_type,distance,diet_type,electricity_usage,gas_usage
    #[arg(long)]
    pub(crate) csv: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of consecutive days to simulate.
    #[arg(long, default_value_t = 7)]
    pub(crate) days: u32,
    /// First simulated day (YYYY-MM-DD). Defaults to `days` days before today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
}

/// Commute and household profile for one simulated employee.
struct Commuter {
    user: &'static str,
    vehicle: VehicleType,
    base_distance: f64,
    diet: DietType,
    electricity_kwh: f64,
    gas_kwh: f64,
}

const COMMUTERS: [Commuter; 3] = [
    Commuter {
        user: "avery@example.com",
        vehicle: VehicleType::CarPetrol,
        base_distance: 42.0,
        diet: DietType::HighMeat,
        electricity_kwh: 320.0,
        gas_kwh: 410.0,
    },
    Commuter {
        user: "blake@example.com",
        vehicle: VehicleType::Train,
        base_distance: 35.0,
        diet: DietType::Vegetarian,
        electricity_kwh: 210.0,
        gas_kwh: 150.0,
    },
    Commuter {
        user: "casey@example.com",
        vehicle: VehicleType::Bicycle,
        base_distance: 9.0,
        diet: DietType::Vegan,
        electricity_kwh: 180.0,
        gas_kwh: 0.0,
    },
];

impl Commuter {
    fn profile(&self) -> String {
        format!(
            "{}: {} {:.0} km/day, {} diet, {:.0} kWh electricity + {:.0} kWh gas per month",
            self.user,
            self.vehicle.label(),
            self.base_distance,
            self.diet.label(),
            self.electricity_kwh,
            self.gas_kwh
        )
    }

    /// Distance shrinks a little each day so improvement bonuses show up in the ledger.
    fn submission(&self, date: NaiveDate, day_index: u32) -> FootprintSubmission {
        let taper = 1.0 - 0.08 * f64::from(day_index % 5);
        FootprintSubmission {
            date: Some(date),
            input: FootprintInput {
                vehicle_type: Some(self.vehicle),
                distance: Some(self.base_distance * taper),
                diet_type: Some(self.diet),
                electricity_usage: Some(self.electricity_kwh),
                gas_usage: Some(self.gas_kwh),
            },
            ..FootprintSubmission::default()
        }
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { days, start } = args;
    let days = days.max(1);
    let start = start
        .unwrap_or_else(|| Local::now().date_naive() - Duration::days(i64::from(days)));

    let clock = Arc::new(FixedClock::at_date(start));
    let service = in_memory_service_with_clock(CreditSettings::default(), clock.clone());

    println!("Carbon credit demo");
    println!(
        "Simulating {} day(s) from {} for {} employees",
        days,
        start,
        COMMUTERS.len()
    );
    for commuter in &COMMUTERS {
        println!("- {}", commuter.profile());
    }

    for day_index in 0..days {
        let date = start + Duration::days(i64::from(day_index));
        println!("\n{date}");
        for commuter in &COMMUTERS {
            let user = UserId::new(commuter.user);
            let receipt = service.submit_footprint(&user, commuter.submission(date, day_index))?;
            println!(
                "  - {}: score {:.2} kg CO2e | +{} credits ({} base, {} bonus) | balance {}",
                user,
                receipt.record.total_score(),
                receipt.credit_summary.total_awarded,
                receipt.credit_summary.base_credits,
                receipt.credit_summary.bonus_credits,
                receipt.credit_summary.wallet.credits
            );
        }
        clock.advance(Duration::days(1));
    }

    println!("\nWallets");
    for commuter in &COMMUTERS {
        render_wallet(&service, &UserId::new(commuter.user))?;
    }

    render_summary(&service.admin_summary()?);
    Ok(())
}

pub(crate) fn run_backfill(args: BackfillArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = in_memory_service(config.ledger.credit_settings());

    let entries = BackfillImporter::from_path(&args.csv)?;
    println!(
        "Replaying {} historical submission(s) from {}",
        entries.len(),
        args.csv.display()
    );
    let report = BackfillImporter::replay(&service, entries)?;
    render_backfill_report(&report);
    render_summary(&service.admin_summary()?);
    Ok(())
}

fn render_wallet(service: &MemoryCreditService, user: &UserId) -> Result<(), CreditError> {
    let overview = service.get_wallet(user)?;
    println!(
        "- {}: {} credits ({} earned today)",
        user, overview.wallet.credits, overview.today_credits
    );
    for transaction in overview.recent_transactions.iter().take(3) {
        println!(
            "    {} {:+} {}",
            transaction.kind.label(),
            transaction.amount,
            transaction.reason
        );
    }
    Ok(())
}

fn render_backfill_report(report: &BackfillReport) {
    println!(
        "- {} submitted | {} duplicate day(s) skipped | {} credits awarded",
        report.submitted, report.duplicates, report.credits_awarded
    );
    if report.rejected.is_empty() {
        println!("- Rejected rows: none");
    } else {
        println!("- Rejected rows:");
        for rejection in &report.rejected {
            println!("    {rejection}");
        }
    }
}

pub(crate) fn render_summary(summary: &OrganizationSummary) {
    println!("\nOrganization summary");
    println!(
        "- {} employees | {} credits in circulation | average daily score {:.2} kg CO2e",
        summary.total_employees, summary.total_credits, summary.organization_average
    );

    if summary.ranking.is_empty() {
        println!("\nRanking: no wallets yet");
        return;
    }

    println!("\nRanking");
    for entry in &summary.ranking {
        let average = entry
            .average_score
            .map(|score| format!("{score:.2}"))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "{:>3}. {} - {} credits (avg score {})",
            entry.rank, entry.user, entry.credits, average
        );
    }
}
