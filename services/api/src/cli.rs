use crate::demo::{run_backfill, run_demo, BackfillArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use ecocredit::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "ecocredit-api",
    about = "Run the carbon footprint credit service and its operator tooling",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Replay historical submissions from a CSV export and print the resulting ranking
    Backfill(BackfillArgs),
    /// Seed a synthetic week for three employees and print wallets and ranking
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Backfill(args) => run_backfill(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_optional() {
        let cli = Cli::try_parse_from(["ecocredit-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn backfill_requires_a_csv_path() {
        assert!(Cli::try_parse_from(["ecocredit-api", "backfill"]).is_err());

        let cli = Cli::try_parse_from(["ecocredit-api", "backfill", "--csv", "history.csv"])
            .expect("parses");
        match cli.command {
            Some(Command::Backfill(args)) => {
                assert_eq!(args.csv, std::path::PathBuf::from("history.csv"))
            }
            other => panic!("expected backfill, got {other:?}"),
        }
    }

    #[test]
    fn demo_accepts_day_count_and_start() {
        let cli = Cli::try_parse_from([
            "ecocredit-api",
            "demo",
            "--days",
            "3",
            "--start",
            "2024-01-01",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Demo(args)) => {
                assert_eq!(args.days, 3);
                assert_eq!(
                    args.start,
                    chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                );
            }
            other => panic!("expected demo, got {other:?}"),
        }
    }

    #[test]
    fn demo_rejects_malformed_start_dates() {
        let result = Cli::try_parse_from(["ecocredit-api", "demo", "--start", "01/02/2024"]);
        assert!(result.is_err());
    }
}
