use std::sync::Arc;

use bursar::billing::DebtEngine;
use bursar::config::AppConfig;
use bursar::error::AppError;
use bursar::telemetry;
use clap::{Parser, Subcommand};

use crate::commands::{
    run_collections, run_expire_agreements, run_pay, run_statement, run_status, CollectionsArgs,
    ExpireAgreementsArgs, PayArgs, StatementArgs, StatusArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "bursar",
    about = "Evaluate student delinquency and debt, register payments and report collections",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show whether a student is delinquent and how much they owe
    Status(StatusArgs),
    /// Print a student's account statement as JSON
    Statement(StatementArgs),
    /// Summarize projected and collected income and list students with debt
    Collections(CollectionsArgs),
    /// Settle every unpaid enrollment of a student and write the updated snapshot
    Pay(PayArgs),
    /// Deactivate payment agreements whose expiry date has passed
    ExpireAgreements(ExpireAgreementsArgs),
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    tracing::debug!(environment = ?config.environment, "configuration loaded");

    let engine = Arc::new(DebtEngine::new(config.policy));

    match cli.command {
        Command::Status(args) => run_status(&engine, args),
        Command::Statement(args) => run_statement(&engine, args),
        Command::Collections(args) => run_collections(&engine, args),
        Command::Pay(args) => run_pay(engine, args),
        Command::ExpireAgreements(args) => run_expire_agreements(args),
    }
}
