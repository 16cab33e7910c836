use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use bursar::billing::{
    expire_lapsed_agreements, AccountStatement, Catalog, CatalogSnapshot, CollectionReport,
    DebtEngine, DebtorSnapshot, InMemoryPaymentRegistry, Money, PaymentDesk, PaymentMethod,
    PaymentRequest, StudentId,
};
use bursar::error::AppError;
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub(crate) struct SnapshotArgs {
    /// JSON snapshot with programs, terms, sections, students, enrollments and payments
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Evaluation instant (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS). Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    pub(crate) as_of: Option<NaiveDateTime>,
}

impl SnapshotArgs {
    fn as_of(&self) -> NaiveDateTime {
        self.as_of.unwrap_or_else(|| Local::now().naive_local())
    }

    fn load(&self) -> Result<CatalogSnapshot, AppError> {
        Ok(CatalogSnapshot::from_path(&self.snapshot)?)
    }
}

#[derive(Args, Debug)]
pub(crate) struct StatusArgs {
    #[command(flatten)]
    pub(crate) source: SnapshotArgs,
    /// Student identifier
    #[arg(long)]
    pub(crate) student: String,
    /// Print the status as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct StatementArgs {
    #[command(flatten)]
    pub(crate) source: SnapshotArgs,
    /// Student identifier
    #[arg(long)]
    pub(crate) student: String,
}

#[derive(Args, Debug)]
pub(crate) struct CollectionsArgs {
    #[command(flatten)]
    pub(crate) source: SnapshotArgs,
    /// Write the collection list as CSV to this path
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct PayArgs {
    #[command(flatten)]
    pub(crate) source: SnapshotArgs,
    /// Student identifier
    #[arg(long)]
    pub(crate) student: String,
    /// Payment method: cash, transfer or card
    #[arg(long)]
    pub(crate) method: PaymentMethod,
    /// Receipt number. Generated from the payment time when omitted.
    #[arg(long)]
    pub(crate) receipt: Option<String>,
    /// Treasurer registering the payment
    #[arg(long)]
    pub(crate) processed_by: Option<String>,
    /// Where to write the updated snapshot. Defaults to the input snapshot.
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ExpireAgreementsArgs {
    #[command(flatten)]
    pub(crate) source: SnapshotArgs,
    /// Where to write the updated snapshot. Defaults to the input snapshot.
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct StatusView<'a> {
    student: &'a StudentId,
    name: &'a str,
    as_of: NaiveDate,
    delinquent: bool,
    standing: String,
    total_debt: Money,
    overdue_debt: Money,
}

pub(crate) fn run_status(engine: &DebtEngine, args: StatusArgs) -> Result<(), AppError> {
    let catalog = Catalog::new(args.source.load()?);
    let snapshot = debtor(&catalog, args.student, args.source.as_of())?;

    let verdict = engine.assess(&snapshot, &catalog);
    let view = StatusView {
        student: &snapshot.student.id,
        name: &snapshot.student.name,
        as_of: snapshot.today(),
        delinquent: verdict.is_delinquent(),
        standing: verdict.summary(),
        total_debt: engine.total_debt(&snapshot, &catalog)?,
        overdue_debt: engine.overdue_debt(&snapshot, &catalog, &catalog)?,
    };

    if args.json {
        return print_json(&view);
    }

    println!("{} ({}) as of {}", view.name, view.student, view.as_of);
    println!("- Standing: {}", view.standing);
    println!("- Total debt: {}", view.total_debt);
    println!("- Overdue debt: {}", view.overdue_debt);
    Ok(())
}

pub(crate) fn run_statement(engine: &DebtEngine, args: StatementArgs) -> Result<(), AppError> {
    let catalog = Catalog::new(args.source.load()?);
    let snapshot = debtor(&catalog, args.student, args.source.as_of())?;

    let statement = AccountStatement::build(engine, &snapshot, &catalog, &catalog)?;
    print_json(&statement)
}

pub(crate) fn run_collections(engine: &DebtEngine, args: CollectionsArgs) -> Result<(), AppError> {
    let catalog = Catalog::new(args.source.load()?);
    let report = CollectionReport::build(engine, &catalog, args.source.as_of())?;

    println!("Collection report as of {}", report.as_of);
    println!(
        "- Projected income {} | collected {} | collection rate {}%",
        report.projected_income, report.collected_income, report.collection_rate
    );
    println!(
        "- {} students with debt, {} delinquent",
        report.entries.len(),
        report.delinquent_students
    );
    for entry in &report.entries {
        let flag = if entry.delinquent { "DELINQUENT" } else { "current" };
        println!(
            "  - {} {}: total {} | overdue {} [{}]",
            entry.student, entry.name, entry.total_debt, entry.overdue_debt, flag
        );
    }

    if let Some(path) = args.csv {
        let mut writer = BufWriter::new(File::create(&path)?);
        report.write_csv(&mut writer)?;
        writer.flush()?;
        println!("Collection list written to {}", path.display());
    }
    Ok(())
}

pub(crate) fn run_pay(engine: Arc<DebtEngine>, args: PayArgs) -> Result<(), AppError> {
    let PayArgs {
        source,
        student,
        method,
        receipt,
        processed_by,
        output,
    } = args;

    let paid_at = source.as_of();
    let catalog = Catalog::new(source.load()?);
    let registry = Arc::new(InMemoryPaymentRegistry::with_payments(
        catalog.payments().iter().cloned(),
    ));
    let desk = PaymentDesk::new(engine, registry);

    let request = PaymentRequest {
        method,
        receipt,
        processed_by,
        paid_at,
    };
    let outcome = {
        let snapshot = debtor(&catalog, student, paid_at)?;
        desk.register(&snapshot, &catalog, &request)?
    };

    for payment in &outcome.payments {
        println!(
            "- {} settled {} via {} (receipt {})",
            payment.enrollment,
            payment.amount,
            payment.method.label(),
            payment.receipt
        );
    }
    for enrollment in &outcome.skipped {
        println!("- {enrollment} skipped: section not found in snapshot");
    }
    println!(
        "Registered {} payment(s) for {} totalling {}",
        outcome.payments.len(),
        outcome.student,
        outcome.total
    );

    let mut updated = catalog.into_snapshot();
    updated.apply_payments(&outcome.payments);
    let destination = output.unwrap_or(source.snapshot);
    updated.save(&destination)?;
    println!("Snapshot written to {}", destination.display());
    Ok(())
}

pub(crate) fn run_expire_agreements(args: ExpireAgreementsArgs) -> Result<(), AppError> {
    let today = args.source.as_of().date();
    let mut snapshot = args.source.load()?;

    let expired = expire_lapsed_agreements(&mut snapshot.students, today);
    if expired.is_empty() {
        println!("No payment agreements lapsed as of {today}");
        return Ok(());
    }
    for student in &expired {
        println!("- agreement for {student} expired");
    }

    let destination = args.output.unwrap_or(args.source.snapshot);
    snapshot.save(&destination)?;
    println!("Snapshot written to {}", destination.display());
    Ok(())
}

fn debtor(
    catalog: &Catalog,
    student: String,
    as_of: NaiveDateTime,
) -> Result<DebtorSnapshot<'_>, AppError> {
    let student = StudentId(student);
    catalog
        .debtor(&student, as_of)
        .ok_or(AppError::UnknownStudent(student))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value)?;
    writeln!(handle)?;
    Ok(())
}

/// Accepts a full timestamp or a bare date, which is read as midnight.
pub(crate) fn parse_instant(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    if let Ok(instant) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(instant);
    }
    if let Ok(instant) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(instant);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(chrono::NaiveTime::MIN))
        .map_err(|err| {
            format!("failed to parse '{raw}' as YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS ({err})")
        })
}
