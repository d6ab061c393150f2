use crate::infra::{open_service, Service};
use clap::{Args, ValueEnum};
use his_core::config::AppConfig;
use his_core::error::AppError;
use his_core::telemetry;
use his_core::workflows::benefits::{
    CaseStatusFilter, CaseStatusRow, DecisionStatus, IntakeImporter, PendingTriggerRow,
    ReportKind, StateDemographicsRow,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct DispatchArgs {
    /// Maximum number of notices to hand off in this pass
    #[arg(long)]
    pub(crate) limit: Option<usize>,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// case-status, state-demographics or pending-triggers
    pub(crate) kind: ReportKind,
    /// Output as an aligned table or CSV
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub(crate) format: OutputFormat,
    /// Only include cases whose latest status matches (case-status)
    #[arg(long)]
    pub(crate) status: Option<DecisionStatus>,
    /// Only include applicants from this state (case-status)
    #[arg(long)]
    pub(crate) state: Option<String>,
    #[arg(long)]
    pub(crate) limit: Option<usize>,
    #[arg(long, default_value_t = 0)]
    pub(crate) offset: usize,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// CSV file with full_name, email, phone, national_id, gender, state, date_of_birth
    pub(crate) path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Csv,
}

fn bootstrap() -> Result<Arc<Service>, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    open_service(&config)
}

pub(crate) fn run_migrate() -> Result<(), AppError> {
    let service = bootstrap()?;
    let version = service.database().schema_version()?;
    info!(version, path = %service.database().path().display(), "schema is current");
    println!("Schema version {version}");
    Ok(())
}

pub(crate) fn run_reconcile() -> Result<(), AppError> {
    let service = bootstrap()?;
    let report = service.reconcile()?;
    println!(
        "Checked {} decisions without a trigger, completed {}",
        report.decisions_checked,
        report.triggers_completed.len()
    );
    for id in &report.triggers_completed {
        println!("  - trigger {id}");
    }
    Ok(())
}

pub(crate) fn run_dispatch(args: DispatchArgs) -> Result<(), AppError> {
    let service = bootstrap()?;
    let summary = service.dispatch_pending(args.limit)?;
    println!(
        "Dispatched {} notices, {} failed",
        summary.sent.len(),
        summary.failed.len()
    );
    for failure in &summary.failed {
        println!("  - trigger {}: {}", failure.trigger_id, failure.error);
    }
    Ok(())
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let service = bootstrap()?;
    let summary = IntakeImporter::new(service.as_ref()).import_file(&args.path)?;
    println!(
        "Imported {} applications from {}",
        summary.imported.len(),
        args.path.display()
    );
    if !summary.rejected.is_empty() {
        println!("Rejected rows:");
        for row in &summary.rejected {
            println!("  - line {} ({}): {}", row.line, row.national_id, row.reason);
        }
    }
    Ok(())
}

/// Reports go to stdout untouched, so no subscriber is installed here.
pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = open_service(&config)?;
    let filter = CaseStatusFilter {
        status: args.status,
        state: args.state,
        limit: args.limit,
        offset: args.offset,
    };

    if args.format == OutputFormat::Csv {
        print!("{}", service.reports().export_csv(args.kind, &filter)?);
        return Ok(());
    }

    let table = match args.kind {
        ReportKind::CaseStatus => case_status_table(&service.case_status_report(&filter)?),
        ReportKind::StateDemographics => {
            demographics_table(&service.state_demographics_report()?)
        }
        ReportKind::PendingTriggers => {
            pending_trigger_table(&service.pending_trigger_report(filter.limit)?)
        }
    };
    println!("{table}");
    Ok(())
}

pub(crate) fn case_status_table(rows: &[CaseStatusRow]) -> String {
    let mut lines = vec![format!(
        "{:>6}  {:<24} {:<5} {:<24} {:<17} {:>8}  {}",
        "CASE", "APPLICANT", "STATE", "PLAN", "STATUS", "BENEFIT", "DECIDED"
    )];
    for row in rows {
        let decided = row
            .decided_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!(
            "{:>6}  {:<24} {:<5} {:<24} {:<17} {:>8}  {}",
            row.case_number.0,
            row.applicant,
            row.state,
            row.plan,
            row.status.label(),
            row.benefit_amount,
            decided
        ));
    }
    lines.join("\n")
}

pub(crate) fn demographics_table(rows: &[StateDemographicsRow]) -> String {
    let mut lines = vec![format!(
        "{:<5} {:>7} {:>7} {:>7} {:>7}",
        "STATE", "TOTAL", "MALE", "FEMALE", "OTHER"
    )];
    for row in rows {
        lines.push(format!(
            "{:<5} {:>7} {:>7} {:>7} {:>7}",
            row.state, row.total, row.male, row.female, row.other
        ));
    }
    lines.join("\n")
}

pub(crate) fn pending_trigger_table(rows: &[PendingTriggerRow]) -> String {
    let mut lines = vec![format!(
        "{:>7}  {:>6}  {:<24} {:<16}  {}",
        "TRIGGER", "CASE", "APPLICANT", "CREATED", "NOTICE"
    )];
    for row in rows {
        lines.push(format!(
            "{:>7}  {:>6}  {:<24} {:<16}  {}",
            row.trigger_id.0,
            row.case_number.0,
            row.applicant.as_deref().unwrap_or("(missing)"),
            row.created_at.format("%Y-%m-%d %H:%M").to_string(),
            row.notice_preview
        ));
    }
    lines.join("\n")
}
