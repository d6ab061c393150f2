use crate::admin::{
    run_dispatch, run_import, run_migrate, run_reconcile, run_report, DispatchArgs, ImportArgs,
    ReportArgs,
};
use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use his_core::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Benefit Case Service",
    about = "Run the benefit case lifecycle service and its operator tasks",
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
    /// Create or upgrade the case database schema and exit
    Migrate,
    /// Complete correspondence triggers missing after an interrupted run
    Reconcile,
    /// Hand pending notices to the configured dispatcher
    Dispatch(DispatchArgs),
    /// Print a case, demographics or outbox report
    Report(ReportArgs),
    /// Register citizen applications from a CSV export
    Import(ImportArgs),
    /// Walk through eligibility runs for each program against a scratch database
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
        Command::Migrate => run_migrate(),
        Command::Reconcile => run_reconcile(),
        Command::Dispatch(args) => run_dispatch(args),
        Command::Report(args) => run_report(args),
        Command::Import(args) => run_import(args),
        Command::Demo(args) => run_demo(args),
    }
}
