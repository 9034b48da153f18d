use crate::commands::{
    run_dashboard, run_review, run_stage, run_validate, DashboardArgs, ReviewArgs, StageArgs,
    ValidateArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use enrollment::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Learner Enrollment",
    about = "Serve the learner enrollment API or check saved applications from the command line",
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
    /// Validate a saved form snapshot and list the fields that need attention
    Validate(ValidateArgs),
    /// Print the read-only review of a saved form snapshot
    Review(ReviewArgs),
    /// Check a document against a slot's size and type rules and encode it for the session
    Stage(StageArgs),
    /// Show the dashboard summary of a submitted application record
    Dashboard(DashboardArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Serve locations from an offline registry CSV instead of the PSGC API
    #[arg(long)]
    pub(crate) registry: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Validate(args) => run_validate(args),
        Command::Review(args) => run_review(args).await,
        Command::Stage(args) => run_stage(args),
        Command::Dashboard(args) => run_dashboard(args),
    }
}
