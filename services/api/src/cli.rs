use crate::estimate::{run_estimate, run_report, EstimateArgs, ReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use estimpro::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "EstimPro",
    about = "Estimate a property's market value from the command line or over HTTP",
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
    /// Run one estimation and print the results
    Estimate(EstimateArgs),
    /// Run one estimation and write the downloadable report
    Report(ReportArgs),
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
        Command::Estimate(args) => run_estimate(args).await,
        Command::Report(args) => run_report(args).await,
    }
}
