use colored::*;
use std::process;

#[tokio::main]
async fn main() {
    let cli_args = shiperate::cli::parse_deploy_args();

    shiperate::cli::init_tracing(cli_args.verbose, !cli_args.no_progress);

    if let Err(e) = cli_args.run().await {
        eprintln!("{}: {}", "Error".red().bold(), e);
        process::exit(e.exit_code());
    }
}
