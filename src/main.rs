use colored::*;
use std::process;

#[tokio::main]
async fn main() {
    let cli_args = shiperate::cli::parse_args();

    shiperate::cli::init_tracing(cli_args.verbose, false);

    // Execute the command
    if let Err(e) = shiperate::cli::run(cli_args).await {
        // Print user-facing error message clearly
        eprintln!("{}: {}", "Error".red().bold(), e);
        process::exit(e.exit_code());
    }
}
