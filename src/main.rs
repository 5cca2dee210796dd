use anyhow::Result;
use blitscale::cli::{self, Cli, Command};
use blitscale::{config, logging};
use clap::Parser;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging (early)
    if logging::init(cli.log_level()).is_err() {
        eprintln!("blitscale: another logger is already installed");
    }

    // Environment settings become the defaults for every subcommand
    let base = config::install_from_env()?;

    match &cli.command {
        Command::Bench(args) => {
            let report = cli::run_bench(args, base)?;
            println!("{}", report);
        }
        Command::Verify(args) => {
            let report = cli::run_verify(args);
            for line in &report.mismatches {
                println!("MISMATCH {}", line);
            }
            if !report.passed() {
                anyhow::bail!(
                    "{} of {} calls differed from the portable scaler",
                    report.mismatches.len(),
                    report.cases
                );
            }
            println!("verify: {} calls, all identical", report.cases);
        }
    }

    Ok(())
}
