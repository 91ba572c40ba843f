#![forbid(unsafe_code)]
//! Check the stored chain's linkage and proof-of-work

use colored::*;
use genauth::cli::{init_tracing, open_ledger};
use genauth::config::load_config;
use std::process::ExitCode;

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    init_tracing();
    let mut config = load_config()?;
    // Always load unverified so the report below can describe the failure.
    config.ledger.verify_on_load = false;
    let ledger = open_ledger(&config.ledger)?;

    let length = ledger.get_chain().len();
    match ledger.validate_chain() {
        Ok(()) => {
            println!(
                "{} {} blocks, difficulty {}",
                "✅ Chain is valid:".green().bold(),
                length,
                ledger.difficulty()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{} {}", "❌ Chain is invalid:".red().bold(), e);
            Ok(ExitCode::FAILURE)
        }
    }
}
