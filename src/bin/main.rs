#![forbid(unsafe_code)]

use colored::*;

fn main() {
    println!("{}", "GenAuth CLI".bright_cyan().bold());
    println!("{}", "-----------".bright_cyan());
    println!();
    println!(
        "{}",
        "This is the main entry point, but most functionality is in separate binaries.".yellow()
    );
    println!(
        "{}",
        "Use 'cargo run --bin <binary_name>' to run a specific command.".yellow()
    );
    println!();
    println!("{}", "Available binaries:".bright_green().underline());
    println!("  - {}  submit and mine one artifact", "genauth-mine".bright_white());
    println!("  - {}  show the admitted chain", "genauth-history".bright_white());
    println!("  - {}  check hash linkage and proof-of-work", "genauth-validate".bright_white());
    println!("  - {}  serve the HTTP API", "genauth-server".bright_white());
    println!();
    println!("{}", "Example:".bright_green().underline());
    println!(
        "{}",
        "  cargo run --bin genauth-mine -- --agent Ada --content-hash abc123 --fingerprint fp1 \\\n      --purpose test --signature sig1 --tag demo".italic()
    );
}
