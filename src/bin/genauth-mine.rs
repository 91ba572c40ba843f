#![forbid(unsafe_code)]
//! Submit one artifact claim and mine it into the ledger

use clap::Parser;
use colored::*;
use genauth::blockchain::{Admission, ArtifactClaim};
use genauth::cli::{init_tracing, open_ledger, sha256_file, short_hash};
use genauth::config::load_config;
use genauth::miner::{hash_rate, proof_of_work};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "genauth-mine", about = "Record an authorship claim on the GenAuth ledger")]
struct Args {
    /// Name of the agent that produced the artifact
    #[arg(long)]
    agent: String,

    /// Hash of the artifact's bytes
    #[arg(long, required_unless_present = "content_file", conflicts_with = "content_file")]
    content_hash: Option<String>,

    /// Hash this file with SHA-256 instead of passing --content-hash
    #[arg(long)]
    content_file: Option<PathBuf>,

    #[arg(long)]
    fingerprint: String,

    #[arg(long)]
    purpose: String,

    /// Opaque provenance signature, stored as given
    #[arg(long)]
    signature: String,

    /// Free-form tag, may be repeated
    #[arg(long = "tag")]
    tags: Vec<String>,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let content_hash = match (&args.content_hash, &args.content_file) {
        (Some(hash), _) => hash.clone(),
        (None, Some(path)) => sha256_file(path)?,
        (None, None) => unreachable!("clap requires one of --content-hash or --content-file"),
    };

    let config = load_config()?;
    let mut ledger = open_ledger(&config.ledger)?;

    let artifact_id = ledger.submit(ArtifactClaim {
        agent_name: args.agent,
        content_hash,
        fingerprint: args.fingerprint,
        purpose: args.purpose,
        signature: args.signature,
        tags: args.tags,
    });
    println!("{} {}", "📝 Artifact submitted:".cyan(), artifact_id);

    let Some(mut block) = ledger.next_candidate() else {
        println!("{}", "No artifacts to mine".yellow());
        return Ok(ExitCode::SUCCESS);
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")?);
    spinner.set_message(format!(
        "⛏️  Mining block #{} at difficulty {}",
        block.index,
        ledger.difficulty()
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let start = Instant::now();
    let proof = proof_of_work(&mut block, ledger.difficulty());
    let elapsed = start.elapsed();
    spinner.finish_and_clear();

    let nonce = block.nonce;
    let previous = block.previous_hash.clone();
    match ledger.add_block(block, &proof)? {
        Admission::Accepted(index) => {
            println!("{}", format!("✅ Block #{} mined", index).green().bold());
            println!("   Hash:        {}", proof);
            println!("   Previous:    {}", short_hash(&previous));
            println!("   Nonce:       {}", nonce);
            println!(
                "   Mining time: {} ({:.0} H/s)",
                humantime::format_duration(Duration::from_millis(elapsed.as_millis() as u64)),
                hash_rate(nonce, elapsed)
            );
            println!("   Chain:       {} blocks", ledger.get_chain().len());
            Ok(ExitCode::SUCCESS)
        }
        Admission::Rejected(rejection) => {
            eprintln!("{} {}", "❌ Block rejected:".red().bold(), rejection);
            Ok(ExitCode::FAILURE)
        }
    }
}
