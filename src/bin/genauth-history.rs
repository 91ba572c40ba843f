#![forbid(unsafe_code)]
//! Show the admitted chain as a table

use clap::Parser;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use genauth::cli::{init_tracing, load_ledger_from_config, short_hash};

#[derive(Parser, Debug)]
#[command(name = "genauth-history", about = "List blocks on the GenAuth ledger")]
struct Args {
    /// Only show blocks recorded by this agent
    #[arg(long)]
    agent: Option<String>,

    /// Show full hashes instead of abbreviations
    #[arg(long)]
    full: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let (_config, ledger) = load_ledger_from_config()?;

    println!(
        "{}",
        "┌─────────────────────────────────────────────────────────────┐".bright_cyan()
    );
    println!(
        "{}",
        "│              🧾 GenAuth Chain – Authorship Records          │"
            .bright_cyan()
            .bold()
    );
    println!(
        "{}",
        "└─────────────────────────────────────────────────────────────┘".bright_cyan()
    );
    println!();

    let render = |hash: &str| {
        if args.full {
            hash.to_string()
        } else {
            short_hash(hash)
        }
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Agent").add_attribute(Attribute::Bold),
            Cell::new("Artifact ID").add_attribute(Attribute::Bold),
            Cell::new("Content Hash").add_attribute(Attribute::Bold),
            Cell::new("Fingerprint").add_attribute(Attribute::Bold),
            Cell::new("Purpose").add_attribute(Attribute::Bold),
            Cell::new("Signature").add_attribute(Attribute::Bold),
            Cell::new("Tags").add_attribute(Attribute::Bold),
            Cell::new("Hash").add_attribute(Attribute::Bold),
            Cell::new("Previous").add_attribute(Attribute::Bold),
        ]);

    let mut shown = 0;
    for block in ledger.get_chain() {
        if let Some(agent) = &args.agent {
            if &block.agent_name != agent {
                continue;
            }
        }
        shown += 1;

        let color = if block.index == 0 {
            TableColor::Yellow
        } else {
            TableColor::Green
        };
        table.add_row(vec![
            Cell::new(block.index).fg(color),
            Cell::new(&block.agent_name),
            Cell::new(&block.artifact_id),
            Cell::new(render(&block.content_hash)),
            Cell::new(&block.fingerprint),
            Cell::new(&block.purpose),
            Cell::new(&block.signature),
            Cell::new(block.tags.join(", ")),
            Cell::new(render(&block.hash)).fg(color),
            Cell::new(render(&block.previous_hash)),
        ]);
    }

    println!("{table}");
    println!();
    println!(
        "{}",
        format!(
            "📦 {} of {} blocks shown, difficulty {}",
            shown,
            ledger.get_chain().len(),
            ledger.difficulty()
        )
        .cyan()
    );

    Ok(())
}
