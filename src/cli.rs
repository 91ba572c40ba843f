//! Helpers shared by the GenAuth binaries

use crate::blockchain::Ledger;
use crate::config::{load_config, Config, LedgerConfig};
use crate::error::ChainError;
use crate::persistence::JsonFilePersistence;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` wins; otherwise `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Open the on-disk ledger described by `config`, validating it first when
/// `verify_on_load` is set.
pub fn open_ledger(config: &LedgerConfig) -> Result<Ledger, ChainError> {
    let persistence = Box::new(JsonFilePersistence::new(&config.chain_file));
    if config.verify_on_load {
        Ledger::open_verified(persistence, config.difficulty)
    } else {
        Ledger::open(persistence, config.difficulty)
    }
}

pub fn load_ledger_from_config() -> Result<(Config, Ledger), ChainError> {
    let config = load_config()?;
    let ledger = open_ledger(&config.ledger)?;
    Ok((config, ledger))
}

/// `0000ab12cd...9f3e` style abbreviation for table output.
/// Counts chars, not bytes, since `content_hash` is free text.
pub fn short_hash(hash: &str) -> String {
    let len = hash.chars().count();
    if len > 20 {
        let head: String = hash.chars().take(10).collect();
        let tail: String = hash.chars().skip(len - 6).collect();
        format!("{}...{}", head, tail)
    } else {
        hash.to_string()
    }
}

/// Lowercase hex SHA-256 of a file's bytes.
pub fn sha256_file(path: &Path) -> Result<String, ChainError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
