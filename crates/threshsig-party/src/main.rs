//! Threshold RSA party CLI
//!
//! Command-line interface for the threshold RSA workflow over a data
//! directory:
//! - Dealing a group key and key shares
//! - Partial signing with one key share
//! - Combining partial signatures and verifying the result

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use threshsig_core::{Dealer, DealerConfig, GroupKey, KeyShare, SigShare};
use tracing::{info, Level};

/// Threshold RSA party tool
#[derive(Parser)]
#[command(name = "threshsig-party")]
#[command(about = "Threshold RSA dealer, signer and combiner")]
#[command(version)]
struct Cli {
    /// Data directory for the group key, shares and partial signatures
    #[arg(short, long, env = "DEST", default_value = "./data")]
    dest: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a group key and l key shares
    Deal {
        /// Threshold (k-of-l)
        #[arg(short, long)]
        k: usize,

        /// Number of shares
        #[arg(short, long)]
        l: usize,

        /// Modulus size in bits
        #[arg(long, env = "KEY_SIZE", default_value_t = threshsig_core::DEFAULT_KEY_SIZE)]
        key_size: usize,
    },

    /// Partially sign a message with one key share
    Sign {
        /// Share index (1-based)
        #[arg(short, long)]
        index: usize,

        /// Message to sign
        #[arg(short, long)]
        message: String,
    },

    /// Combine partial signatures into a full signature
    Combine {
        /// Message that was signed
        #[arg(short, long)]
        message: String,

        /// Share indices to combine (comma-separated)
        #[arg(short, long)]
        indices: String,

        /// Threshold (k-of-l)
        #[arg(short, long)]
        k: usize,

        /// Number of shares
        #[arg(short, long)]
        l: usize,
    },

    /// Verify a signature against the group key
    Verify {
        /// Message that was signed
        #[arg(short, long)]
        message: String,

        /// Signature (hex encoded)
        #[arg(short, long)]
        signature: String,
    },

    /// Show key share info
    Info {
        /// Share index (1-based)
        #[arg(short, long)]
        index: usize,
    },
}

/// Partial signature as stored on disk
#[derive(Serialize, Deserialize)]
struct SigShareFile {
    index: usize,
    value: String,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    // Ensure data directory exists
    std::fs::create_dir_all(&cli.dest)?;

    match cli.command {
        Commands::Deal { k, l, key_size } => run_deal(&cli.dest, k, l, key_size),
        Commands::Sign { index, ref message } => run_sign(&cli.dest, index, message),
        Commands::Combine {
            ref message,
            ref indices,
            k,
            l,
        } => run_combine(&cli.dest, message, indices, k, l),
        Commands::Verify {
            ref message,
            ref signature,
        } => run_verify(&cli.dest, message, signature),
        Commands::Info { index } => show_info(&cli.dest, index),
    }
}

fn run_deal(dest: &Path, k: usize, l: usize, key_size: usize) -> Result<()> {
    info!(k, l, key_size, "Starting dealing");

    let mut dealer = Dealer::with_config(DealerConfig::with_key_size(key_size))?;
    let group_key = dealer.generate_keys(k, l)?.clone();
    let shares = dealer.take_shares();
    dealer.destroy();

    let group_path = dest.join("group.json");
    std::fs::write(&group_path, serde_json::to_string_pretty(&group_key)?)?;

    for share in &shares {
        let path = share_path(dest, share.index());
        std::fs::write(&path, share.wrap()?)?;
    }

    info!(
        group = %group_key.fingerprint(),
        path = ?group_path,
        "Dealing completed, shares saved"
    );

    println!("Group key: {}", group_key.fingerprint());
    println!("Modulus: {}", group_key.modulus().to_str_radix(16));

    Ok(())
}

fn run_sign(dest: &Path, index: usize, message: &str) -> Result<()> {
    let key_share = load_key_share(dest, index)?;
    let sig_share = key_share.sign(message.as_bytes())?;

    let file = SigShareFile {
        index: sig_share.index(),
        value: sig_share.value_hex(),
    };
    let path = dest.join(format!("sigshare.{}.json", index));
    std::fs::write(&path, serde_json::to_string_pretty(&file)?)?;

    info!(index, path = ?path, "Partial signature saved");
    println!("Partial signature {}: {}", index, file.value);

    Ok(())
}

fn run_combine(dest: &Path, message: &str, indices_str: &str, k: usize, l: usize) -> Result<()> {
    let group_key = load_group_key(dest)?;

    // Parse indices
    let indices: Vec<usize> = indices_str
        .split(',')
        .map(|s| s.trim().parse())
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut sig_shares = Vec::with_capacity(indices.len());
    for index in &indices {
        let path = dest.join(format!("sigshare.{}.json", index));
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Reading {}", path.display()))?;
        let file: SigShareFile = serde_json::from_str(&json)?;
        sig_shares.push(SigShare::from_hex(file.index, &file.value)?);
    }

    info!(participants = ?indices, k, l, "Combining partial signatures");

    let signature = SigShare::combine(message.as_bytes(), &sig_shares, k, l, &group_key)?;
    let verified = group_key.verify(message.as_bytes(), &signature).is_ok();

    info!(verified, "Signature combined");

    println!("Signature: {}", hex::encode(&signature));
    println!("Verified: {}", verified);

    Ok(())
}

fn run_verify(dest: &Path, message: &str, signature: &str) -> Result<()> {
    let group_key = load_group_key(dest)?;
    let signature = hex::decode(signature)?;

    match group_key.verify(message.as_bytes(), &signature) {
        Ok(()) => {
            println!("Signature valid");
            Ok(())
        }
        Err(e) => bail!("Signature rejected: {}", e),
    }
}

fn show_info(dest: &Path, index: usize) -> Result<()> {
    let key_share = load_key_share(dest, index)?;
    let group_key = key_share.group_key();

    println!("Key Share Info:");
    println!("  Index: {}", key_share.index());
    println!("  Shares: {}", key_share.share_count());
    println!("  Modulus bits: {}", group_key.bits());
    println!("  Group key: {}", group_key.fingerprint());
    println!(
        "  Verification value matches: {}",
        key_share.check_verification_value()
    );

    Ok(())
}

fn share_path(dest: &Path, index: usize) -> PathBuf {
    dest.join(format!("share.{}.bin", index))
}

fn load_key_share(dest: &Path, index: usize) -> Result<KeyShare> {
    let path = share_path(dest, index);
    let bytes =
        std::fs::read(&path).with_context(|| format!("Reading {}", path.display()))?;
    Ok(KeyShare::unwrap(&bytes)?)
}

fn load_group_key(dest: &Path) -> Result<GroupKey> {
    let json = std::fs::read_to_string(dest.join("group.json"))?;
    let group_key: GroupKey = serde_json::from_str(&json)?;
    Ok(group_key)
}
