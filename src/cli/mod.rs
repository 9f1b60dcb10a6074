//! Command-line interface for gsedit
//!
//! Thin driver around the format engine: detect a file's format, check it for
//! blocking problems, canonicalize it, or bulk-validate privileges entries
//! against the Steam directory.

use crate::codecs::{cfg, detect, privileges, FormatKind};
use crate::services::{IdentitySession, SteamDirectory};
use crate::validation;
use crate::{GseditError, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// gsedit command-line interface
#[derive(Parser)]
#[command(name = "gsedit")]
#[command(about = "Editor engine for game-server privileges XML and dedicated.cfg files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct GseditCli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable JSON output for machine-readable results
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Guess which format a file is
    Detect {
        /// File to classify
        file: PathBuf,
    },

    /// Check a file for blocking problems (duplicate cfg keys)
    Check {
        /// File to check
        file: PathBuf,

        /// Force the format instead of detecting it (cfg or privileges)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Parse a file and print its canonical serialization
    Fmt {
        /// File to canonicalize
        file: PathBuf,

        /// Force the format instead of detecting it (cfg or privileges)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Bulk-validate every privileges entry against the Steam directory
    Validate {
        /// Privileges XML file
        file: PathBuf,
    },
}

/// Execute a parsed CLI invocation
pub async fn run(cli: GseditCli) -> Result<()> {
    match cli.command {
        Commands::Detect { file } => run_detect(&file, cli.json),
        Commands::Check { file, format } => run_check(&file, format.as_deref(), cli.json),
        Commands::Fmt { file, format } => run_fmt(&file, format.as_deref()),
        Commands::Validate { file } => run_validate(&file, cli.json).await,
    }
}

fn run_detect(file: &PathBuf, json: bool) -> Result<()> {
    let text = std::fs::read_to_string(file).map_err(GseditError::IoError)?;
    let kind = detect(&text);
    if json {
        println!("{}", serde_json::json!({ "format": kind }));
    } else {
        println!("{}", kind);
    }
    if kind == FormatKind::Unknown {
        return Err(GseditError::AmbiguousFormat(
            "cannot determine format; pass --format to a format-taking command".to_string(),
        )
        .into());
    }
    Ok(())
}

fn run_check(file: &PathBuf, forced: Option<&str>, json: bool) -> Result<()> {
    let text = std::fs::read_to_string(file).map_err(GseditError::IoError)?;
    match resolve_format(&text, forced)? {
        FormatKind::Cfg => {
            let mut items = cfg::parse(&text);
            let report = validation::validate(&mut items);
            if json {
                println!("{}", serde_json::to_string(&report)?);
            } else if report.has_duplicates {
                println!("duplicate keys: {}", report.keys.join(", "));
            } else {
                println!("ok: {} items, no duplicate keys", items.len());
            }
            if report.has_duplicates {
                // Blocking by design; duplicates must be resolved before export
                return Err(GseditError::ValidationError(format!(
                    "{} duplicate key(s)",
                    report.keys.len()
                ))
                .into());
            }
            Ok(())
        }
        FormatKind::Privileges => {
            let groups = privileges::parse(&text);
            let entries: usize = groups.iter().map(|group| group.entries.len()).sum();
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "groups": groups.len(), "entries": entries })
                );
            } else {
                println!("ok: {} group(s), {} entr(ies)", groups.len(), entries);
            }
            Ok(())
        }
        FormatKind::Unknown => unreachable!("resolve_format never returns Unknown"),
    }
}

fn run_fmt(file: &PathBuf, forced: Option<&str>) -> Result<()> {
    let text = std::fs::read_to_string(file).map_err(GseditError::IoError)?;
    match resolve_format(&text, forced)? {
        FormatKind::Cfg => {
            let items = cfg::parse(&text);
            println!("{}", cfg::serialize(&items));
        }
        FormatKind::Privileges => {
            let groups = privileges::parse(&text);
            print!("{}", privileges::serialize(&groups));
        }
        FormatKind::Unknown => unreachable!("resolve_format never returns Unknown"),
    }
    Ok(())
}

async fn run_validate(file: &PathBuf, json: bool) -> Result<()> {
    let text = std::fs::read_to_string(file).map_err(GseditError::IoError)?;
    let directory = Arc::new(SteamDirectory::from_env()?);
    let session = IdentitySession::with_defaults(directory);
    session.load_privileges(&text).await;
    session.validate_all().await;
    session.settle().await;

    let groups = session.groups().await;
    if json {
        println!("{}", serde_json::to_string(&groups)?);
    } else {
        for group in &groups {
            println!("[{}]", group.comment);
            for entry in &group.entries {
                let status = match entry.valid {
                    Some(true) => "valid",
                    Some(false) => "INVALID",
                    None => "skipped",
                };
                println!("  {:17}  {:8}  {}", entry.id, status, entry.name);
            }
        }
    }

    if session.any_invalid().await {
        return Err(GseditError::ValidationError(
            "one or more entries failed validation".to_string(),
        )
        .into());
    }
    Ok(())
}

/// Apply the `--format` override on top of detection. Detection disagreeing
/// with the override is reported, then the override wins; with no override,
/// an undetectable format is surfaced as an error, never silently guessed.
fn resolve_format(text: &str, forced: Option<&str>) -> Result<FormatKind> {
    let detected = detect(text);
    match forced {
        Some(forced) => {
            let kind = FormatKind::from_str(forced)
                .map_err(GseditError::ConfigurationError)?;
            if detected != FormatKind::Unknown && detected != kind {
                warn!(%detected, forced = %kind, "detected format disagrees with --format");
            }
            Ok(kind)
        }
        None => match detected {
            FormatKind::Unknown => Err(GseditError::AmbiguousFormat(
                "cannot determine format; pass --format".to_string(),
            )
            .into()),
            kind => {
                info!(%kind, "format detected");
                Ok(kind)
            }
        },
    }
}
