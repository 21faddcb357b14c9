use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use bankproof::engine::{parse, ParseOptions};
use bankproof::models::{Token, VecTokenSource};
use bankproof::profile::ProfileRegistry;

#[derive(Parser)]
#[command(name = "bankproof")]
#[command(about = "Bank statement parsing and reconciliation engine")]
struct Cli {
    /// Directory of bank profile descriptors
    #[arg(short, long, default_value = "profiles")]
    profiles: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse an extracted token dump into a reconciled ledger
    Extract {
        /// JSON token dump produced by an upstream extractor
        input: PathBuf,

        /// Bank profile to parse with
        #[arg(short, long)]
        bank: String,

        /// Write the result as JSON to this path instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Fail when any period cannot be reconciled
        #[arg(long)]
        strict: bool,
    },
    /// List the banks available in the profile directory
    Banks,
}

// Exit codes: 0 ok, 2 unsupported bank, 3 parse failure,
// 4 reconciliation failure in strict mode.
const EXIT_UNSUPPORTED_BANK: u8 = 2;
const EXIT_PARSE_FAILURE: u8 = 3;
const EXIT_RECONCILIATION_FAILURE: u8 = 4;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_PARSE_FAILURE)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let registry = ProfileRegistry::load_dir(&cli.profiles)?;

    match cli.command {
        Command::Banks => {
            for name in registry.names() {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Extract {
            input,
            bank,
            out,
            strict,
        } => {
            let Some(profile) = registry.get(&bank) else {
                eprintln!("unsupported bank: {bank}");
                return Ok(ExitCode::from(EXIT_UNSUPPORTED_BANK));
            };

            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read token dump: {}", input.display()))?;
            let tokens: Vec<Token> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse token dump: {}", input.display()))?;

            let mut options = ParseOptions::new();
            if strict {
                options = options.with_strict();
            }

            let mut source = VecTokenSource::new(tokens);
            let result = match parse(&mut source, profile, &options) {
                Ok(result) => result,
                Err(err) => {
                    eprintln!("parse failed: {err}");
                    return Ok(ExitCode::from(EXIT_PARSE_FAILURE));
                }
            };

            for warning in &result.warnings {
                tracing::warn!(kind = ?warning.kind, "{}", warning.message);
            }

            let json = serde_json::to_string_pretty(&result)?;
            match out {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write result: {}", path.display()))?,
                None => println!("{json}"),
            }

            if !result.success {
                return Ok(ExitCode::from(EXIT_RECONCILIATION_FAILURE));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
