use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use editseq_codec::{decode, encode_verified, pad, strip_special_tokens};
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::collections::HashSet;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "editseq-codec")]
#[command(about = "Invertible token-level edit-sequence codec", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a broken/repaired pair as a verified edit script
    Encode {
        /// The broken source string
        source: String,

        /// The repaired target string
        target: String,

        /// Show a token diff of the padded pair
        #[arg(short, long)]
        diff: bool,
    },

    /// Apply an edit script to a source string
    Apply {
        /// The edit script
        script: String,

        /// The broken source string
        source: String,
    },

    /// Pad a string so every punctuation token is whitespace-delimited
    Pad {
        /// The code to pad
        code: String,
    },

    /// Strip foreign special tokens from a model-emitted script
    Strip {
        /// The script to clean
        script: String,

        /// A special token to remove (repeatable); edit tags are never removed
        #[arg(short, long = "token")]
        tokens: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            source,
            target,
            diff,
        } => cmd_encode(&source, &target, diff, cli.json),

        Commands::Apply { script, source } => cmd_apply(&script, &source, cli.json),

        Commands::Pad { code } => cmd_pad(&code, cli.json),

        Commands::Strip { script, tokens } => cmd_strip(&script, tokens, cli.json),
    }
}

#[derive(Serialize)]
struct EncodeReport<'a> {
    script: &'a str,
    used_fallback: bool,
    source_padded: &'a str,
    target_padded: &'a str,
}

fn cmd_encode(source: &str, target: &str, show_diff: bool, json: bool) -> Result<()> {
    let outcome = encode_verified(source, target);
    let source_padded = pad(source);
    let target_padded = pad(target);

    if json {
        let report = EncodeReport {
            script: &outcome.script,
            used_fallback: outcome.used_fallback,
            source_padded: &source_padded,
            target_padded: &target_padded,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if outcome.used_fallback {
        eprintln!(
            "{}",
            "Warning: no unique edit decomposition, whole-string fallback used".yellow()
        );
    }
    println!("{}", outcome.script);

    if show_diff {
        println!();
        let diff = TextDiff::from_words(&source_padded, &target_padded);
        for change in diff.iter_all_changes() {
            let piece = match change.tag() {
                ChangeTag::Delete => format!("{}", change).red(),
                ChangeTag::Insert => format!("{}", change).green(),
                ChangeTag::Equal => format!("{}", change).normal(),
            };
            print!("{}", piece);
        }
        println!();
    }

    Ok(())
}

#[derive(Serialize)]
struct ApplyReport<'a> {
    applied: Option<&'a str>,
}

fn cmd_apply(script: &str, source: &str, json: bool) -> Result<()> {
    let applied = decode(script, source);

    if json {
        let report = ApplyReport {
            applied: applied.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match applied {
        Some(applied) => {
            println!("{}", applied);
            Ok(())
        }
        None => {
            eprintln!("{}", "Edit script could not be applied".red());
            std::process::exit(1);
        }
    }
}

fn cmd_pad(code: &str, json: bool) -> Result<()> {
    let padded = pad(code);
    if json {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "padded": padded }))?);
    } else {
        println!("{}", padded);
    }
    Ok(())
}

fn cmd_strip(script: &str, tokens: Vec<String>, json: bool) -> Result<()> {
    let known: HashSet<String> = tokens.into_iter().collect();
    let stripped = strip_special_tokens(script, &known);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "stripped": stripped }))?
        );
    } else {
        println!("{}", stripped);
    }
    Ok(())
}
