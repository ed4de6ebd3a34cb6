//! RUNSEAL CLI
//!
//! Records monitored runs, verifies stored manifests, and compares runs.
//! Exit codes: 0 match/valid, 1 divergence/invalid, 2 malformed input.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod recorder;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use console::style;
use recorder::RunSpec;
use runseal_core::{EventKind, FieldValue, Fields};
use runseal_ledger::{Manifest, ManifestCodec, VerificationResult, Verifier};
use runseal_replay::{DiffResult, Divergence, ReplayComparator};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const EXIT_DIVERGED: u8 = 1;
const EXIT_MALFORMED: u8 = 2;

#[derive(Parser)]
#[command(name = "runseal")]
#[command(about = "Tamper-evident recording and comparison of program runs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a run and write its manifest
    Run {
        /// Command to execute and monitor
        target: String,
        /// Arguments passed to the target (single string, whitespace-split)
        #[arg(long)]
        args: Option<String>,
        /// Seed handed to the target's randomness source
        #[arg(long, default_value_t = 1337)]
        seed: u64,
        /// Permit outbound network access
        #[arg(long)]
        allow_net: bool,
        /// Manifest output path
        #[arg(long, default_value = "manifest.json")]
        out: PathBuf,
    },
    /// Re-execute a target and compare against a stored manifest
    Verify {
        /// Command to execute and monitor
        target: String,
        /// Stored reference manifest
        manifest: PathBuf,
        /// Override the arguments recorded in the reference manifest
        #[arg(long)]
        args: Option<String>,
    },
    /// Compare two stored manifests
    Diff {
        /// First manifest
        a: PathBuf,
        /// Second manifest
        b: PathBuf,
    },
    /// Check the integrity of a stored manifest without re-running
    Check {
        /// Manifest to check
        manifest: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Run {
            target,
            args,
            seed,
            allow_net,
            out,
        } => cmd_run(target, args, seed, allow_net, &out),
        Commands::Verify {
            target,
            manifest,
            args,
        } => cmd_verify(target, &manifest, args),
        Commands::Diff { a, b } => cmd_diff(&a, &b),
        Commands::Check { manifest } => cmd_check(&manifest),
    }
}

fn cmd_run(
    target: String,
    args: Option<String>,
    seed: u64,
    allow_net: bool,
    out: &Path,
) -> Result<ExitCode> {
    let spec = RunSpec {
        target,
        args: split_args(args.as_deref()),
        seed: Some(seed),
        allow_net,
    };
    let manifest = match recorder::record(&spec) {
        Ok(manifest) => manifest,
        Err(err) => return input_error(&err),
    };

    fs::write(out, ManifestCodec::write(&manifest))?;
    println!(
        "wrote {} with root hash {}",
        out.display(),
        manifest.root_hash
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_verify(target: String, manifest_path: &Path, args: Option<String>) -> Result<ExitCode> {
    let stored = match load_manifest(manifest_path) {
        Ok(manifest) => manifest,
        Err(code) => return Ok(code),
    };
    if let VerificationResult::Invalid { first_bad_index } = Verifier::check(&stored) {
        report_corruption(manifest_path, first_bad_index, &stored);
        return Ok(ExitCode::from(EXIT_DIVERGED));
    }

    let args = args
        .as_deref()
        .map(|joined| split_args(Some(joined)))
        .unwrap_or_else(|| recorded_args(&stored));
    let spec = RunSpec {
        target,
        args,
        seed: stored.seed,
        allow_net: stored.allow_net,
    };
    let fresh = match recorder::record(&spec) {
        Ok(manifest) => manifest,
        Err(err) => return input_error(&err),
    };

    let result = ReplayComparator::compare(&stored, &fresh);
    print_diff(&result);
    if result.is_match() {
        println!("{} fresh run matches {}", ok_tag(), manifest_path.display());
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_DIVERGED))
    }
}

fn cmd_diff(path_a: &Path, path_b: &Path) -> Result<ExitCode> {
    let a = match load_manifest(path_a) {
        Ok(manifest) => manifest,
        Err(code) => return Ok(code),
    };
    let b = match load_manifest(path_b) {
        Ok(manifest) => manifest,
        Err(code) => return Ok(code),
    };

    // State corruption before content: a tampered manifest must not be
    // reported as a mere divergence.
    for (path, manifest) in [(path_a, &a), (path_b, &b)] {
        if let VerificationResult::Invalid { first_bad_index } = Verifier::check(manifest) {
            report_corruption(path, first_bad_index, manifest);
            return Ok(ExitCode::from(EXIT_DIVERGED));
        }
    }

    println!("root a: {}", a.root_hash);
    println!("root b: {}", b.root_hash);
    println!("len a: {}  len b: {}", a.len(), b.len());
    let result = ReplayComparator::compare(&a, &b);
    print_diff(&result);
    if result.is_match() {
        println!("{} {}", ok_tag(), result.summary());
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_DIVERGED))
    }
}

fn cmd_check(manifest_path: &Path) -> Result<ExitCode> {
    let manifest = match load_manifest(manifest_path) {
        Ok(manifest) => manifest,
        Err(code) => return Ok(code),
    };
    match Verifier::check(&manifest) {
        VerificationResult::Valid => {
            println!(
                "{} {} events, root hash {}",
                ok_tag(),
                manifest.len(),
                manifest.root_hash
            );
            Ok(ExitCode::SUCCESS)
        }
        VerificationResult::Invalid { first_bad_index } => {
            report_corruption(manifest_path, first_bad_index, &manifest);
            Ok(ExitCode::from(EXIT_DIVERGED))
        }
    }
}

fn load_manifest(path: &Path) -> std::result::Result<Manifest, ExitCode> {
    let bytes = fs::read(path).map_err(|err| {
        eprintln!("{} cannot read {}: {err}", err_tag(), path.display());
        ExitCode::from(EXIT_MALFORMED)
    })?;
    ManifestCodec::read(&bytes).map_err(|err| {
        eprintln!("{} {}: {err}", err_tag(), path.display());
        ExitCode::from(EXIT_MALFORMED)
    })
}

fn input_error(err: &color_eyre::Report) -> Result<ExitCode> {
    eprintln!("{} {err:#}", err_tag());
    Ok(ExitCode::from(EXIT_MALFORMED))
}

fn report_corruption(path: &Path, first_bad_index: usize, manifest: &Manifest) {
    if first_bad_index == manifest.len() {
        println!(
            "{} {}: root hash does not match the event chain",
            bad_tag(),
            path.display()
        );
    } else {
        println!(
            "{} {}: hash chain breaks at event {first_bad_index}",
            bad_tag(),
            path.display()
        );
    }
}

fn print_diff(result: &DiffResult) {
    for meta in &result.metadata {
        println!(
            "{} metadata {}: {} != {}",
            bad_tag(),
            meta.field,
            meta.a,
            meta.b
        );
    }
    match (result.divergence, result.divergence_index) {
        (Some(Divergence::Truncation), Some(index)) => {
            println!(
                "{} truncated at event {index} ({} vs {} events)",
                bad_tag(),
                result.length_a,
                result.length_b
            );
        }
        (Some(Divergence::Content), Some(index)) => {
            println!("{} first divergence at event {index}", bad_tag());
            for mismatch in &result.mismatches {
                println!(
                    "  @{}: {}[{}] != {}[{}]",
                    mismatch.index,
                    mismatch.kind_a,
                    format_fields(&mismatch.fields_a),
                    mismatch.kind_b,
                    format_fields(&mismatch.fields_b)
                );
            }
        }
        _ => {}
    }
}

fn format_fields(fields: &Fields) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Arguments recorded in the reference manifest's `begin` event
fn recorded_args(manifest: &Manifest) -> Vec<String> {
    manifest
        .events
        .first()
        .filter(|event| event.kind == EventKind::Begin)
        .and_then(|event| match event.fields.get("args") {
            Some(FieldValue::Str(joined)) => Some(split_args(Some(joined))),
            _ => None,
        })
        .unwrap_or_default()
}

fn split_args(joined: Option<&str>) -> Vec<String> {
    joined
        .map(|joined| joined.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn ok_tag() -> console::StyledObject<&'static str> {
    style("ok:").green().bold()
}

fn bad_tag() -> console::StyledObject<&'static str> {
    style("mismatch:").red().bold()
}

fn err_tag() -> console::StyledObject<&'static str> {
    style("error:").red().bold()
}

#[cfg(test)]
mod tests {
    use super::*;
    use runseal_core::fields;
    use runseal_ledger::EventLedger;

    #[test]
    fn test_split_args() {
        assert_eq!(split_args(None), Vec::<String>::new());
        assert_eq!(split_args(Some("")), Vec::<String>::new());
        assert_eq!(
            split_args(Some("foo  bar baz")),
            vec!["foo".to_string(), "bar".to_string(), "baz".to_string()]
        );
    }

    #[test]
    fn test_recorded_args_from_begin_event() {
        let mut ledger = EventLedger::new(Some(1), false);
        ledger
            .append(
                "begin",
                fields([
                    ("target", FieldValue::from("demo")),
                    ("args", FieldValue::from("alpha beta")),
                ]),
            )
            .unwrap();
        let manifest = ledger.finalize();
        assert_eq!(
            recorded_args(&manifest),
            vec!["alpha".to_string(), "beta".to_string()]
        );
    }

    #[test]
    fn test_recorded_args_empty_without_begin() {
        let manifest = EventLedger::new(None, false).finalize();
        assert!(recorded_args(&manifest).is_empty());
    }

    #[test]
    fn test_format_fields() {
        let map = fields([
            ("path", FieldValue::from("/tmp/a")),
            ("mode", FieldValue::from("wb")),
        ]);
        assert_eq!(format_fields(&map), "path=/tmp/a mode=wb");
    }
}
