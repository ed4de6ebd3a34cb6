//! Records a live execution.
//!
//! The interception mechanism itself lives inside the monitored process and
//! is environment-specific; this module only drives the boundary. The target
//! is spawned with `RUNSEAL_EVENTS` pointing at a spool file, and whatever
//! interception layer runs inside it appends one JSON object per line
//! (`{"kind": "...", "<field>": <scalar>, ...}`). The recorder brackets the
//! spooled events with `begin` and `end` and finalizes the ledger.

use color_eyre::Result;
use color_eyre::eyre::{Context, eyre};
use runseal_core::{EventKind, FieldValue, Fields, fields};
use runseal_ledger::{EventLedger, LedgerHandle, Manifest};
use std::fs;
use std::process::Command;

/// Environment variable naming the event spool file
pub const EVENTS_ENV: &str = "RUNSEAL_EVENTS";
/// Environment variable carrying the randomness seed
pub const SEED_ENV: &str = "RUNSEAL_SEED";
/// Environment variable carrying the network policy ("0" or "1")
pub const ALLOW_NET_ENV: &str = "RUNSEAL_ALLOW_NET";

/// What to execute and under which policy
#[derive(Debug, Clone)]
pub struct RunSpec {
    /// Command to execute
    pub target: String,
    /// Arguments passed to the target
    pub args: Vec<String>,
    /// Seed handed to the target's randomness source
    pub seed: Option<u64>,
    /// Whether outbound network access is permitted
    pub allow_net: bool,
}

/// Execute the target once and return the finalized manifest
pub fn record(spec: &RunSpec) -> Result<Manifest> {
    let spool = tempfile::NamedTempFile::new().context("create event spool")?;
    let handle = LedgerHandle::new(EventLedger::new(spec.seed, spec.allow_net));
    handle.append_event(
        EventKind::Begin,
        fields([
            ("target", FieldValue::from(spec.target.as_str())),
            ("args", FieldValue::from(spec.args.join(" "))),
        ]),
    )?;

    let mut command = Command::new(&spec.target);
    command
        .args(&spec.args)
        .env(EVENTS_ENV, spool.path())
        .env(ALLOW_NET_ENV, if spec.allow_net { "1" } else { "0" });
    if let Some(seed) = spec.seed {
        command.env(SEED_ENV, seed.to_string());
    }

    tracing::info!(target = %spec.target, "spawning monitored process");
    let status = command
        .status()
        .with_context(|| format!("failed to execute {}", spec.target))?;

    let spooled = fs::read_to_string(spool.path()).context("read event spool")?;
    for (line_no, line) in spooled.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (kind, event_fields) = parse_spool_line(line)
            .with_context(|| format!("event spool line {}", line_no + 1))?;
        handle.append(&kind, event_fields)?;
    }

    let exit_code = i64::from(status.code().unwrap_or(-1));
    tracing::info!(exit_code, "monitored process finished");
    handle.append_event(
        EventKind::End,
        fields([("exit_code", FieldValue::Int(exit_code))]),
    )?;
    Ok(handle.finalize()?)
}

/// Parse one spool line into a wire kind and its fields
fn parse_spool_line(line: &str) -> Result<(String, Fields)> {
    let value: serde_json::Value = serde_json::from_str(line).context("not valid JSON")?;
    let object = value
        .as_object()
        .ok_or_else(|| eyre!("expected a JSON object"))?;

    let mut kind = None;
    let mut event_fields = Fields::new();
    for (name, value) in object {
        if name == "kind" {
            kind = Some(
                value
                    .as_str()
                    .ok_or_else(|| eyre!("\"kind\" must be a string"))?
                    .to_string(),
            );
            continue;
        }
        let scalar = serde_json::from_value::<FieldValue>(value.clone())
            .map_err(|_| eyre!("field \"{name}\" must be a string, integer, or boolean"))?;
        event_fields.insert(name.clone(), scalar);
    }

    let kind = kind.ok_or_else(|| eyre!("missing \"kind\""))?;
    Ok((kind, event_fields))
}
