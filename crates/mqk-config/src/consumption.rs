//! PATCH 26 — unused-config-key detection.
//!
//! `consumed_pointers` is a registry of which config sections each run mode
//! actually reads. Anything in a loaded config outside that registry (and
//! outside `ALWAYS_CONSUMED`) is "unused" — either a typo, a stale key left
//! over from a different mode, or dead config. `report_unused_keys` walks a
//! loaded config's JSON tree and reports every such leaf by JSON Pointer.

use std::collections::BTreeSet;

use anyhow::Result;
use serde_json::Value;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigMode {
    Backtest,
    Paper,
    Live,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

/// Report of unused config keys, as RFC 6901 JSON Pointers, sorted and
/// deduplicated.
#[derive(Debug, Clone)]
pub struct UnusedKeysReport {
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeysReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Walk `config_json`'s leaves and report every one not covered by
/// `mode`'s consumed-pointer registry (plus `ALWAYS_CONSUMED`).
///
/// Under [`UnusedKeyPolicy::Warn`] this never errors — callers log the
/// report themselves. Under [`UnusedKeyPolicy::Fail`] a non-empty report
/// is returned as an `Err` (code `CONFIG_UNUSED_KEYS`).
pub fn report_unused_keys(
    mode: ConfigMode,
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeysReport> {
    let mut consumed: Vec<&str> = ALWAYS_CONSUMED.to_vec();
    consumed.extend_from_slice(consumed_pointers(mode));

    let mut leaves = Vec::new();
    collect_leaf_pointers(config_json, String::new(), &mut leaves);

    let unused: BTreeSet<String> = leaves
        .into_iter()
        .filter(|leaf| !is_consumed(leaf, &consumed))
        .collect();
    let unused_leaf_pointers: Vec<String> = unused.into_iter().collect();

    if policy == UnusedKeyPolicy::Fail && !unused_leaf_pointers.is_empty() {
        anyhow::bail!(
            "CONFIG_UNUSED_KEYS: {} unused config key(s) in {:?} mode: {:?}",
            unused_leaf_pointers.len(),
            mode,
            unused_leaf_pointers
        );
    }

    Ok(UnusedKeysReport {
        unused_leaf_pointers,
    })
}

/// A leaf is consumed if it exactly matches a consumed pointer, or sits
/// under one as a subtree — not merely shares its string prefix (so
/// `/risk/max_gross_exposure_extra` is NOT consumed by `/risk/max_gross_exposure`).
fn is_consumed(leaf: &str, consumed: &[&str]) -> bool {
    consumed
        .iter()
        .any(|c| leaf == *c || leaf.starts_with(&format!("{c}/")))
}

fn collect_leaf_pointers(v: &Value, prefix: String, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            if map.is_empty() {
                out.push(prefix);
                return;
            }
            for (k, val) in map {
                collect_leaf_pointers(val, format!("{prefix}/{k}"), out);
            }
        }
        Value::Array(arr) => {
            if arr.is_empty() {
                out.push(prefix);
                return;
            }
            for (i, val) in arr.iter().enumerate() {
                collect_leaf_pointers(val, format!("{prefix}/{i}"), out);
            }
        }
        _ => out.push(prefix),
    }
}

pub fn consumed_pointers(mode: ConfigMode) -> &'static [&'static str] {
    match mode {
        ConfigMode::Backtest => BACKTEST,
        ConfigMode::Paper => PAPER,
        ConfigMode::Live => LIVE,
    }
}

/// Consumed in every mode: engine identity, used for run-ledger fencing
/// and isolation regardless of what else the config describes.
static ALWAYS_CONSUMED: &[&str] = &["/engine"];

static BACKTEST: &[&str] = &[
    "/runtime/mode",
    "/data/timeframe",
    "/backtest",
    "/execution/slippage",
];

static PAPER: &[&str] = &[
    "/runtime/mode",
    "/broker/keys_env/api_key",
    "/broker/keys_env/api_secret",
    "/risk/max_gross_exposure",
];

static LIVE: &[&str] = &[
    "/runtime/mode",
    "/broker/keys_env/api_key",
    "/broker/keys_env/api_secret",
    "/risk/max_gross_exposure",
    "/execution",
    "/integrity",
    "/reconcile",
];
