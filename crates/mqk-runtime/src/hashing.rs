//! Canonical fingerprints for the Run Ledger (§4.1): `inputs_hash` and
//! `intents_hash`. Both are stable under map/position reordering so that
//! identical logical state always hashes identically across restarts.

use sha2::{Digest, Sha256};

/// One position entry contributing to the inputs fingerprint, pre-rounded
/// to the canonical micros scale by the caller.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PositionFingerprint {
    pub symbol: String,
    pub qty_micros: i64,
}

/// Stable hash over sorted positions, FX snapshot timestamp bucket, the
/// quote-snapshot timestamps of referenced instruments, and the config
/// parameters version.
pub fn inputs_hash(
    positions: &[PositionFingerprint],
    fx_snapshot_bucket: i64,
    quote_timestamps: &[(String, i64)],
    params_version: &str,
) -> String {
    let mut sorted_positions = positions.to_vec();
    sorted_positions.sort();

    let mut sorted_quotes = quote_timestamps.to_vec();
    sorted_quotes.sort();

    let mut hasher = Sha256::new();
    hasher.update(b"inputs_hash.v1\n");
    for p in &sorted_positions {
        hasher.update(p.symbol.as_bytes());
        hasher.update(b"=");
        hasher.update(p.qty_micros.to_string().as_bytes());
        hasher.update(b";");
    }
    hasher.update(b"|fx=");
    hasher.update(fx_snapshot_bucket.to_string().as_bytes());
    hasher.update(b"|quotes=");
    for (sym, ts) in &sorted_quotes {
        hasher.update(sym.as_bytes());
        hasher.update(b"@");
        hasher.update(ts.to_string().as_bytes());
        hasher.update(b";");
    }
    hasher.update(b"|params=");
    hasher.update(params_version.as_bytes());

    hex::encode(hasher.finalize())
}

/// One intent entry contributing to the intents fingerprint.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct IntentFingerprint {
    pub instrument_id: String,
    pub side: String,
    pub signed_qty: i64,
    pub sleeve: String,
}

/// Stable hash over the canonical ordering of (instrument, side, signed
/// qty, sleeve) so identical intent sets across restarts hash identically.
pub fn intents_hash(intents: &[IntentFingerprint]) -> String {
    let mut sorted = intents.to_vec();
    sorted.sort();

    let mut hasher = Sha256::new();
    hasher.update(b"intents_hash.v1\n");
    for i in &sorted {
        hasher.update(i.instrument_id.as_bytes());
        hasher.update(b"|");
        hasher.update(i.side.as_bytes());
        hasher.update(b"|");
        hasher.update(i.signed_qty.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(i.sleeve.as_bytes());
        hasher.update(b";");
    }
    hex::encode(hasher.finalize())
}
