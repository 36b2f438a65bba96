//! Slippage model (§4.4.5) — realized-slippage tracking and cost estimation
//! for the Trade Gater and Execution Policy.

use std::collections::{BTreeMap, VecDeque};

use crate::basket::AssetClass;
use crate::types::Side;

/// Rolling window size per instrument/asset-class (§4.4.5).
pub const WINDOW_SIZE: usize = 200;

/// Minimum sample count before per-instrument stats are trusted.
const MIN_INSTRUMENT_SAMPLES: usize = 15;

/// Clamp bounds on any slippage estimate, in bps.
const MIN_ESTIMATE_BPS: f64 = 0.5;
const MAX_ESTIMATE_BPS: f64 = 25.0;

const DEFAULT_ESTIMATE_BPS: f64 = 5.0;

/// Realized slippage in bps: `(fill - arrival) / arrival * 1e4` for BUY,
/// negated for SELL (a worse fill is always a positive number).
pub fn realized_slippage_bps(side: Side, arrival_price: f64, fill_price: f64) -> f64 {
    let raw = (fill_price - arrival_price) / arrival_price * 10_000.0;
    match side {
        Side::Buy => raw,
        Side::Sell => -raw,
    }
}

/// Rolling order statistics over a fixed-size window of bps samples.
#[derive(Clone, Debug, Default)]
pub struct RollingStats {
    samples: VecDeque<f64>,
}

impl RollingStats {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(WINDOW_SIZE),
        }
    }

    pub fn push(&mut self, sample_bps: f64) {
        if self.samples.len() == WINDOW_SIZE {
            self.samples.pop_front();
        }
        self.samples.push_back(sample_bps);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn sorted(&self) -> Vec<f64> {
        let mut v: Vec<f64> = self.samples.iter().copied().collect();
        v.sort_by(|a, b| a.partial_cmp(b).unwrap());
        v
    }

    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    fn percentile(&self, p: f64) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let sorted = self.sorted();
        let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
        Some(sorted[idx])
    }

    pub fn median(&self) -> Option<f64> {
        self.percentile(0.5)
    }

    pub fn p70(&self) -> Option<f64> {
        self.percentile(0.70)
    }

    pub fn p90(&self) -> Option<f64> {
        self.percentile(0.90)
    }

    pub fn stddev(&self) -> Option<f64> {
        let mean = self.mean()?;
        if self.samples.len() < 2 {
            return Some(0.0);
        }
        let var = self
            .samples
            .iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>()
            / self.samples.len() as f64;
        Some(var.sqrt())
    }
}

/// Tracks rolling fill-slippage stats per instrument and per asset class,
/// and estimates expected cost for a prospective trade.
#[derive(Clone, Debug, Default)]
pub struct SlippageModel {
    per_instrument: BTreeMap<String, RollingStats>,
    per_asset_class: BTreeMap<AssetClass, RollingStats>,
}

impl SlippageModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, symbol: &str, asset_class: AssetClass, realized_bps: f64) {
        self.per_instrument
            .entry(symbol.to_string())
            .or_insert_with(RollingStats::new)
            .push(realized_bps);
        self.per_asset_class
            .entry(asset_class)
            .or_insert_with(RollingStats::new)
            .push(realized_bps);
    }

    pub fn instrument_stats(&self, symbol: &str) -> Option<&RollingStats> {
        self.per_instrument.get(symbol)
    }

    pub fn asset_class_stats(&self, asset_class: AssetClass) -> Option<&RollingStats> {
        self.per_asset_class.get(&asset_class)
    }

    /// Estimate expected slippage in bps for a trade in `symbol`: prefers the
    /// instrument's own p70 with ≥15 samples, falls back to the asset class's
    /// p70, then a default, always clamped to [0.5, 25] bps.
    pub fn estimate(&self, symbol: &str, asset_class: AssetClass) -> f64 {
        let buffer_bps = 0.5;
        let raw = if let Some(stats) = self.per_instrument.get(symbol) {
            if stats.len() >= MIN_INSTRUMENT_SAMPLES {
                stats.p70().unwrap() + buffer_bps
            } else if let Some(ac_stats) = self.per_asset_class.get(&asset_class) {
                ac_stats.p70().unwrap_or(DEFAULT_ESTIMATE_BPS)
            } else {
                DEFAULT_ESTIMATE_BPS
            }
        } else if let Some(ac_stats) = self.per_asset_class.get(&asset_class) {
            ac_stats.p70().unwrap_or(DEFAULT_ESTIMATE_BPS)
        } else {
            DEFAULT_ESTIMATE_BPS
        };
        raw.clamp(MIN_ESTIMATE_BPS, MAX_ESTIMATE_BPS)
    }
}
