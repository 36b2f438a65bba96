//! Execution Policy (§4.4.1) — maps an `OrderIntent` + quote + session phase
//! to an `OrderPlan`: order mode, limit price, collar, and time-in-force.
//!
//! Prices are integer micros throughout (see `prices.rs`); this module never
//! touches `f64` except for the bps-scale configuration knobs themselves.

use crate::types::{OrderIntent, Side};

/// How urgently this intent needs to fill.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Crisis,
}

/// Which part of the session this plan is being built for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    OpenAuction,
    Continuous,
    CloseAuction,
}

/// The order type/TIF selected by the policy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OrderMode {
    /// Marketable limit, IOC, short TTL — used for CRISIS urgency.
    MarketableLimitIoc,
    /// Limit-on-close.
    Loc,
    /// Market-on-close.
    Moc,
    /// Limit-on-open.
    Loo,
    /// Market-on-open.
    Moo,
    /// Adaptive/VWAP/TWAP algo — used when size exceeds the ADV fraction.
    Algo,
    /// Plain day limit order — the default continuous-session mode.
    Limit,
}

/// A fully-priced, ready-to-submit order plan.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderPlan {
    pub symbol: String,
    pub side: Side,
    pub qty: i64,
    pub mode: OrderMode,
    /// `None` only for pure market-on-open/close modes.
    pub limit_price_micros: Option<i64>,
    pub ttl_seconds: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyError {
    /// The quote is older than `freshness_bound_ms` relative to `now_ms`.
    StaleQuote,
    /// A market order was selected but `market_orders_enabled` is false.
    MarketOrdersDisabled,
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyError::StaleQuote => write!(f, "quote is stale"),
            PolicyError::MarketOrdersDisabled => write!(f, "market orders are disabled"),
        }
    }
}

impl std::error::Error for PolicyError {}

/// A top-of-book quote, prices in integer micros.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Quote {
    pub bid_micros: i64,
    pub ask_micros: i64,
    pub as_of_ms: i64,
}

impl Quote {
    pub fn spread_micros(&self) -> i64 {
        (self.ask_micros - self.bid_micros).max(0)
    }

    pub fn mid_micros(&self) -> i64 {
        (self.bid_micros + self.ask_micros) / 2
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolicyConfig {
    pub freshness_bound_ms: i64,
    pub market_orders_enabled: bool,
    pub max_replace: u32,
    /// Max tolerated slippage off the reference price, in bps.
    pub max_slip_bps: i64,
    /// Order size as a fraction of ADV above which the ALGO mode is used.
    pub adv_fraction_threshold: f64,
    pub tick_size_micros: i64,
    pub crisis_ttl_seconds: u32,
    pub default_ttl_seconds: u32,
    /// When true, auction phases route through MOC/MOO instead of LOC/LOO.
    pub prefer_market_on_auction: bool,
}

impl PolicyConfig {
    pub fn sane_defaults() -> Self {
        Self {
            freshness_bound_ms: 5_000,
            market_orders_enabled: false,
            max_replace: 3,
            max_slip_bps: 15,
            adv_fraction_threshold: 0.10,
            tick_size_micros: 1_000, // $0.001
            crisis_ttl_seconds: 30,
            default_ttl_seconds: 300,
            prefer_market_on_auction: false,
        }
    }
}

fn round_to_tick(price_micros: i64, tick_micros: i64) -> i64 {
    if tick_micros <= 0 {
        return price_micros;
    }
    let half = tick_micros / 2;
    ((price_micros + half) / tick_micros) * tick_micros
}

/// Collar bound: ceiling for buys, floor for sells, `ref * (1 ± max_slip_bps)`.
pub fn collar(cfg: &PolicyConfig, side: Side, ref_price_micros: i64) -> i64 {
    let bps = cfg.max_slip_bps as i128;
    let adj = (ref_price_micros as i128 * bps / 10_000) as i64;
    let bound = match side {
        Side::Buy => ref_price_micros + adj,
        Side::Sell => ref_price_micros - adj,
    };
    round_to_tick(bound, cfg.tick_size_micros)
}

/// Marketable limit price (§4.4.1). Uses the quote when present, otherwise
/// falls back to `ref ± 2*max_slip_bps` to maximize fill probability.
pub fn marketable_limit_price(
    cfg: &PolicyConfig,
    side: Side,
    ref_price_micros: i64,
    quote: Option<&Quote>,
) -> i64 {
    let raw = match (side, quote) {
        (Side::Buy, Some(q)) => {
            let quarter_spread = q.spread_micros() / 4;
            let from_ask = q.ask_micros + quarter_spread;
            let from_ref = ref_price_micros
                + (ref_price_micros as i128 * cfg.max_slip_bps as i128 / 10_000) as i64;
            from_ask.min(from_ref)
        }
        (Side::Sell, Some(q)) => {
            let quarter_spread = q.spread_micros() / 4;
            let from_bid = q.bid_micros - quarter_spread;
            let from_ref = ref_price_micros
                - (ref_price_micros as i128 * cfg.max_slip_bps as i128 / 10_000) as i64;
            from_bid.max(from_ref)
        }
        (Side::Buy, None) => {
            ref_price_micros + (ref_price_micros as i128 * 2 * cfg.max_slip_bps as i128 / 10_000) as i64
        }
        (Side::Sell, None) => {
            ref_price_micros - (ref_price_micros as i128 * 2 * cfg.max_slip_bps as i128 / 10_000) as i64
        }
    };
    round_to_tick(raw, cfg.tick_size_micros)
}

/// Replace aggression at attempt `k` (1-indexed): `min(1.0, 0.5 + 0.1*k)`.
/// Returned as a fraction of the distance from the current limit to the
/// collar bound that the new limit should close.
pub fn replace_aggression(k: u32) -> f64 {
    (0.5 + 0.1 * k as f64).min(1.0)
}

/// Move a limit price toward the collar by `replace_aggression(k)`.
pub fn replace_price(cfg: &PolicyConfig, side: Side, current_limit_micros: i64, ref_price_micros: i64, k: u32) -> i64 {
    let bound = collar(cfg, side, ref_price_micros);
    let aggression = replace_aggression(k);
    let delta = (bound - current_limit_micros) as f64 * aggression;
    round_to_tick(current_limit_micros + delta.round() as i64, cfg.tick_size_micros)
}

/// Build the `OrderPlan` for one intent.
pub fn build_plan(
    cfg: &PolicyConfig,
    intent: &OrderIntent,
    quote: Option<&Quote>,
    ref_price_micros: i64,
    phase: SessionPhase,
    urgency: Urgency,
    order_notional_adv_fraction: f64,
    now_ms: i64,
) -> Result<OrderPlan, PolicyError> {
    if let Some(q) = quote {
        if now_ms - q.as_of_ms > cfg.freshness_bound_ms {
            return Err(PolicyError::StaleQuote);
        }
    }

    let mode = select_mode(cfg, phase, urgency, order_notional_adv_fraction);

    if matches!(mode, OrderMode::Moc | OrderMode::Moo) && !cfg.market_orders_enabled {
        return Err(PolicyError::MarketOrdersDisabled);
    }

    let limit_price_micros = match mode {
        OrderMode::Moc | OrderMode::Moo => None,
        OrderMode::MarketableLimitIoc => {
            Some(marketable_limit_price(cfg, intent.side, ref_price_micros, quote))
        }
        OrderMode::Loc | OrderMode::Loo | OrderMode::Limit | OrderMode::Algo => {
            let raw = marketable_limit_price(cfg, intent.side, ref_price_micros, quote);
            let bound = collar(cfg, intent.side, ref_price_micros);
            let clamped = match intent.side {
                Side::Buy => raw.min(bound),
                Side::Sell => raw.max(bound),
            };
            Some(round_to_tick(clamped, cfg.tick_size_micros))
        }
    };

    let ttl_seconds = match urgency {
        Urgency::Crisis => cfg.crisis_ttl_seconds,
        Urgency::Normal => cfg.default_ttl_seconds,
    };

    Ok(OrderPlan {
        symbol: intent.symbol.clone(),
        side: intent.side,
        qty: intent.qty,
        mode,
        limit_price_micros,
        ttl_seconds,
    })
}

fn select_mode(cfg: &PolicyConfig, phase: SessionPhase, urgency: Urgency, adv_fraction: f64) -> OrderMode {
    if urgency == Urgency::Crisis {
        return OrderMode::MarketableLimitIoc;
    }
    match phase {
        SessionPhase::CloseAuction => {
            if cfg.prefer_market_on_auction {
                OrderMode::Moc
            } else {
                OrderMode::Loc
            }
        }
        SessionPhase::OpenAuction => {
            if cfg.prefer_market_on_auction {
                OrderMode::Moo
            } else {
                OrderMode::Loo
            }
        }
        SessionPhase::Continuous => {
            if adv_fraction > cfg.adv_fraction_threshold {
                OrderMode::Algo
            } else {
                OrderMode::Limit
            }
        }
    }
}
