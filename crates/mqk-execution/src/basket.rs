//! Basket Executor (§4.4.3) — nets intents per instrument, filters dust,
//! orders by priority, validates turnover/gross caps, and splits the
//! resulting basket into sequential execution phases.

use std::cmp::Ordering;

use crate::policy::Urgency;
use crate::types::Side;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AssetClass {
    Fut,
    FxFut,
    Etf,
    Stk,
}

impl AssetClass {
    /// Execution priority: futures hedge first, then FX futures, then ETFs,
    /// then single names.
    fn priority(self) -> u8 {
        match self {
            AssetClass::Fut => 0,
            AssetClass::FxFut => 1,
            AssetClass::Etf => 2,
            AssetClass::Stk => 3,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LiquidityTier {
    Hedge,
    Liquid,
    Illiquid,
}

/// One netted, routable order before it is priced by the Execution Policy.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutableIntent {
    pub symbol: String,
    pub side: Side,
    pub qty: i64,
    pub sleeves: Vec<String>,
    pub urgency: Urgency,
    pub asset_class: AssetClass,
    pub liquidity_tier: LiquidityTier,
    pub price_micros: i64,
}

impl RoutableIntent {
    pub fn notional_micros(&self) -> i128 {
        self.qty as i128 * self.price_micros as i128
    }
}

/// A single sleeve's raw contribution to an instrument before netting.
#[derive(Clone, Debug, PartialEq)]
pub struct SleeveIntent {
    pub symbol: String,
    pub side: Side,
    pub qty: i64,
    pub sleeve: String,
    pub urgency: Urgency,
    pub asset_class: AssetClass,
    pub liquidity_tier: LiquidityTier,
    pub price_micros: i64,
}

fn signed_qty(side: Side, qty: i64) -> i64 {
    match side {
        Side::Buy => qty,
        Side::Sell => -qty,
    }
}

/// Net all sleeve intents for each instrument. Instruments whose signed
/// quantities cancel exactly are dropped entirely; otherwise the net side,
/// quantity, union of contributing sleeves, and max urgency are kept.
pub fn net_intents(raw: &[SleeveIntent]) -> Vec<RoutableIntent> {
    use std::collections::BTreeMap;

    struct Acc {
        net_qty: i64,
        sleeves: Vec<String>,
        urgency: Urgency,
        asset_class: AssetClass,
        liquidity_tier: LiquidityTier,
        price_micros: i64,
    }

    let mut by_symbol: BTreeMap<String, Acc> = BTreeMap::new();
    for intent in raw {
        let entry = by_symbol.entry(intent.symbol.clone()).or_insert(Acc {
            net_qty: 0,
            sleeves: Vec::new(),
            urgency: Urgency::Normal,
            asset_class: intent.asset_class,
            liquidity_tier: intent.liquidity_tier,
            price_micros: intent.price_micros,
        });
        entry.net_qty += signed_qty(intent.side, intent.qty);
        if !entry.sleeves.contains(&intent.sleeve) {
            entry.sleeves.push(intent.sleeve.clone());
        }
        if intent.urgency == Urgency::Crisis {
            entry.urgency = Urgency::Crisis;
        }
        entry.price_micros = intent.price_micros;
    }

    by_symbol
        .into_iter()
        .filter_map(|(symbol, acc)| {
            if acc.net_qty == 0 {
                return None;
            }
            let side = if acc.net_qty > 0 { Side::Buy } else { Side::Sell };
            Some(RoutableIntent {
                symbol,
                side,
                qty: acc.net_qty.abs(),
                sleeves: acc.sleeves,
                urgency: acc.urgency,
                asset_class: acc.asset_class,
                liquidity_tier: acc.liquidity_tier,
                price_micros: acc.price_micros,
            })
        })
        .collect()
}

/// Drop any intent below the minimum tradeable notional.
pub fn filter_min_notional(intents: Vec<RoutableIntent>, min_trade_notional_usd: i64) -> Vec<RoutableIntent> {
    let floor_micros = min_trade_notional_usd as i128 * 1_000_000;
    intents
        .into_iter()
        .filter(|i| i.notional_micros() >= floor_micros)
        .collect()
}

fn side_rank(side: Side) -> u8 {
    match side {
        Side::Sell => 0,
        Side::Buy => 1,
    }
}

fn urgency_rank(urgency: Urgency) -> u8 {
    match urgency {
        Urgency::Crisis => 0,
        Urgency::Normal => 1,
    }
}

/// Priority ordering: urgency first, then asset class, then side
/// (SELL before BUY), then liquidity tier, then descending notional.
pub fn priority_cmp(a: &RoutableIntent, b: &RoutableIntent) -> Ordering {
    urgency_rank(a.urgency)
        .cmp(&urgency_rank(b.urgency))
        .then(a.asset_class.priority().cmp(&b.asset_class.priority()))
        .then(side_rank(a.side).cmp(&side_rank(b.side)))
        .then(a.liquidity_tier.cmp(&b.liquidity_tier))
        .then(b.notional_micros().cmp(&a.notional_micros()))
}

pub fn sort_by_priority(mut intents: Vec<RoutableIntent>) -> Vec<RoutableIntent> {
    intents.sort_by(priority_cmp);
    intents
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BasketError {
    TurnoverExceeded,
    PostTradeGrossExceeded,
    SingleOrderTooLarge { symbol: String },
}

impl std::fmt::Display for BasketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BasketError::TurnoverExceeded => write!(f, "basket turnover exceeds cap"),
            BasketError::PostTradeGrossExceeded => write!(f, "post-trade gross exposure exceeds cap"),
            BasketError::SingleOrderTooLarge { symbol } => {
                write!(f, "order in {symbol} exceeds max single-order pct of NAV")
            }
        }
    }
}

impl std::error::Error for BasketError {}

#[derive(Clone, Debug, PartialEq)]
pub struct BasketLimits {
    pub max_turnover_pct_nav: f64,
    pub max_post_trade_gross_pct_nav: f64,
    pub max_single_order_pct_nav: f64,
}

/// Validate the whole basket against turnover, post-trade gross, and
/// single-order caps, all expressed as a fraction of `nav_micros`.
pub fn validate_basket(
    intents: &[RoutableIntent],
    limits: &BasketLimits,
    nav_micros: i64,
    pre_trade_gross_micros: i64,
) -> Result<(), BasketError> {
    if nav_micros <= 0 {
        return Ok(());
    }
    let nav = nav_micros as i128;

    let turnover: i128 = intents.iter().map(|i| i.notional_micros()).sum();
    if turnover as f64 / nav as f64 > limits.max_turnover_pct_nav {
        return Err(BasketError::TurnoverExceeded);
    }

    let net_delta: i128 = intents
        .iter()
        .map(|i| match i.side {
            Side::Buy => i.notional_micros(),
            Side::Sell => -i.notional_micros(),
        })
        .sum();
    let post_trade_gross = (pre_trade_gross_micros as i128 + net_delta).abs();
    if post_trade_gross as f64 / nav as f64 > limits.max_post_trade_gross_pct_nav {
        return Err(BasketError::PostTradeGrossExceeded);
    }

    for intent in intents {
        if intent.notional_micros() as f64 / nav as f64 > limits.max_single_order_pct_nav {
            return Err(BasketError::SingleOrderTooLarge {
                symbol: intent.symbol.clone(),
            });
        }
    }

    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub struct BasketPhase {
    pub name: &'static str,
    pub intents: Vec<RoutableIntent>,
}

/// Split a (priority-sorted) basket into sequential phases by liquidity
/// tier: hedge instruments first, then liquid, then illiquid.
pub fn split_into_phases(intents: Vec<RoutableIntent>) -> Vec<BasketPhase> {
    let mut hedge = Vec::new();
    let mut liquid = Vec::new();
    let mut illiquid = Vec::new();
    for intent in intents {
        match intent.liquidity_tier {
            LiquidityTier::Hedge => hedge.push(intent),
            LiquidityTier::Liquid => liquid.push(intent),
            LiquidityTier::Illiquid => illiquid.push(intent),
        }
    }
    vec![
        BasketPhase { name: "hedge", intents: hedge },
        BasketPhase { name: "liquid", intents: liquid },
        BasketPhase { name: "illiquid", intents: illiquid },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(symbol: &str, side: Side, qty: i64, sleeve: &str) -> SleeveIntent {
        SleeveIntent {
            symbol: symbol.to_string(),
            side,
            qty,
            sleeve: sleeve.to_string(),
            urgency: Urgency::Normal,
            asset_class: AssetClass::Etf,
            liquidity_tier: LiquidityTier::Liquid,
            price_micros: 100_000_000,
        }
    }

    #[test]
    fn exact_offsetting_legs_are_dropped() {
        let raw = vec![
            leg("SPY", Side::Buy, 100, "core"),
            leg("SPY", Side::Sell, 100, "hedge"),
        ];
        let netted = net_intents(&raw);
        assert!(netted.is_empty());
    }

    #[test]
    fn partial_offset_nets_to_remaining_side() {
        let raw = vec![
            leg("SPY", Side::Buy, 150, "core"),
            leg("SPY", Side::Sell, 100, "hedge"),
        ];
        let netted = net_intents(&raw);
        assert_eq!(netted.len(), 1);
        assert_eq!(netted[0].side, Side::Buy);
        assert_eq!(netted[0].qty, 50);
        assert_eq!(netted[0].sleeves.len(), 2);
    }

    #[test]
    fn max_urgency_across_sleeves_wins() {
        let mut raw = vec![leg("SPY", Side::Buy, 100, "core")];
        raw[0].urgency = Urgency::Normal;
        raw.push(SleeveIntent {
            urgency: Urgency::Crisis,
            ..leg("SPY", Side::Buy, 50, "hedge")
        });
        let netted = net_intents(&raw);
        assert_eq!(netted[0].urgency, Urgency::Crisis);
    }

    #[test]
    fn dust_below_min_notional_is_filtered() {
        let intents = vec![RoutableIntent {
            symbol: "SPY".into(),
            side: Side::Buy,
            qty: 1,
            sleeves: vec!["core".into()],
            urgency: Urgency::Normal,
            asset_class: AssetClass::Etf,
            liquidity_tier: LiquidityTier::Liquid,
            price_micros: 100_000_000,
        }];
        let filtered = filter_min_notional(intents, 500);
        assert!(filtered.is_empty());
    }

    #[test]
    fn priority_orders_hedges_first_then_by_notional() {
        let small_fut = RoutableIntent {
            symbol: "ES".into(),
            side: Side::Buy,
            qty: 1,
            sleeves: vec![],
            urgency: Urgency::Normal,
            asset_class: AssetClass::Fut,
            liquidity_tier: LiquidityTier::Hedge,
            price_micros: 4_000_000_000,
        };
        let big_stk = RoutableIntent {
            symbol: "AAPL".into(),
            side: Side::Buy,
            qty: 1000,
            sleeves: vec![],
            urgency: Urgency::Normal,
            asset_class: AssetClass::Stk,
            liquidity_tier: LiquidityTier::Liquid,
            price_micros: 200_000_000,
        };
        let sorted = sort_by_priority(vec![big_stk.clone(), small_fut.clone()]);
        assert_eq!(sorted[0].symbol, "ES");
        assert_eq!(sorted[1].symbol, "AAPL");
    }

    #[test]
    fn validate_basket_rejects_turnover_breach() {
        let intents = vec![RoutableIntent {
            symbol: "SPY".into(),
            side: Side::Buy,
            qty: 1000,
            sleeves: vec![],
            urgency: Urgency::Normal,
            asset_class: AssetClass::Etf,
            liquidity_tier: LiquidityTier::Liquid,
            price_micros: 100_000_000,
        }];
        let limits = BasketLimits {
            max_turnover_pct_nav: 0.01,
            max_post_trade_gross_pct_nav: 1.0,
            max_single_order_pct_nav: 1.0,
        };
        let err = validate_basket(&intents, &limits, 1_000_000_000_000, 0).unwrap_err();
        assert_eq!(err, BasketError::TurnoverExceeded);
    }

    #[test]
    fn validate_basket_rejects_single_order_too_large() {
        let intents = vec![RoutableIntent {
            symbol: "SPY".into(),
            side: Side::Buy,
            qty: 1000,
            sleeves: vec![],
            urgency: Urgency::Normal,
            asset_class: AssetClass::Etf,
            liquidity_tier: LiquidityTier::Liquid,
            price_micros: 100_000_000,
        }];
        let limits = BasketLimits {
            max_turnover_pct_nav: 1.0,
            max_post_trade_gross_pct_nav: 1.0,
            max_single_order_pct_nav: 0.01,
        };
        let err = validate_basket(&intents, &limits, 1_000_000_000_000, 0).unwrap_err();
        assert_eq!(err, BasketError::SingleOrderTooLarge { symbol: "SPY".into() });
    }

    #[test]
    fn split_into_phases_buckets_by_tier() {
        let hedge = RoutableIntent {
            symbol: "ES".into(),
            side: Side::Buy,
            qty: 1,
            sleeves: vec![],
            urgency: Urgency::Normal,
            asset_class: AssetClass::Fut,
            liquidity_tier: LiquidityTier::Hedge,
            price_micros: 4_000_000_000,
        };
        let illiquid = RoutableIntent {
            liquidity_tier: LiquidityTier::Illiquid,
            symbol: "SMALLCAP".into(),
            ..hedge.clone()
        };
        let phases = split_into_phases(vec![illiquid.clone(), hedge.clone()]);
        assert_eq!(phases[0].name, "hedge");
        assert_eq!(phases[0].intents, vec![hedge]);
        assert_eq!(phases[2].name, "illiquid");
        assert_eq!(phases[2].intents, vec![illiquid]);
        assert!(phases[1].intents.is_empty());
    }
}
