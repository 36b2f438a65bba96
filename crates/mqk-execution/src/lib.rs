//! mqk-execution
//!
//! PATCH 05: Execution Engine Contract (Target Position Model)
//! - Strategies output target positions (not orders)
//! - Engine converts (current_positions, targets) -> order intents
//! - Pure deterministic logic, no broker wiring

mod engine;
mod gateway;
mod id_map;
mod oms;
mod order_router;
mod reconcile_guard;
mod types;

pub mod basket;
pub mod gater;
pub mod pair;
pub mod policy;
pub mod prices;
pub mod slippage;

pub use engine::targets_to_order_intents;
pub use gateway::{intent_id_to_client_order_id, BrokerGateway, GateRefusal, GateVerdicts, ReconcileGate};
pub use id_map::{BrokerOrderMap, UnknownOrder};
pub use oms::state_machine::{OmsEvent, OmsOrder, OrderState, TransitionError};
pub use order_router::{
    BrokerAdapter, BrokerCancelResponse, BrokerReplaceRequest, BrokerReplaceResponse,
    BrokerSubmitRequest, BrokerSubmitResponse,
};
pub use reconcile_guard::ReconcileFreshnessGuard;
pub use types::{
    ExecutionDecision, ExecutionIntent, OrderIntent, Side, StrategyOutput, TargetPosition,
};

pub use basket::{
    filter_min_notional, net_intents, split_into_phases, validate_basket, AssetClass,
    BasketError, BasketPhase, LiquidityTier, RoutableIntent,
};
pub use gater::{should_trade, GaterInput, OverrideReason};
pub use pair::{decide_action, fill_frac, pair_is_complete, LegAction, PairLeg, PairLegState};
pub use policy::{
    build_plan, collar, marketable_limit_price, replace_aggression, replace_price, OrderMode,
    OrderPlan, PolicyConfig, PolicyError, Quote, SessionPhase, Urgency,
};
pub use prices::{micros_to_price, price_to_micros, PricingError, MICROS_PER_UNIT};
pub use slippage::{realized_slippage_bps, RollingStats, SlippageModel};

use std::collections::BTreeMap;

/// Canonical type for current positions, keyed by symbol.
/// Signed quantity: +long, -short.
pub type PositionBook = BTreeMap<String, i64>;

/// Helper to build a PositionBook with minimal boilerplate in tests/callers.
pub fn position_book<I, S>(items: I) -> PositionBook
where
    I: IntoIterator<Item = (S, i64)>,
    S: Into<String>,
{
    let mut book = PositionBook::new();
    for (sym, qty) in items {
        book.insert(sym.into(), qty);
    }
    book
}
