//! mqk-risk
//!
//! PATCH 07 – Risk Engine Enforcement
//!
//! Goals:
//! - Daily loss limit enforcement
//! - Max drawdown guard
//! - Reject storm protection
//! - PDT auto mode enforcement
//! - Kill switch behavior
//!
//! Deterministic, pure logic. No IO, no time, no broker calls.

mod engine;
mod types;

pub mod pdt;
pub mod sovereign;
pub mod vol;

pub use engine::{evaluate, tick, validate_equity_input, validate_order_qty}; // Patch L10
pub use pdt::{
    clear_pdt_flag, evaluate_pdt, record_day_trade, tick_pdt, to_pdt_context, PdtDecision,
    PdtInput, PdtPolicy, PdtReason, PdtState, PDT_DAY_TRADE_THRESHOLD, PDT_DEFAULT_WINDOW_DAYS,
    PDT_MIN_EQUITY_MICROS,
};
pub use sovereign::{
    check_kill_switches, check_take_profit, compute_dv01_position, compute_target_weight,
    should_reenable, Dv01Position, FragmentationSignal, RegimeWeights, SizingResult, SleeveState,
    SleeveTracker, SovereignConfig,
};
pub use sovereign::KillSwitchType as SovereignKillSwitchType;
pub use types::*;
pub use vol::{
    classify_regime, cummax, drawdown_series, drawdown_stats, effective_vol, emergency_derisk,
    realized_vol, scaling_factor, RiskRegime, TRADING_DAYS_PER_YEAR,
};
