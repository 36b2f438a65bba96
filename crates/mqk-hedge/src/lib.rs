//! mqk-hedge
//!
//! §4.5 Tail-Hedge Manager & Sovereign Overlay
//! - Annual options-premium budget tracking, recyclable from realized gains
//! - Option-chain candidate validation (DTE, spread, liquidity, premium caps)
//! - Entry/roll/monetize flow for protective option positions
//! - Sovereign stress overlay on US-listed European proxies
//! - Pure deterministic logic (no IO, no broker wiring, no option pricing)

pub mod budget;
pub mod overlay;
pub mod tail_hedge;
pub mod validator;

pub use budget::HedgeBudget;
pub use overlay::{
    classify_stress_level, classify_trend, compute_drawdown, compute_stress_signal,
    default_country_allocation, determine_action, stress_score, OverlayAction, SovereignProxy,
    StressConfig, StressLevel, StressSignal, Trend,
};
pub use tail_hedge::{
    default_allocation, fill_coverage_gaps, legs_needing_roll, monetize_itm_hedges,
    HedgeEntryPlan, HedgePosition, HedgeType,
};
pub use validator::{
    size_contracts, validate, OptionHedgeType, OptionQuote, RejectionReason, ValidationConfig,
    ValidationResult,
};
