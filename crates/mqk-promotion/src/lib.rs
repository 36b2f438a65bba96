mod evaluator;
mod types;

pub use evaluator::{
    check_metrics_finite, compare_candidates, compute_metrics, evaluate_promotion, pick_winner,
};
pub use types::{
    PromotionCandidate, PromotionDecision, PromotionMetrics, PromotionReport, PromotionThresholds,
    TieBreakOrder, TieBreakRules,
};
