//! Option Validator (§4.5 entry flow) — filters option-chain candidates
//! before a hedge order is placed.

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptionHedgeType {
    EquityPut,
    VolCall,
    CreditPut,
}

impl OptionHedgeType {
    fn max_spread_pct(self) -> f64 {
        match self {
            OptionHedgeType::EquityPut => 0.08,
            OptionHedgeType::VolCall => 0.12,
            OptionHedgeType::CreditPut => 0.10,
        }
    }

    fn min_volume(self) -> i64 {
        match self {
            OptionHedgeType::EquityPut => 100,
            OptionHedgeType::VolCall => 50,
            OptionHedgeType::CreditPut => 100,
        }
    }

    fn min_open_interest(self) -> i64 {
        match self {
            OptionHedgeType::EquityPut => 500,
            OptionHedgeType::VolCall => 250,
            OptionHedgeType::CreditPut => 250,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OptionQuote {
    pub bid: f64,
    pub ask: f64,
    pub volume: i64,
    pub open_interest: i64,
    pub dte: i64,
    pub premium_per_contract: f64,
}

impl OptionQuote {
    fn relative_spread(&self) -> f64 {
        if self.bid <= 0.0 || self.ask <= 0.0 {
            return f64::INFINITY;
        }
        let mid = (self.bid + self.ask) / 2.0;
        (self.ask - self.bid) / mid
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectionReason {
    InsufficientDte,
    NonPositiveQuote,
    SpreadTooWide,
    VolumeTooLow,
    OpenInterestTooLow,
    PremiumAboveAbsoluteCap,
    PremiumAboveBudgetFraction,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidationConfig {
    pub min_dte: i64,
    pub max_premium_per_leg_usd: f64,
    pub max_premium_pct_budget: f64,
}

impl ValidationConfig {
    pub fn sane_defaults() -> Self {
        Self {
            min_dte: 14,
            max_premium_per_leg_usd: 50_000.0,
            max_premium_pct_budget: 0.25,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub failures: Vec<RejectionReason>,
}

/// Validate an option candidate against DTE, liquidity, spread, and budget
/// caps. All applicable failures are collected, not just the first.
pub fn validate(
    cfg: &ValidationConfig,
    quote: &OptionQuote,
    hedge_type: OptionHedgeType,
    quantity: i64,
    budget_remaining: f64,
) -> ValidationResult {
    let mut failures = Vec::new();

    if quote.dte < cfg.min_dte {
        failures.push(RejectionReason::InsufficientDte);
    }
    if quote.bid <= 0.0 || quote.ask <= 0.0 {
        failures.push(RejectionReason::NonPositiveQuote);
    } else if quote.relative_spread() > hedge_type.max_spread_pct() {
        failures.push(RejectionReason::SpreadTooWide);
    }
    if quote.volume < hedge_type.min_volume() {
        failures.push(RejectionReason::VolumeTooLow);
    }
    if quote.open_interest < hedge_type.min_open_interest() {
        failures.push(RejectionReason::OpenInterestTooLow);
    }

    let total_premium = quote.premium_per_contract * quantity as f64;
    if total_premium > cfg.max_premium_per_leg_usd {
        failures.push(RejectionReason::PremiumAboveAbsoluteCap);
    }
    if budget_remaining > 0.0 && total_premium > budget_remaining * cfg.max_premium_pct_budget {
        failures.push(RejectionReason::PremiumAboveBudgetFraction);
    }

    ValidationResult {
        is_valid: failures.is_empty(),
        failures,
    }
}

/// `floor(allocated_dollars / (premium * multiplier))`.
pub fn size_contracts(allocated_dollars: f64, premium_per_contract: f64, multiplier: f64) -> i64 {
    let denom = premium_per_contract * multiplier;
    if denom <= 0.0 {
        return 0;
    }
    (allocated_dollars / denom).floor() as i64
}
