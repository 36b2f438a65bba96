use mqk_risk::*;

const M: i64 = 1_000_000;

#[test]
fn scenario_forced_halt_on_daily_loss_breach() {
    let cfg = RiskConfig {
        daily_loss_limit_micros: 1_000 * M, // $1,000
        max_drawdown_limit_micros: 0,
        reject_storm_max_rejects_in_window: 10,
        pdt_auto_enabled: true,
        missing_protective_stop_flattens: true,
        ..RiskConfig::sane_defaults()
    };

    // Start day at 100k
    let mut st = RiskState::new(20260216, 100_000 * M, 1);

    // Equity drops below 99k => breach => HALT
    let inp = RiskInput {
        day_id: 20260216,
        equity_micros: 98_900 * M,
        reject_window_id: 1,
        request: RequestKind::NewOrder,
        is_risk_reducing: false,
        pdt: PdtContext::ok(),
        kill_switch: None,
        returns_history: Vec::new(),
        history_days: 0,
        vix: 15.0,
    };

    let d = evaluate(&cfg, &mut st, &inp);
    assert_eq!(d.action, RiskAction::Halt);
    assert_eq!(d.reason, ReasonCode::DailyLossLimitBreached);
    assert!(st.halted);
}

#[test]
fn scenario_scaling_factor_and_regime_are_attached_to_every_decision() {
    let cfg = RiskConfig::sane_defaults();
    let mut st = RiskState::new(20260216, 100_000 * M, 1);

    let calm = RiskInput {
        day_id: 20260216,
        equity_micros: 100_000 * M,
        reject_window_id: 1,
        request: RequestKind::NewOrder,
        is_risk_reducing: false,
        pdt: PdtContext::ok(),
        kill_switch: None,
        returns_history: vec![0.001, -0.001, 0.002, -0.0015, 0.001],
        history_days: 60,
        vix: 14.0,
    };
    let d = evaluate(&cfg, &mut st, &calm);
    assert_eq!(d.action, RiskAction::Allow);
    assert_eq!(d.regime, RiskRegime::Normal);
    assert!(d.scaling_factor >= cfg.scaling_min && d.scaling_factor <= cfg.scaling_max);

    let crisis = RiskInput {
        vix: 45.0,
        ..calm
    };
    let d2 = evaluate(&cfg, &mut st, &crisis);
    assert_eq!(d2.regime, RiskRegime::Crisis);
}
