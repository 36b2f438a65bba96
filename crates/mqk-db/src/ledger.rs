//! Run Ledger: the exactly-once stage machine behind the daily decision loop.
//!
//! One `trading_runs` row exists per `(trade_date, slot)`. The stage only
//! advances forward — `INIT -> ACQUIRED -> INPUTS_COMPUTED ->
//! INTENTS_COMPUTED -> SUBMITTED -> COMPLETE`, with `FAILED`/`REJECTED`
//! reachable from any non-terminal stage. `try_acquire` persists a
//! hostname+pid fencing token before returning so a second process racing
//! for the same slot observes `Busy` rather than silently overwriting state.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Init,
    Acquired,
    InputsComputed,
    IntentsComputed,
    Submitted,
    Complete,
    Failed,
    Rejected,
}

impl RunStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::Init => "INIT",
            RunStage::Acquired => "ACQUIRED",
            RunStage::InputsComputed => "INPUTS_COMPUTED",
            RunStage::IntentsComputed => "INTENTS_COMPUTED",
            RunStage::Submitted => "SUBMITTED",
            RunStage::Complete => "COMPLETE",
            RunStage::Failed => "FAILED",
            RunStage::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Ok(match s {
            "INIT" => RunStage::Init,
            "ACQUIRED" => RunStage::Acquired,
            "INPUTS_COMPUTED" => RunStage::InputsComputed,
            "INTENTS_COMPUTED" => RunStage::IntentsComputed,
            "SUBMITTED" => RunStage::Submitted,
            "COMPLETE" => RunStage::Complete,
            "FAILED" => RunStage::Failed,
            "REJECTED" => RunStage::Rejected,
            other => return Err(anyhow!("invalid run stage: {other}")),
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStage::Complete | RunStage::Failed | RunStage::Rejected)
    }
}

/// Outcome of `try_acquire`.
pub enum AcquireOutcome {
    Acquired(TradingRunRow),
    /// Another process currently holds an unexpired ACQUIRED token for this slot.
    Busy,
    /// This (trade_date, slot) already reached COMPLETE.
    AlreadyDone,
}

#[derive(Debug, Clone)]
pub struct TradingRunRow {
    pub run_id: Uuid,
    pub trade_date: NaiveDate,
    pub slot: String,
    pub stage: RunStage,
    pub fencing_token: String,
    pub inputs_hash: Option<String>,
    pub intents_hash: Option<String>,
    pub intents_json: Option<Value>,
}

fn row_to_trading_run(row: &sqlx::postgres::PgRow) -> Result<TradingRunRow> {
    Ok(TradingRunRow {
        run_id: row.try_get("run_id")?,
        trade_date: row.try_get("trade_date")?,
        slot: row.try_get("slot")?,
        stage: RunStage::parse(&row.try_get::<String, _>("stage")?)?,
        fencing_token: row.try_get("fencing_token")?,
        inputs_hash: row.try_get("inputs_hash")?,
        intents_hash: row.try_get("intents_hash")?,
        intents_json: row.try_get("intents_json")?,
    })
}

/// Build this process's fencing token: `hostname:pid`.
pub fn fencing_token() -> String {
    let host = hostname_best_effort();
    format!("{host}:{}", std::process::id())
}

fn hostname_best_effort() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown-host".to_string())
}

/// `try_acquire(trade_date, slot)`. Atomic: inserts a fresh ACQUIRED row, or
/// if one already exists, reports Busy (another fencing token holds it and
/// has not reached a terminal stage) or AlreadyDone (stage == COMPLETE).
pub async fn try_acquire(pool: &PgPool, trade_date: NaiveDate, slot: &str) -> Result<AcquireOutcome> {
    let existing = fetch_by_slot(pool, trade_date, slot).await?;

    if let Some(row) = existing {
        if row.stage == RunStage::Complete {
            return Ok(AcquireOutcome::AlreadyDone);
        }
        if !row.stage.is_terminal() {
            return Ok(AcquireOutcome::Busy);
        }
        // FAILED/REJECTED: allow a fresh attempt by re-acquiring this row.
        let token = fencing_token();
        sqlx::query(
            r#"
            update trading_runs
               set stage = 'ACQUIRED',
                   fencing_token = $1,
                   acquired_at_utc = now(),
                   failure_reason = null
             where run_id = $2
            "#,
        )
        .bind(&token)
        .bind(row.run_id)
        .execute(pool)
        .await
        .context("try_acquire re-arm update failed")?;

        let row = fetch_by_run_id(pool, row.run_id).await?;
        return Ok(AcquireOutcome::Acquired(row));
    }

    let run_id = Uuid::new_v4();
    let token = fencing_token();
    let inserted = sqlx::query(
        r#"
        insert into trading_runs (run_id, trade_date, slot, stage, fencing_token, acquired_at_utc)
        values ($1, $2, $3, 'ACQUIRED', $4, now())
        on conflict (trade_date, slot) do nothing
        returning run_id
        "#,
    )
    .bind(run_id)
    .bind(trade_date)
    .bind(slot)
    .bind(&token)
    .fetch_optional(pool)
    .await
    .context("try_acquire insert failed")?;

    match inserted {
        Some(_) => Ok(AcquireOutcome::Acquired(fetch_by_run_id(pool, run_id).await?)),
        // Lost the insert race to a concurrent acquirer.
        None => Ok(AcquireOutcome::Busy),
    }
}

async fn fetch_by_slot(pool: &PgPool, trade_date: NaiveDate, slot: &str) -> Result<Option<TradingRunRow>> {
    let row = sqlx::query(
        r#"
        select run_id, trade_date, slot, stage, fencing_token, inputs_hash, intents_hash, intents_json
        from trading_runs
        where trade_date = $1 and slot = $2
        "#,
    )
    .bind(trade_date)
    .bind(slot)
    .fetch_optional(pool)
    .await
    .context("fetch_by_slot failed")?;

    row.as_ref().map(row_to_trading_run).transpose()
}

pub async fn fetch_by_run_id(pool: &PgPool, run_id: Uuid) -> Result<TradingRunRow> {
    let row = sqlx::query(
        r#"
        select run_id, trade_date, slot, stage, fencing_token, inputs_hash, intents_hash, intents_json
        from trading_runs
        where run_id = $1
        "#,
    )
    .bind(run_id)
    .fetch_one(pool)
    .await
    .context("fetch_by_run_id failed")?;

    row_to_trading_run(&row)
}

/// Persist the inputs fingerprint and advance ACQUIRED -> INPUTS_COMPUTED.
pub async fn record_inputs(pool: &PgPool, run_id: Uuid, inputs_hash: &str) -> Result<()> {
    sqlx::query(
        r#"
        update trading_runs
           set stage = 'INPUTS_COMPUTED',
               inputs_hash = $1,
               inputs_at_utc = now()
         where run_id = $2 and stage = 'ACQUIRED'
        "#,
    )
    .bind(inputs_hash)
    .bind(run_id)
    .execute(pool)
    .await
    .context("record_inputs failed")?;
    Ok(())
}

/// Persist the intents fingerprint and the canonical serialized intents,
/// advancing INPUTS_COMPUTED -> INTENTS_COMPUTED.
pub async fn record_intents(
    pool: &PgPool,
    run_id: Uuid,
    intents_hash: &str,
    serialized_intents: Value,
) -> Result<()> {
    sqlx::query(
        r#"
        update trading_runs
           set stage = 'INTENTS_COMPUTED',
               intents_hash = $1,
               intents_json = $2,
               intents_at_utc = now()
         where run_id = $3 and stage = 'INPUTS_COMPUTED'
        "#,
    )
    .bind(intents_hash)
    .bind(serialized_intents)
    .bind(run_id)
    .execute(pool)
    .await
    .context("record_intents failed")?;
    Ok(())
}

/// Record that an intent has been submitted to the broker under `broker_id`.
/// Advances the run to SUBMITTED on first call.
pub async fn record_submission(pool: &PgPool, run_id: Uuid, intent_id: &str, broker_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        insert into trading_run_orders (run_id, intent_id, broker_id, updated_at_utc)
        values ($1, $2, $3, now())
        on conflict (run_id, intent_id) do update
            set broker_id = excluded.broker_id,
                updated_at_utc = now()
        "#,
    )
    .bind(run_id)
    .bind(intent_id)
    .bind(broker_id)
    .execute(pool)
    .await
    .context("record_submission insert failed")?;

    sqlx::query(
        r#"
        update trading_runs
           set stage = 'SUBMITTED',
               submitted_at_utc = coalesce(submitted_at_utc, now())
         where run_id = $1 and stage = 'INTENTS_COMPUTED'
        "#,
    )
    .bind(run_id)
    .execute(pool)
    .await
    .context("record_submission stage update failed")?;

    Ok(())
}

/// Record the terminal outcome (FILLED/CANCELLED/REJECTED/EXPIRED) of a
/// previously-submitted ticket.
pub async fn record_terminal(pool: &PgPool, run_id: Uuid, intent_id: &str, outcome: &str) -> Result<()> {
    sqlx::query(
        r#"
        update trading_run_orders
           set terminal_outcome = $1,
               updated_at_utc = now()
         where run_id = $2 and intent_id = $3
        "#,
    )
    .bind(outcome)
    .bind(run_id)
    .bind(intent_id)
    .execute(pool)
    .await
    .context("record_terminal failed")?;
    Ok(())
}

/// Look up a previously recorded terminal outcome for idempotent-submission
/// checks: if one exists, replay it instead of hitting the broker again.
pub async fn terminal_outcome_for(pool: &PgPool, run_id: Uuid, intent_id: &str) -> Result<Option<(String, Option<String>)>> {
    let row: Option<(Option<String>, Option<String>)> = sqlx::query_as(
        r#"
        select terminal_outcome, broker_id
        from trading_run_orders
        where run_id = $1 and intent_id = $2
        "#,
    )
    .bind(run_id)
    .bind(intent_id)
    .fetch_optional(pool)
    .await
    .context("terminal_outcome_for failed")?;

    Ok(row.and_then(|(outcome, broker_id)| outcome.map(|o| (o, broker_id))))
}

/// Mark the run COMPLETE. Requires SUBMITTED (a run with zero intents may
/// jump directly from INTENTS_COMPUTED to COMPLETE).
pub async fn complete(pool: &PgPool, run_id: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        update trading_runs
           set stage = 'COMPLETE',
               completed_at_utc = now()
         where run_id = $1 and stage in ('SUBMITTED', 'INTENTS_COMPUTED')
        "#,
    )
    .bind(run_id)
    .execute(pool)
    .await
    .context("complete failed")?;
    Ok(())
}

/// Mark the run FAILED with an error string, from any non-terminal stage.
pub async fn fail(pool: &PgPool, run_id: Uuid, err: &str) -> Result<()> {
    sqlx::query(
        r#"
        update trading_runs
           set stage = 'FAILED',
               failed_at_utc = now(),
               failure_reason = $1
         where run_id = $2
           and stage not in ('COMPLETE', 'FAILED', 'REJECTED')
        "#,
    )
    .bind(err)
    .bind(run_id)
    .execute(pool)
    .await
    .context("fail failed")?;
    Ok(())
}

/// `resume_or_start`: if an ACQUIRED-or-later run exists for this slot whose
/// fencing token matches `this_process_token` and it has reached at least
/// INTENTS_COMPUTED but not COMPLETE, return it for replay. Otherwise
/// `try_acquire` fresh.
pub async fn resume_or_start(
    pool: &PgPool,
    trade_date: NaiveDate,
    slot: &str,
    this_process_token: &str,
) -> Result<AcquireOutcome> {
    if let Some(row) = fetch_by_slot(pool, trade_date, slot).await? {
        let resumable = matches!(
            row.stage,
            RunStage::IntentsComputed | RunStage::Submitted
        );
        if resumable && row.fencing_token == this_process_token {
            return Ok(AcquireOutcome::Acquired(row));
        }
    }
    try_acquire(pool, trade_date, slot).await
}
