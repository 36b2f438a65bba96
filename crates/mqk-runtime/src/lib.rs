//! mqk-runtime
//!
//! Scheduler and daily-cycle orchestration: wires the Run Ledger, Risk &
//! Sizing Engine, Sleeve Allocator, Execution Stack, and Tail-Hedge Manager
//! into the single dispatcher process that is allowed to claim outbox rows
//! and drive trading runs end to end.

pub mod hashing;
pub mod scheduler;

pub use hashing::{inputs_hash, intents_hash, IntentFingerprint, PositionFingerprint};
pub use scheduler::{due_slots, default_slots, CompletionTracker, RetryBudget, Slot};
