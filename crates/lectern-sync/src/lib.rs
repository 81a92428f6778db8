//! The synchronization pipeline: reconciliation passes and their scheduling.
//!
//! [`ReconciliationEngine`] performs one pass — resolve a credential, mirror
//! courses/rosters/coursework, fan out notifications for newly created
//! assignments — and absorbs every failure into a [`SyncReport`].
//! [`Scheduler`] serializes passes behind a single consumer loop fed by an
//! interval timer and webhook triggers.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
#![allow(async_fn_in_trait)]

pub mod engine;
pub mod scheduler;

pub use engine::{Reconcile, ReconciliationEngine};
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerSettings};
