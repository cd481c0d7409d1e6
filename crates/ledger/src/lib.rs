//! Client-side score ledger synchronization.
//!
//! Pending edits accumulate in a [`Ledger`] that is owned by a
//! [`LockCoordinator`]: every read, merge and flush happens while holding the
//! single [`LedgerGuard`]. The [`UpdateDispatcher`] reacts to three triggers:
//!
//! * an edit, merged under the lock,
//! * a navigation request, which flushes a non-empty ledger and then moves the
//!   page to new query parameters,
//! * a periodic tick, which always flushes.
//!
//! Acquisition never waits. A trigger that finds the lock held is dropped and
//! the next tick picks up whatever is pending. The [`SyncClient`] posts the
//! ledger and clears it only when the server answers `204 No Content`.
//!
//! # Invariants
//!
//! - At most one trigger is inside its critical section at a time.
//! - The ledger is only mutated through a live guard.
//! - The ledger is cleared exactly when a flush is confirmed; any other
//!   response or transport failure leaves it untouched.

mod dispatcher;
mod error;
mod ledger;
mod lock;
mod navigator;
mod sync;

pub use dispatcher::{DispatcherConfig, DispatcherHandle, TriggerOutcome, UpdateDispatcher};
pub use error::{LockBusy, Result, SyncError};
pub use ledger::Ledger;
pub use lock::{LedgerGuard, LockCoordinator};
pub use navigator::{Navigator, QueryState};
pub use sync::{FlushOutcome, HttpScoreSink, ScoreSink, SinkResponse, SyncClient};
