use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::LockBusy;
use crate::ledger::Ledger;

/// Single-holder lock that owns the page's [`Ledger`].
///
/// [`try_acquire`](Self::try_acquire) never waits and never queues. The
/// returned guard can be held across the flush request and releases on drop.
/// Clones share the same lock and ledger.
#[derive(Debug, Clone, Default)]
pub struct LockCoordinator {
	ledger: Arc<Mutex<Ledger>>,
	held: Arc<AtomicBool>,
}

impl LockCoordinator {
	/// Creates a released lock over an empty ledger.
	pub fn new() -> Self {
		Self::default()
	}

	/// Takes the lock if it is free.
	///
	/// # Errors
	///
	/// Returns [`LockBusy`] when another guard is alive.
	pub fn try_acquire(&self) -> Result<LedgerGuard, LockBusy> {
		let guard = Arc::clone(&self.ledger).try_lock_owned().map_err(|_| LockBusy)?;
		self.held.store(true, Ordering::Release);
		tracing::debug!("ledger.lock.acquired");
		Ok(LedgerGuard {
			held: HeldFlag(Arc::clone(&self.held)),
			guard,
		})
	}

	/// Whether a guard is currently alive.
	pub fn is_held(&self) -> bool {
		self.held.load(Ordering::Acquire)
	}
}

/// Exclusive access to the ledger. Dropping it releases the lock.
#[derive(Debug)]
pub struct LedgerGuard {
	// Field order matters: the flag clears before the mutex unlocks, so a
	// concurrent acquirer's store is never overwritten.
	held: HeldFlag,
	guard: OwnedMutexGuard<Ledger>,
}

impl LedgerGuard {
	/// Releases the lock.
	pub fn release(self) {}
}

impl Deref for LedgerGuard {
	type Target = Ledger;

	fn deref(&self) -> &Ledger {
		&self.guard
	}
}

impl DerefMut for LedgerGuard {
	fn deref_mut(&mut self) -> &mut Ledger {
		&mut self.guard
	}
}

#[derive(Debug)]
struct HeldFlag(Arc<AtomicBool>);

impl Drop for HeldFlag {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
		tracing::debug!("ledger.lock.released");
	}
}

#[cfg(test)]
mod tests {
	use scorekeep_bus::EditRecord;

	use super::*;

	#[test]
	fn second_acquire_fails_until_release() {
		let lock = LockCoordinator::new();
		let guard = lock.try_acquire().unwrap();
		assert!(lock.is_held());
		assert_eq!(lock.try_acquire().unwrap_err(), LockBusy);

		guard.release();
		assert!(!lock.is_held());
		assert!(lock.try_acquire().is_ok());
	}

	#[test]
	fn clones_share_state() {
		let lock = LockCoordinator::new();
		let other = lock.clone();
		{
			let mut guard = lock.try_acquire().unwrap();
			guard.merge(EditRecord {
				event_id: "evt-1".into(),
				scores: Default::default(),
			});
			assert!(other.try_acquire().is_err());
		}
		let guard = other.try_acquire().unwrap();
		assert!(guard.get("evt-1").is_some());
	}

	#[test]
	fn only_one_of_many_attempts_wins() {
		let lock = LockCoordinator::new();
		let attempts: Vec<_> = (0..8).map(|_| lock.try_acquire()).collect();
		assert_eq!(attempts.iter().filter(|a| a.is_ok()).count(), 1);
		assert_eq!(attempts.iter().filter(|a| a.is_err()).count(), 7);
	}

	#[tokio::test(flavor = "current_thread")]
	async fn guard_survives_suspension() {
		let lock = LockCoordinator::new();
		let guard = lock.try_acquire().unwrap();
		tokio::task::yield_now().await;
		assert!(lock.is_held());
		drop(guard);
		assert!(!lock.is_held());
	}
}
