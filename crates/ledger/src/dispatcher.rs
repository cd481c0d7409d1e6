//! Trigger handling for the ledger: edits, navigation and the periodic flush.

use std::sync::Arc;
use std::time::Duration;

use scorekeep_bus::{BusEvent, EditRecord, EventBus, EventKind, SubscriptionId};
use scorekeep_worker::{TaskClass, periodic, runtime_handle, spawn_on};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{LockBusy, Result, SyncError};
use crate::lock::{LedgerGuard, LockCoordinator};
use crate::navigator::Navigator;
use crate::sync::{FlushOutcome, SyncClient};

/// Fixed interval between periodic flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
	pub flush_interval: Duration,
}

impl Default for DispatcherConfig {
	fn default() -> Self {
		Self {
			flush_interval: DEFAULT_FLUSH_INTERVAL,
		}
	}
}

/// What happened to one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
	/// The trigger took the lock and ran its critical section.
	Applied,
	/// The lock was held; the trigger was dropped.
	LockBusy,
}

/// Reacts to edits, navigation requests and periodic ticks.
///
/// Holds no state of its own beyond the lock: `Busy` is exactly "a
/// [`LedgerGuard`] is alive".
pub struct UpdateDispatcher {
	lock: LockCoordinator,
	client: SyncClient,
	navigator: Arc<dyn Navigator>,
	config: DispatcherConfig,
}

impl std::fmt::Debug for UpdateDispatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("UpdateDispatcher")
			.field("lock", &self.lock)
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}

impl UpdateDispatcher {
	pub fn new(lock: LockCoordinator, client: SyncClient, navigator: Arc<dyn Navigator>, config: DispatcherConfig) -> Arc<Self> {
		Arc::new(Self {
			lock,
			client,
			navigator,
			config,
		})
	}

	pub fn lock(&self) -> &LockCoordinator {
		&self.lock
	}

	/// Merges `edit` into the ledger, or drops it if the lock is held.
	pub fn on_edit(&self, edit: EditRecord) -> TriggerOutcome {
		let Ok(mut guard) = self.lock.try_acquire() else {
			tracing::debug!(event_id = %edit.event_id, "ledger locked, edit dropped");
			return TriggerOutcome::LockBusy;
		};
		tracing::trace!(event_id = %edit.event_id, "ledger.merge");
		guard.merge(edit);
		TriggerOutcome::Applied
	}

	/// Flushes a non-empty ledger, then navigates to `params`.
	///
	/// Navigation happens whatever the flush outcome. If the lock is held the
	/// whole request is dropped, navigation included.
	pub async fn on_navigate(&self, params: &str) -> TriggerOutcome {
		match self.begin_navigate(params) {
			Some(guard) => {
				self.navigate_locked(guard, params).await;
				TriggerOutcome::Applied
			}
			None => TriggerOutcome::LockBusy,
		}
	}

	/// Flushes the ledger unconditionally, even when empty.
	pub async fn on_tick(&self) -> TriggerOutcome {
		match self.begin_tick() {
			Some(guard) => {
				self.flush_locked(guard).await;
				TriggerOutcome::Applied
			}
			None => TriggerOutcome::LockBusy,
		}
	}

	/// Takes the lock for a navigation request, or drops the request.
	fn begin_navigate(&self, params: &str) -> Option<LedgerGuard> {
		match self.lock.try_acquire() {
			Ok(guard) => Some(guard),
			Err(LockBusy) => {
				tracing::debug!(params, "ledger locked, navigation dropped");
				None
			}
		}
	}

	/// Takes the lock for a periodic flush, or skips this tick.
	fn begin_tick(&self) -> Option<LedgerGuard> {
		match self.lock.try_acquire() {
			Ok(guard) => Some(guard),
			Err(LockBusy) => {
				tracing::debug!(retry_in = ?self.config.flush_interval, "data locked, will try again");
				None
			}
		}
	}

	async fn navigate_locked(&self, mut guard: LedgerGuard, params: &str) {
		if !guard.is_empty() {
			let outcome = self.client.flush(&mut guard).await;
			tracing::debug!(?outcome, "flushed before navigation");
		}
		self.navigator.set_query(params);
		guard.release();
	}

	async fn flush_locked(&self, mut guard: LedgerGuard) -> FlushOutcome {
		let outcome = self.client.flush(&mut guard).await;
		guard.release();
		outcome
	}

	/// Subscribes to edits and navigation requests on `bus` and starts the
	/// periodic flush on the current runtime.
	///
	/// Each trigger takes the lock synchronously, at publish or tick time,
	/// before any suspension; only the locked work is spawned.
	///
	/// # Errors
	///
	/// Returns [`SyncError::LockBusy`] without subscribing or starting the
	/// tick when the lock is already held, and
	/// [`SyncError::ZeroFlushInterval`] when the configured interval is zero.
	///
	/// Outside a Tokio runtime the work lands on the shared worker runtime.
	pub fn activate(self: &Arc<Self>, bus: &EventBus) -> Result<DispatcherHandle> {
		if self.config.flush_interval.is_zero() {
			tracing::warn!("flush interval is zero, dispatcher not activated");
			return Err(SyncError::ZeroFlushInterval);
		}
		if self.lock.is_held() {
			tracing::warn!("failed to obtain lock, dispatcher not activated");
			return Err(LockBusy.into());
		}

		let runtime = runtime_handle();
		let cancel = CancellationToken::new();

		let edits = {
			let this = Arc::clone(self);
			bus.subscribe(EventKind::ScoreUpdate, move |event| {
				if let BusEvent::ScoreUpdate(edit) = event {
					this.on_edit(edit.clone());
				}
			})
		};

		let navigation = {
			let this = Arc::clone(self);
			let runtime = runtime.clone();
			bus.subscribe(EventKind::SafeRedirect, move |event| {
				let BusEvent::SafeRedirect(request) = event else {
					return;
				};
				let Some(guard) = this.begin_navigate(&request.params) else {
					return;
				};
				let this = Arc::clone(&this);
				let params = request.params.clone();
				spawn_on(&runtime, TaskClass::Trigger, "dispatcher.navigate", async move {
					this.navigate_locked(guard, &params).await;
				});
			})
		};

		let ticker = {
			let this = Arc::clone(self);
			let cancel = cancel.clone();
			let task_runtime = runtime.clone();
			spawn_on(&runtime, TaskClass::Timer, "dispatcher.tick", async move {
				let mut ticks = periodic(this.config.flush_interval);
				loop {
					tokio::select! {
						biased;
						_ = cancel.cancelled() => break,
						_ = ticks.tick() => {}
					}
					if let Some(guard) = this.begin_tick() {
						let this = Arc::clone(&this);
						spawn_on(&task_runtime, TaskClass::Trigger, "dispatcher.flush", async move {
							this.flush_locked(guard).await;
						});
					}
				}
			})
		};

		tracing::info!(interval = ?self.config.flush_interval, "score dispatcher activated");
		Ok(DispatcherHandle {
			bus: bus.clone(),
			subscriptions: vec![edits, navigation],
			cancel,
			ticker: Some(ticker),
		})
	}
}

/// Live dispatcher wiring: bus subscriptions and the periodic tick.
///
/// Dropping the handle detaches it; [`shutdown`](Self::shutdown) also waits
/// for the tick loop to exit. Flushes already in flight run to completion.
#[derive(Debug)]
pub struct DispatcherHandle {
	bus: EventBus,
	subscriptions: Vec<SubscriptionId>,
	cancel: CancellationToken,
	ticker: Option<JoinHandle<()>>,
}

impl DispatcherHandle {
	pub fn is_active(&self) -> bool {
		!self.cancel.is_cancelled()
	}

	/// Unsubscribes from the bus, stops the tick and waits for it to exit.
	pub async fn shutdown(mut self) {
		self.detach();
		if let Some(ticker) = self.ticker.take() {
			let _ = ticker.await;
		}
	}

	fn detach(&mut self) {
		for id in self.subscriptions.drain(..) {
			self.bus.unsubscribe(id);
		}
		self.cancel.cancel();
	}
}

impl Drop for DispatcherHandle {
	fn drop(&mut self) {
		self.detach();
	}
}
