use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::event::{BusEvent, EventKind};
use crate::Result;

type Handler = Arc<dyn Fn(&BusEvent) + Send + Sync>;

/// Identifies one subscription for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscriber {
	id: SubscriptionId,
	handler: Handler,
}

#[derive(Default)]
struct Registry {
	next_id: u64,
	by_kind: HashMap<EventKind, Vec<Subscriber>>,
}

/// Publish/subscribe registry keyed by [`EventKind`].
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct EventBus {
	registry: Arc<RwLock<Registry>>,
}

impl std::fmt::Debug for EventBus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let registry = self.registry.read();
		let counts: HashMap<_, _> = registry.by_kind.iter().map(|(kind, subs)| (*kind, subs.len())).collect();
		f.debug_struct("EventBus").field("subscribers", &counts).finish()
	}
}

impl EventBus {
	/// Creates an isolated bus.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the process-wide bus.
	pub fn global() -> &'static EventBus {
		static GLOBAL: OnceLock<EventBus> = OnceLock::new();
		GLOBAL.get_or_init(EventBus::new)
	}

	/// Registers `handler` for events of `kind`.
	///
	/// Handlers run synchronously on the publishing task and must not block.
	pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
	where
		F: Fn(&BusEvent) + Send + Sync + 'static,
	{
		let mut registry = self.registry.write();
		registry.next_id += 1;
		let id = SubscriptionId(registry.next_id);
		registry.by_kind.entry(kind).or_default().push(Subscriber {
			id,
			handler: Arc::new(handler),
		});
		tracing::trace!(?kind, id = id.0, "bus.subscribe");
		id
	}

	/// Removes a subscription. Returns `false` if it was already gone.
	pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
		let mut registry = self.registry.write();
		for subscribers in registry.by_kind.values_mut() {
			if let Some(pos) = subscribers.iter().position(|sub| sub.id == id) {
				subscribers.remove(pos);
				tracing::trace!(id = id.0, "bus.unsubscribe");
				return true;
			}
		}
		false
	}

	/// Number of subscribers currently registered for `kind`.
	pub fn subscriber_count(&self, kind: EventKind) -> usize {
		self.registry.read().by_kind.get(&kind).map_or(0, Vec::len)
	}

	/// Delivers `event` to every subscriber of its kind, in registration order.
	///
	/// The subscriber list is snapshotted before delivery: handlers may
	/// subscribe or unsubscribe while running, and those changes apply from the
	/// next publish. Returns the number of handlers invoked.
	pub fn publish(&self, event: BusEvent) -> usize {
		let kind = event.kind();
		let handlers: Vec<Handler> = {
			let registry = self.registry.read();
			registry.by_kind.get(&kind).map(|subs| subs.iter().map(|sub| Arc::clone(&sub.handler)).collect()).unwrap_or_default()
		};
		tracing::trace!(?kind, subscribers = handlers.len(), "bus.publish");
		for handler in &handlers {
			handler(&event);
		}
		handlers.len()
	}

	/// Validates an untyped wire event and publishes it.
	///
	/// # Errors
	///
	/// Returns the validation error from [`BusEvent::from_wire`]; nothing is
	/// delivered in that case.
	pub fn publish_wire(&self, name: &str, detail: &str) -> Result<usize> {
		match BusEvent::from_wire(name, detail) {
			Ok(event) => Ok(self.publish(event)),
			Err(err) => {
				tracing::warn!(name, error = %err, "bus.reject");
				Err(err)
			}
		}
	}
}
