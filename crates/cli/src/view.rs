//! Render consumer for pushed scoreboards.

use std::sync::Arc;

use parking_lot::Mutex;
use scorekeep_bus::{BusEvent, EventBus, EventKind, SubscriptionId};

/// Channel whose frames carry the rendered scoreboard.
pub const SCORES_CHANNEL: &str = "scores";

/// Holds the most recent scoreboard pushed on one channel.
///
/// Frames are stored as received; interpreting them is up to whoever
/// displays the content.
#[derive(Debug)]
pub struct ScoreboardView {
	bus: EventBus,
	subscription: SubscriptionId,
	content: Arc<Mutex<Option<String>>>,
}

impl ScoreboardView {
	pub fn attach(bus: &EventBus, channel: &str) -> Self {
		let content = Arc::new(Mutex::new(None));
		let target = Arc::clone(&content);
		let channel = channel.to_string();
		let subscription = bus.subscribe(EventKind::PushDelivery, move |event| {
			let BusEvent::PushDelivery(msg) = event else {
				return;
			};
			if msg.channel != channel {
				return;
			}
			*target.lock() = Some(msg.data.clone());
			tracing::info!(channel = %msg.channel, bytes = msg.data.len(), "updated scores");
		});
		Self {
			bus: bus.clone(),
			subscription,
			content,
		}
	}

	pub fn latest(&self) -> Option<String> {
		self.content.lock().clone()
	}
}

impl Drop for ScoreboardView {
	fn drop(&mut self) {
		self.bus.unsubscribe(self.subscription);
	}
}
