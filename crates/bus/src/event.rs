use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{BusError, Result};

/// One event's scores: field identifier to entered value.
pub type ScoreRecord = BTreeMap<String, String>;

/// A complete set of scores for one event, produced by a form collector.
///
/// Merged wholesale into the ledger, replacing any earlier record for the
/// same event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRecord {
	pub event_id: String,
	pub scores: ScoreRecord,
}

/// Request to flush pending scores and then move the page to new query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationRequest {
	/// Opaque query string applied after the flush.
	pub params: String,
}

/// A server-pushed frame, tagged with the channel it arrived on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
	pub channel: String,
	/// Frame text, passed through unmodified.
	pub data: String,
}

/// Discriminant of [`BusEvent`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
	ScoreUpdate,
	SafeRedirect,
	PushDelivery,
}

impl EventKind {
	/// All kinds, in declaration order.
	pub const ALL: [Self; 3] = [Self::ScoreUpdate, Self::SafeRedirect, Self::PushDelivery];

	/// Name used by external collaborators on the untyped wire form.
	pub const fn wire_name(self) -> &'static str {
		match self {
			Self::ScoreUpdate => "scoreUpdate",
			Self::SafeRedirect => "doSafeScoreRedirect",
			Self::PushDelivery => "wsmessage",
		}
	}

	/// Looks up a kind by its wire name.
	pub fn from_wire_name(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|kind| kind.wire_name() == name)
	}
}

/// Closed set of messages carried by the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
	/// A form collector submitted a record for one event.
	ScoreUpdate(EditRecord),
	/// Flush pending scores, then navigate.
	SafeRedirect(NavigationRequest),
	/// A push channel received a frame.
	PushDelivery(PushMessage),
}

impl BusEvent {
	pub fn kind(&self) -> EventKind {
		match self {
			Self::ScoreUpdate(_) => EventKind::ScoreUpdate,
			Self::SafeRedirect(_) => EventKind::SafeRedirect,
			Self::PushDelivery(_) => EventKind::PushDelivery,
		}
	}

	/// Validates an untyped wire event and converts it into a typed one.
	///
	/// # Errors
	///
	/// Returns [`BusError::UnknownEvent`] for unrecognized names and
	/// [`BusError::MalformedPayload`] when `detail` does not decode into the
	/// payload for that kind.
	pub fn from_wire(name: &str, detail: &str) -> Result<Self> {
		let kind = EventKind::from_wire_name(name).ok_or_else(|| BusError::UnknownEvent(name.to_string()))?;
		let malformed = |source| BusError::MalformedPayload { name: kind.wire_name(), source };
		Ok(match kind {
			EventKind::ScoreUpdate => Self::ScoreUpdate(serde_json::from_str(detail).map_err(malformed)?),
			EventKind::SafeRedirect => Self::SafeRedirect(serde_json::from_str(detail).map_err(malformed)?),
			EventKind::PushDelivery => Self::PushDelivery(serde_json::from_str(detail).map_err(malformed)?),
		})
	}
}
