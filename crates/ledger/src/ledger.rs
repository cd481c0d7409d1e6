use std::collections::BTreeMap;

use scorekeep_bus::{EditRecord, ScoreRecord};
use serde::{Deserialize, Serialize};

/// Pending score edits keyed by event identifier.
///
/// Serializes as a plain JSON object, `event_id -> (field_id -> value)`. The
/// empty ledger means nothing is pending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
	entries: BTreeMap<String, ScoreRecord>,
}

impl Ledger {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores `edit` under its event id, replacing any earlier record whole.
	pub fn merge(&mut self, edit: EditRecord) {
		self.entries.insert(edit.event_id, edit.scores);
	}

	pub fn get(&self, event_id: &str) -> Option<&ScoreRecord> {
		self.entries.get(event_id)
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &ScoreRecord)> {
		self.entries.iter().map(|(id, record)| (id.as_str(), record))
	}

	/// Submission body for the score endpoint.
	pub fn to_json(&self) -> serde_json::Result<String> {
		serde_json::to_string(self)
	}
}
