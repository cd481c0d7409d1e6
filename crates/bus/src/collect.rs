//! Form collection: turns a score form's fields into an [`EditRecord`].

use crate::bus::EventBus;
use crate::event::{BusEvent, EditRecord, ScoreRecord};

/// Position of the field identifier in a `-`-separated element id.
const FIELD_ID_SEGMENT: usize = 3;

/// One input element of a score form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
	/// Element id, shaped like `score-input-<event>-<field_id>`.
	pub element_id: String,
	pub value: String,
}

impl FormField {
	pub fn new(element_id: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			element_id: element_id.into(),
			value: value.into(),
		}
	}

	/// Field identifier carried in the element id, if the segment exists.
	///
	/// An empty segment is a valid (empty) identifier.
	pub fn field_id(&self) -> Option<&str> {
		self.element_id.split('-').nth(FIELD_ID_SEGMENT)
	}
}

/// Builds the edit record for form `form_id` from its fields.
///
/// Later fields with the same field identifier win. Fields without an
/// identifier segment are skipped.
pub fn collect_edit<'a>(form_id: &str, fields: impl IntoIterator<Item = &'a FormField>) -> EditRecord {
	let mut scores = ScoreRecord::new();
	for field in fields {
		match field.field_id() {
			Some(id) => {
				scores.insert(id.to_string(), field.value.clone());
			}
			None => tracing::debug!(element_id = %field.element_id, "form field without field id skipped"),
		}
	}
	EditRecord {
		event_id: form_id.to_string(),
		scores,
	}
}

/// Collects form `form_id` and publishes it as a score update.
///
/// Returns the number of subscribers that received it.
pub fn publish_edit<'a>(bus: &EventBus, form_id: &str, fields: impl IntoIterator<Item = &'a FormField>) -> usize {
	let record = collect_edit(form_id, fields);
	tracing::debug!(event_id = %record.event_id, fields = record.scores.len(), "submitting score to the manager");
	bus.publish(BusEvent::ScoreUpdate(record))
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use parking_lot::Mutex;
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::event::EventKind;

	#[test]
	fn field_id_is_fourth_segment() {
		assert_eq!(FormField::new("score-input-12-7", "3").field_id(), Some("7"));
		assert_eq!(FormField::new("score-input-12-7-extra", "3").field_id(), Some("7"));
		assert_eq!(FormField::new("score-input-12", "3").field_id(), None);
		assert_eq!(FormField::new("score-input-12-", "3").field_id(), Some(""));
	}

	#[test]
	fn empty_field_id_segment_is_kept() {
		let fields = [FormField::new("score-input-evt1-", "5"), FormField::new("score-input-evt1", "6")];
		let record = collect_edit("evt1", &fields);
		assert_eq!(record.scores, ScoreRecord::from([(String::new(), "5".into())]));
	}

	#[test]
	fn collects_fields_keyed_by_field_id() {
		let fields = [
			FormField::new("score-input-evt1-1", "10"),
			FormField::new("score-input-evt1-2", "7"),
			FormField::new("submit", "go"),
			FormField::new("score-input-evt1-1", "11"),
		];
		let record = collect_edit("evt1", &fields);
		assert_eq!(record.event_id, "evt1");
		assert_eq!(record.scores, ScoreRecord::from([("1".into(), "11".into()), ("2".into(), "7".into())]));
	}

	#[test]
	fn publish_edit_delivers_score_update() {
		let bus = EventBus::new();
		let seen = Arc::new(Mutex::new(None));
		let sink = Arc::clone(&seen);
		bus.subscribe(EventKind::ScoreUpdate, move |event| *sink.lock() = Some(event.clone()));

		let fields = [FormField::new("score-input-evt9-4", "2")];
		assert_eq!(publish_edit(&bus, "evt9", &fields), 1);

		let expected = BusEvent::ScoreUpdate(EditRecord {
			event_id: "evt9".into(),
			scores: ScoreRecord::from([("4".into(), "2".into())]),
		});
		assert_eq!(seen.lock().clone(), Some(expected));
	}
}
