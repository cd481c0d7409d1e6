//! Error types for the event bus wire boundary.

use thiserror::Error;

/// Errors raised while admitting wire events onto the bus.
#[derive(Debug, Error)]
pub enum BusError {
	/// The wire event name is not one of the known kinds.
	#[error("unknown event name: {0}")]
	UnknownEvent(String),

	/// The wire detail did not match the payload shape for its kind.
	#[error("malformed {name} payload: {source}")]
	MalformedPayload {
		/// Wire name of the rejected event.
		name: &'static str,
		/// Underlying decode error.
		#[source]
		source: serde_json::Error,
	},
}

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
