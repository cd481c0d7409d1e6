//! Error types for ledger synchronization.

use thiserror::Error;

/// The ledger lock is already held by another trigger.
///
/// This is the expected contention outcome: the caller abandons its attempt
/// and relies on a later trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("ledger lock is held")]
pub struct LockBusy;

/// Errors from ledger synchronization.
#[derive(Debug, Error)]
pub enum SyncError {
	/// The ledger lock was held.
	#[error(transparent)]
	LockBusy(#[from] LockBusy),

	/// The server answered with something other than `204 No Content`.
	#[error("score submission rejected with status {status}")]
	FlushRejected {
		/// HTTP status code.
		status: u16,
		/// Response body, kept for diagnostics.
		body: String,
	},

	/// The request never produced a response.
	#[error("transport failure: {0}")]
	Transport(String),

	/// The periodic flush was configured with a zero interval.
	#[error("flush interval must be non-zero")]
	ZeroFlushInterval,

	/// The ledger could not be serialized.
	#[error("failed to encode ledger: {0}")]
	Encode(#[from] serde_json::Error),
}

/// Result type for ledger synchronization.
pub type Result<T> = std::result::Result<T, SyncError>;
