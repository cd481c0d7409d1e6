//! Error types for push channels.

use thiserror::Error;

/// Errors from push channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
	/// Connecting, reading or writing failed.
	#[error("channel transport failure: {0}")]
	Transport(String),

	/// No connection is open right now.
	#[error("channel is not connected")]
	NotConnected,

	/// The subscription was torn down.
	#[error("channel is closed")]
	Closed,

	/// The channel address could not be built.
	#[error("invalid channel address: {0}")]
	InvalidAddress(String),

	/// The reconnect delay was configured as zero.
	#[error("reconnect delay must be non-zero")]
	ZeroReconnectDelay,

	/// An outbound payload could not be serialized.
	#[error("failed to encode payload: {0}")]
	Encode(#[from] serde_json::Error),
}

/// Result type for push channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
