use async_trait::async_trait;
use url::Url;

use crate::Result;

/// Opens connections for push channels.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
	/// Connects to `url`.
	///
	/// # Errors
	///
	/// Returns [`ChannelError::Transport`](crate::ChannelError::Transport) when
	/// the connection cannot be established.
	async fn connect(&self, url: &Url) -> Result<Box<dyn ChannelConnection>>;
}

/// One established push connection.
#[async_trait]
pub trait ChannelConnection: Send {
	/// Waits for the next text frame.
	///
	/// Returns `Ok(None)` once the peer has closed. Must be cancel-safe: a
	/// dropped call loses no text frame.
	async fn recv(&mut self) -> Result<Option<String>>;

	/// Sends one text frame.
	async fn send(&mut self, text: String) -> Result<()>;

	/// Closes the connection. Errors are ignored.
	async fn close(&mut self);
}
