use std::sync::Arc;
use std::time::Duration;

use scorekeep_bus::{BusEvent, EventBus, PushMessage};
use scorekeep_worker::{GenerationClock, TaskClass, delay, spawn};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::address::resolve_channel_url;
use crate::transport::{ChannelConnection, ChannelTransport};
use crate::{ChannelError, Result};

/// Fixed delay between losing a connection and the next connect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Path prefix that precedes the channel name in the connection target.
pub const DEFAULT_CHANNEL_PREFIX: &str = "/ws/";

const COMMAND_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
pub struct ChannelConfig {
	pub prefix: String,
	pub reconnect_delay: Duration,
}

impl Default for ChannelConfig {
	fn default() -> Self {
		Self {
			prefix: DEFAULT_CHANNEL_PREFIX.to_string(),
			reconnect_delay: DEFAULT_RECONNECT_DELAY,
		}
	}
}

/// Connection lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
	Connecting,
	Open,
	Closed,
}

/// Observable channel status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStatus {
	pub state: ChannelState,
	/// Connect attempt counter, bumped on every entry to `Connecting`.
	pub generation: u64,
}

/// Factory for channel subscriptions against one server.
#[derive(Clone)]
pub struct PushChannel {
	base: Url,
	transport: Arc<dyn ChannelTransport>,
	bus: EventBus,
	config: ChannelConfig,
}

impl std::fmt::Debug for PushChannel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PushChannel").field("base", &self.base).field("config", &self.config).finish_non_exhaustive()
	}
}

impl PushChannel {
	pub fn new(base: Url, transport: Arc<dyn ChannelTransport>, bus: EventBus, config: ChannelConfig) -> Self {
		Self {
			base,
			transport,
			bus,
			config,
		}
	}

	/// Starts a connection to channel `name`.
	///
	/// # Errors
	///
	/// Returns [`ChannelError::InvalidAddress`] if no target can be built for
	/// `name`, and [`ChannelError::ZeroReconnectDelay`] if the configured delay
	/// is zero. Nothing is started in either case.
	pub fn subscribe(&self, name: &str) -> Result<ChannelSubscription> {
		if self.config.reconnect_delay.is_zero() {
			return Err(ChannelError::ZeroReconnectDelay);
		}
		let url = resolve_channel_url(&self.base, &self.config.prefix, name)?;
		let (commands_tx, commands) = mpsc::channel(COMMAND_CAPACITY);
		let (status_tx, status) = watch::channel(ChannelStatus {
			state: ChannelState::Connecting,
			generation: 0,
		});
		let cancel = CancellationToken::new();

		let driver = Driver {
			name: name.to_string(),
			url: url.clone(),
			transport: Arc::clone(&self.transport),
			bus: self.bus.clone(),
			reconnect_delay: self.config.reconnect_delay,
			commands,
			status: status_tx,
			cancel: cancel.clone(),
			clock: GenerationClock::new(),
		};
		let task = spawn(TaskClass::Io, "channel.driver", driver.run());

		Ok(ChannelSubscription {
			name: name.to_string(),
			url,
			commands: commands_tx,
			status,
			cancel,
			task: Some(task),
		})
	}
}

/// A live channel: the pair of channel name and its connection driver.
///
/// Dropping the subscription tears it down; [`close`](Self::close) also waits
/// for the driver to finish.
#[derive(Debug)]
pub struct ChannelSubscription {
	name: String,
	url: Url,
	commands: mpsc::Sender<Command>,
	status: watch::Receiver<ChannelStatus>,
	cancel: CancellationToken,
	task: Option<JoinHandle<()>>,
}

impl ChannelSubscription {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn url(&self) -> &Url {
		&self.url
	}

	pub fn status(&self) -> ChannelStatus {
		*self.status.borrow()
	}

	/// Receiver that observes every status change.
	pub fn watch(&self) -> watch::Receiver<ChannelStatus> {
		self.status.clone()
	}

	/// Serializes `payload` as JSON and sends it as one text frame.
	///
	/// There is no outbound buffer: if no connection is open the payload is
	/// dropped.
	///
	/// # Errors
	///
	/// [`ChannelError::NotConnected`] when no connection is open,
	/// [`ChannelError::Closed`] after teardown, and transport errors from the
	/// write itself.
	pub async fn send<T: Serialize + ?Sized>(&self, payload: &T) -> Result<()> {
		let text = serde_json::to_string(payload)?;
		self.send_text(text).await
	}

	/// Sends `text` verbatim as one text frame.
	///
	/// # Errors
	///
	/// See [`send`](Self::send).
	pub async fn send_text(&self, text: String) -> Result<()> {
		if self.cancel.is_cancelled() {
			return Err(ChannelError::Closed);
		}
		if self.status.borrow().state != ChannelState::Open {
			return Err(ChannelError::NotConnected);
		}
		let (reply, outcome) = oneshot::channel();
		self.commands.send(Command::Send { text, reply }).await.map_err(|_| ChannelError::Closed)?;
		outcome.await.map_err(|_| ChannelError::Closed)?
	}

	/// Tears the channel down and waits for the driver to exit.
	pub async fn close(mut self) {
		self.cancel.cancel();
		if let Some(task) = self.task.take() {
			let _ = task.await;
		}
	}
}

impl Drop for ChannelSubscription {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}

enum Command {
	Send { text: String, reply: oneshot::Sender<Result<()>> },
}

impl Command {
	fn reject(self) {
		match self {
			Self::Send { reply, .. } => {
				let _ = reply.send(Err(ChannelError::NotConnected));
			}
		}
	}
}

enum PumpExit {
	Cancelled,
	Lost,
}

struct Driver {
	name: String,
	url: Url,
	transport: Arc<dyn ChannelTransport>,
	bus: EventBus,
	reconnect_delay: Duration,
	commands: mpsc::Receiver<Command>,
	status: watch::Sender<ChannelStatus>,
	cancel: CancellationToken,
	clock: GenerationClock,
}

impl Driver {
	async fn run(mut self) {
		loop {
			let generation = self.clock.next();
			self.set_state(ChannelState::Connecting, generation);

			let Some(connected) = self.connect().await else {
				break;
			};
			match connected {
				Ok(conn) => {
					self.set_state(ChannelState::Open, generation);
					tracing::info!(channel = %self.name, generation, "connected");
					if let PumpExit::Cancelled = self.pump(conn).await {
						break;
					}
				}
				Err(err) => {
					tracing::warn!(channel = %self.name, url = %self.url, error = %err, "connect failed");
				}
			}

			self.set_state(ChannelState::Closed, generation);
			tracing::info!(channel = %self.name, retry_in = ?self.reconnect_delay, "disconnected");
			if !self.wait_reconnect().await {
				break;
			}
			tracing::info!(channel = %self.name, "automatically reconnecting");
		}

		self.set_state(ChannelState::Closed, self.clock.current());
		tracing::debug!(channel = %self.name, "channel.driver.exit");
	}

	fn set_state(&self, state: ChannelState, generation: u64) {
		self.status.send_replace(ChannelStatus { state, generation });
	}

	/// Returns `None` when cancelled before the attempt finished.
	async fn connect(&mut self) -> Option<Result<Box<dyn ChannelConnection>>> {
		tracing::debug!(channel = %self.name, url = %self.url, "connecting");
		let attempt = self.transport.connect(&self.url);
		tokio::pin!(attempt);
		loop {
			tokio::select! {
				biased;
				_ = self.cancel.cancelled() => return None,
				result = &mut attempt => return Some(result),
				Some(cmd) = self.commands.recv() => cmd.reject(),
			}
		}
	}

	async fn pump(&mut self, mut conn: Box<dyn ChannelConnection>) -> PumpExit {
		loop {
			tokio::select! {
				biased;
				_ = self.cancel.cancelled() => {
					conn.close().await;
					return PumpExit::Cancelled;
				}
				Some(cmd) = self.commands.recv() => {
					let Command::Send { text, reply } = cmd;
					let result = conn.send(text).await;
					let lost = result.is_err();
					if let Err(err) = &result {
						tracing::warn!(channel = %self.name, error = %err, "send failed");
					}
					let _ = reply.send(result);
					if lost {
						return PumpExit::Lost;
					}
				}
				frame = conn.recv() => match frame {
					Ok(Some(data)) => {
						tracing::debug!(channel = %self.name, bytes = data.len(), "received");
						self.bus.publish(BusEvent::PushDelivery(PushMessage {
							channel: self.name.clone(),
							data,
						}));
					}
					Ok(None) => return PumpExit::Lost,
					Err(err) => {
						tracing::warn!(channel = %self.name, error = %err, "connection error");
						return PumpExit::Lost;
					}
				},
			}
		}
	}

	/// Waits out the reconnect delay. Returns `false` when cancelled first.
	async fn wait_reconnect(&mut self) -> bool {
		let timer = delay(self.reconnect_delay);
		tokio::pin!(timer);
		loop {
			tokio::select! {
				biased;
				_ = self.cancel.cancelled() => return false,
				_ = &mut timer => return true,
				Some(cmd) = self.commands.recv() => cmd.reject(),
			}
		}
	}
}

#[cfg(test)]
mod tests;
