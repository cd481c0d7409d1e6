//! Flushing the ledger to the score submission endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::error::{Result, SyncError};
use crate::ledger::Ledger;

/// The only status that confirms a submission.
const NO_CONTENT: u16 = 204;

/// Raw answer from the score endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkResponse {
	pub status: u16,
	pub body: String,
}

/// Transport that delivers a serialized ledger to the server.
#[async_trait]
pub trait ScoreSink: Send + Sync {
	/// Sends `body` and returns whatever the server answered.
	///
	/// # Errors
	///
	/// Returns [`SyncError::Transport`] when no response was received.
	async fn submit(&self, body: String) -> Result<SinkResponse>;
}

/// [`ScoreSink`] that POSTs JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpScoreSink {
	client: reqwest::Client,
	endpoint: Url,
}

impl HttpScoreSink {
	/// Builds a sink posting to `endpoint`, giving up on requests after `timeout`.
	///
	/// # Errors
	///
	/// Returns [`SyncError::Transport`] if the HTTP client cannot be built.
	pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
		let client = reqwest::Client::builder().timeout(timeout).build().map_err(|e| SyncError::Transport(e.to_string()))?;
		Ok(Self { client, endpoint })
	}

	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}
}

#[async_trait]
impl ScoreSink for HttpScoreSink {
	async fn submit(&self, body: String) -> Result<SinkResponse> {
		let response = self
			.client
			.post(self.endpoint.clone())
			.header(CONTENT_TYPE, "application/json")
			.body(body)
			.send()
			.await
			.map_err(|e| SyncError::Transport(e.to_string()))?;

		let status = response.status().as_u16();
		let body = match response.text().await {
			Ok(body) => body,
			Err(e) => {
				tracing::debug!(status, error = %e, "failed to read score endpoint response body");
				String::new()
			}
		};
		Ok(SinkResponse { status, body })
	}
}

/// Result of one flush, after it has been logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
	/// The server confirmed the submission and the ledger was cleared.
	Cleared,
	/// The server answered with another status. The ledger is unchanged.
	Rejected { status: u16, body: String },
	/// No response was obtained. The ledger is unchanged.
	TransportFailed(String),
}

impl FlushOutcome {
	pub fn is_cleared(&self) -> bool {
		matches!(self, Self::Cleared)
	}
}

/// Sends the ledger and decides whether it may be cleared.
///
/// Never retries; the periodic tick is the retry.
#[derive(Clone)]
pub struct SyncClient {
	sink: Arc<dyn ScoreSink>,
}

impl std::fmt::Debug for SyncClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SyncClient").finish_non_exhaustive()
	}
}

impl SyncClient {
	pub fn new(sink: Arc<dyn ScoreSink>) -> Self {
		Self { sink }
	}

	/// Submits the ledger once.
	///
	/// # Errors
	///
	/// [`SyncError::FlushRejected`] for any status other than `204`,
	/// [`SyncError::Transport`] when no response arrived and
	/// [`SyncError::Encode`] if the ledger cannot be serialized.
	pub async fn submit(&self, ledger: &Ledger) -> Result<()> {
		let body = ledger.to_json()?;
		let response = self.sink.submit(body).await?;
		if response.status == NO_CONTENT {
			Ok(())
		} else {
			Err(SyncError::FlushRejected {
				status: response.status,
				body: response.body,
			})
		}
	}

	/// Submits the ledger and clears it if the server confirmed.
	///
	/// Failures are logged and reported in the outcome; they never propagate.
	pub async fn flush(&self, ledger: &mut Ledger) -> FlushOutcome {
		match self.submit(ledger).await {
			Ok(()) => {
				tracing::debug!(events = ledger.len(), "ledger.flush.cleared");
				ledger.clear();
				FlushOutcome::Cleared
			}
			Err(SyncError::FlushRejected { status, body }) => {
				tracing::warn!(status, %body, "set scores failed");
				FlushOutcome::Rejected { status, body }
			}
			Err(err) => {
				tracing::warn!(error = %err, "score flush failed");
				FlushOutcome::TransportFailed(err.to_string())
			}
		}
	}
}
