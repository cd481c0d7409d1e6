//! Client configuration loaded from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading the configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// The file is not valid TOML or has unexpected fields.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// An interval that drives a timer was set to zero.
	#[error("{field} must be greater than zero")]
	ZeroInterval {
		/// Name of the offending field.
		field: &'static str,
	},

	/// A derived URL could not be built.
	#[error("invalid URL: {0}")]
	Url(#[from] url::ParseError),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
	/// Page origin; both the submit endpoint and channel targets derive from it.
	pub server: Url,
	pub submit_path: String,
	pub channel_prefix: String,
	pub channels: Vec<String>,
	pub flush_interval_ms: u64,
	pub reconnect_delay_ms: u64,
	pub request_timeout_ms: u64,
	/// Query state the page starts with.
	pub initial_query: String,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			server: Url::parse("http://127.0.0.1:8080/").expect("static URL is valid"),
			submit_path: "/set_scores".to_string(),
			channel_prefix: "/ws/".to_string(),
			channels: vec!["scores".to_string()],
			flush_interval_ms: 5_000,
			reconnect_delay_ms: 5_000,
			request_timeout_ms: 10_000,
			initial_query: String::new(),
		}
	}
}

impl ClientConfig {
	/// Reads a config file; missing fields take their defaults.
	pub fn load(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::parse(&text)
	}

	/// Parses and validates a config document.
	pub fn parse(text: &str) -> Result<Self> {
		let config: Self = toml::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	fn validate(&self) -> Result<()> {
		for (field, value) in [
			("flush_interval_ms", self.flush_interval_ms),
			("reconnect_delay_ms", self.reconnect_delay_ms),
			("request_timeout_ms", self.request_timeout_ms),
		] {
			if value == 0 {
				return Err(ConfigError::ZeroInterval { field });
			}
		}
		Ok(())
	}

	/// Applies command line overrides. Extra channels are appended once.
	pub fn apply_overrides(&mut self, server: Option<Url>, channels: Vec<String>) {
		if let Some(server) = server {
			self.server = server;
		}
		for channel in channels {
			if !self.channels.contains(&channel) {
				self.channels.push(channel);
			}
		}
	}

	pub fn submit_url(&self) -> Result<Url> {
		Ok(self.server.join(&self.submit_path)?)
	}

	pub fn flush_interval(&self) -> Duration {
		Duration::from_millis(self.flush_interval_ms)
	}

	pub fn reconnect_delay(&self) -> Duration {
		Duration::from_millis(self.reconnect_delay_ms)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}
}
