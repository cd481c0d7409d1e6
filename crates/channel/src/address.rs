use url::Url;

use crate::{ChannelError, Result};

/// Builds the connection target for channel `name`.
///
/// The page scheme maps onto its websocket counterpart (`http` to `ws`,
/// `https` to `wss`); host and port are kept and the path becomes
/// `prefix` followed by the channel name. Query and fragment are dropped.
pub fn resolve_channel_url(base: &Url, prefix: &str, name: &str) -> Result<Url> {
	if name.is_empty() || name.contains(['/', '?', '#']) {
		return Err(ChannelError::InvalidAddress(format!("bad channel name {name:?}")));
	}
	let scheme = match base.scheme() {
		"http" | "ws" => "ws",
		"https" | "wss" => "wss",
		other => return Err(ChannelError::InvalidAddress(format!("unsupported scheme {other:?}"))),
	};
	let host = base.host_str().ok_or_else(|| ChannelError::InvalidAddress(format!("{base} has no host")))?;

	let mut target = format!("{scheme}://{host}");
	if let Some(port) = base.port() {
		target.push_str(&format!(":{port}"));
	}
	if !prefix.starts_with('/') {
		target.push('/');
	}
	target.push_str(prefix);
	if !prefix.ends_with('/') {
		target.push('/');
	}
	target.push_str(name);

	Url::parse(&target).map_err(|e| ChannelError::InvalidAddress(e.to_string()))
}
