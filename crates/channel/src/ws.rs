use std::sync::Once;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::transport::{ChannelConnection, ChannelTransport};
use crate::{ChannelError, Result};

/// Websocket transport over `tokio-tungstenite`.
///
/// `wss` targets use rustls with the ring provider and webpki roots.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

/// Installs the process-wide rustls crypto provider once.
fn init_crypto() {
	static CRYPTO_INIT: Once = Once::new();
	CRYPTO_INIT.call_once(|| {
		// Another component may have installed one already.
		let _ = rustls::crypto::ring::default_provider().install_default();
	});
}

#[async_trait]
impl ChannelTransport for WsTransport {
	async fn connect(&self, url: &Url) -> Result<Box<dyn ChannelConnection>> {
		if url.scheme() == "wss" {
			init_crypto();
		}
		let (stream, _response) = connect_async(url.as_str()).await.map_err(|e| ChannelError::Transport(e.to_string()))?;
		Ok(Box::new(WsConnection { stream }))
	}
}

struct WsConnection {
	stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl ChannelConnection for WsConnection {
	async fn recv(&mut self) -> Result<Option<String>> {
		loop {
			match self.stream.next().await {
				Some(Ok(Message::Text(text))) => return Ok(Some(text)),
				Some(Ok(Message::Close(_))) | None => return Ok(None),
				// Pings are answered by tungstenite on the next read or write.
				Some(Ok(Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
				Some(Err(err)) => return Err(ChannelError::Transport(err.to_string())),
			}
		}
	}

	async fn send(&mut self, text: String) -> Result<()> {
		self.stream.send(Message::Text(text)).await.map_err(|e| ChannelError::Transport(e.to_string()))
	}

	async fn close(&mut self) {
		let _ = self.stream.close(None).await;
	}
}
