use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use scorekeep_bus::EventKind;
use tokio::time::Instant;

use super::*;

enum Frame {
	Text(String),
	Close,
	Error,
}

/// Server end of one fake connection.
struct FakeServer {
	inbound: mpsc::UnboundedSender<Frame>,
	outbound: mpsc::UnboundedReceiver<String>,
	closed_by_client: Arc<AtomicBool>,
}

impl FakeServer {
	fn push(&self, text: &str) {
		let _ = self.inbound.send(Frame::Text(text.to_string()));
	}

	fn hang_up(&self) {
		let _ = self.inbound.send(Frame::Close);
	}

	fn fail(&self) {
		let _ = self.inbound.send(Frame::Error);
	}
}

struct FakeConnection {
	inbound: mpsc::UnboundedReceiver<Frame>,
	outbound: mpsc::UnboundedSender<String>,
	closed_by_client: Arc<AtomicBool>,
}

#[async_trait]
impl ChannelConnection for FakeConnection {
	async fn recv(&mut self) -> Result<Option<String>> {
		match self.inbound.recv().await {
			Some(Frame::Text(text)) => Ok(Some(text)),
			Some(Frame::Close) | None => Ok(None),
			Some(Frame::Error) => Err(ChannelError::Transport("reset by peer".into())),
		}
	}

	async fn send(&mut self, text: String) -> Result<()> {
		self.outbound.send(text).map_err(|_| ChannelError::Transport("peer gone".into()))
	}

	async fn close(&mut self) {
		self.closed_by_client.store(true, Ordering::SeqCst);
	}
}

/// Accepts or refuses connections according to a script; accepts when the
/// script is exhausted.
struct FakeTransport {
	refusals: Mutex<VecDeque<bool>>,
	attempts: Mutex<Vec<(Instant, Url)>>,
	servers: mpsc::UnboundedSender<FakeServer>,
}

impl FakeTransport {
	fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FakeServer>) {
		let (servers, accepted) = mpsc::unbounded_channel();
		let transport = Arc::new(Self {
			refusals: Mutex::new(VecDeque::new()),
			attempts: Mutex::new(Vec::new()),
			servers,
		});
		(transport, accepted)
	}

	fn refuse_next(&self, count: usize) {
		self.refusals.lock().extend(std::iter::repeat_n(true, count));
	}

	fn attempt_count(&self) -> usize {
		self.attempts.lock().len()
	}

	fn attempt_times(&self, origin: Instant) -> Vec<Duration> {
		self.attempts.lock().iter().map(|(at, _)| at.duration_since(origin)).collect()
	}
}

#[async_trait]
impl ChannelTransport for FakeTransport {
	async fn connect(&self, url: &Url) -> Result<Box<dyn ChannelConnection>> {
		self.attempts.lock().push((Instant::now(), url.clone()));
		if self.refusals.lock().pop_front().unwrap_or(false) {
			return Err(ChannelError::Transport("connection refused".into()));
		}
		let (inbound_tx, inbound) = mpsc::unbounded_channel();
		let (outbound, outbound_rx) = mpsc::unbounded_channel();
		let closed_by_client = Arc::new(AtomicBool::new(false));
		let _ = self.servers.send(FakeServer {
			inbound: inbound_tx,
			outbound: outbound_rx,
			closed_by_client: Arc::clone(&closed_by_client),
		});
		Ok(Box::new(FakeConnection {
			inbound,
			outbound,
			closed_by_client,
		}))
	}
}

fn push_channel(transport: &Arc<FakeTransport>, bus: &EventBus) -> PushChannel {
	push_channel_with(transport, bus, ChannelConfig::default())
}

fn push_channel_with(transport: &Arc<FakeTransport>, bus: &EventBus, config: ChannelConfig) -> PushChannel {
	PushChannel::new(
		Url::parse("http://scores.local:8080/").unwrap(),
		Arc::clone(transport) as Arc<dyn ChannelTransport>,
		bus.clone(),
		config,
	)
}

fn record_deliveries(bus: &EventBus) -> Arc<Mutex<Vec<PushMessage>>> {
	let seen = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&seen);
	bus.subscribe(EventKind::PushDelivery, move |event| {
		if let BusEvent::PushDelivery(msg) = event {
			sink.lock().push(msg.clone());
		}
	});
	seen
}

async fn wait_for_state(sub: &ChannelSubscription, state: ChannelState) {
	let mut status = sub.watch();
	status.wait_for(|s| s.state == state).await.expect("driver alive");
}

async fn settle() {
	for _ in 0..8 {
		tokio::task::yield_now().await;
	}
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn frames_are_republished_verbatim_with_channel_tag() {
	let bus = EventBus::new();
	let seen = record_deliveries(&bus);
	let (transport, mut servers) = FakeTransport::new();
	let sub = push_channel(&transport, &bus).subscribe("scores").unwrap();

	let server = servers.recv().await.unwrap();
	wait_for_state(&sub, ChannelState::Open).await;
	assert_eq!(transport.attempts.lock()[0].1.as_str(), "ws://scores.local:8080/ws/scores");

	server.push("<table><tr><td>1</td></tr></table>");
	server.push("not { json");
	settle().await;

	assert_eq!(
		*seen.lock(),
		vec![
			PushMessage {
				channel: "scores".into(),
				data: "<table><tr><td>1</td></tr></table>".into(),
			},
			PushMessage {
				channel: "scores".into(),
				data: "not { json".into(),
			},
		]
	);
	sub.close().await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn one_reconnect_after_fixed_delay() {
	let bus = EventBus::new();
	let (transport, mut servers) = FakeTransport::new();
	let origin = Instant::now();
	let sub = push_channel(&transport, &bus).subscribe("scores").unwrap();

	let first = servers.recv().await.unwrap();
	wait_for_state(&sub, ChannelState::Open).await;
	first.hang_up();
	wait_for_state(&sub, ChannelState::Closed).await;
	let closed_at = Instant::now();

	tokio::time::sleep(Duration::from_millis(4_900)).await;
	assert_eq!(transport.attempt_count(), 1);

	let _second = servers.recv().await.unwrap();
	wait_for_state(&sub, ChannelState::Open).await;
	assert_eq!(transport.attempt_count(), 2);
	assert_eq!(transport.attempt_times(origin)[1], closed_at.duration_since(origin) + DEFAULT_RECONNECT_DELAY);

	// A healthy connection schedules nothing further.
	tokio::time::sleep(Duration::from_secs(60)).await;
	assert_eq!(transport.attempt_count(), 2);
	assert_eq!(sub.status().generation, 2);
	sub.close().await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn refused_connects_retry_at_fixed_interval() {
	let bus = EventBus::new();
	let (transport, mut servers) = FakeTransport::new();
	transport.refuse_next(3);
	let origin = Instant::now();
	let sub = push_channel(&transport, &bus).subscribe("scores").unwrap();

	let _server = servers.recv().await.unwrap();
	wait_for_state(&sub, ChannelState::Open).await;

	let spacing = DEFAULT_RECONNECT_DELAY;
	assert_eq!(transport.attempt_times(origin), vec![Duration::ZERO, spacing, spacing * 2, spacing * 3]);
	sub.close().await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn stream_error_counts_as_close() {
	let bus = EventBus::new();
	let (transport, mut servers) = FakeTransport::new();
	let sub = push_channel(&transport, &bus).subscribe("scores").unwrap();

	let first = servers.recv().await.unwrap();
	wait_for_state(&sub, ChannelState::Open).await;
	first.fail();
	wait_for_state(&sub, ChannelState::Closed).await;

	let _second = servers.recv().await.unwrap();
	assert_eq!(transport.attempt_count(), 2);
	sub.close().await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn teardown_cancels_pending_reconnect() {
	let bus = EventBus::new();
	let (transport, mut servers) = FakeTransport::new();
	let sub = push_channel(&transport, &bus).subscribe("scores").unwrap();

	let first = servers.recv().await.unwrap();
	wait_for_state(&sub, ChannelState::Open).await;
	first.hang_up();
	wait_for_state(&sub, ChannelState::Closed).await;

	sub.close().await;
	tokio::time::sleep(Duration::from_secs(30)).await;
	assert_eq!(transport.attempt_count(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn dropping_subscription_closes_open_connection() {
	let bus = EventBus::new();
	let seen = record_deliveries(&bus);
	let (transport, mut servers) = FakeTransport::new();
	let sub = push_channel(&transport, &bus).subscribe("scores").unwrap();

	let server = servers.recv().await.unwrap();
	wait_for_state(&sub, ChannelState::Open).await;
	drop(sub);
	settle().await;

	assert!(server.closed_by_client.load(Ordering::SeqCst));
	server.push("late");
	tokio::time::sleep(Duration::from_secs(30)).await;
	assert!(seen.lock().is_empty());
	assert_eq!(transport.attempt_count(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn send_serializes_payload_when_open() {
	let bus = EventBus::new();
	let (transport, mut servers) = FakeTransport::new();
	let sub = push_channel(&transport, &bus).subscribe("scores").unwrap();

	let mut server = servers.recv().await.unwrap();
	wait_for_state(&sub, ChannelState::Open).await;

	sub.send(&serde_json::json!({ "refresh": true })).await.unwrap();
	assert_eq!(server.outbound.recv().await.unwrap(), r#"{"refresh":true}"#);
	sub.close().await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn send_without_connection_fails_fast() {
	let bus = EventBus::new();
	let (transport, mut servers) = FakeTransport::new();
	let sub = push_channel(&transport, &bus).subscribe("scores").unwrap();

	let first = servers.recv().await.unwrap();
	wait_for_state(&sub, ChannelState::Open).await;
	first.hang_up();
	wait_for_state(&sub, ChannelState::Closed).await;

	let err = sub.send(&serde_json::json!({})).await.unwrap_err();
	assert!(matches!(err, ChannelError::NotConnected));
	sub.close().await;
}

#[tokio::test(flavor = "current_thread")]
async fn invalid_channel_name_starts_nothing() {
	let bus = EventBus::new();
	let (transport, _servers) = FakeTransport::new();
	let err = push_channel(&transport, &bus).subscribe("").unwrap_err();
	assert!(matches!(err, ChannelError::InvalidAddress(_)));
	settle().await;
	assert_eq!(transport.attempt_count(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn zero_reconnect_delay_is_refused() {
	let bus = EventBus::new();
	let (transport, _servers) = FakeTransport::new();
	let config = ChannelConfig {
		reconnect_delay: Duration::ZERO,
		..ChannelConfig::default()
	};
	let err = push_channel_with(&transport, &bus, config).subscribe("scores").unwrap_err();
	assert!(matches!(err, ChannelError::ZeroReconnectDelay));
	tokio::time::sleep(Duration::from_secs(30)).await;
	assert_eq!(transport.attempt_count(), 0);
}
