//! Scorekeep client binary.
//!
//! Runs the score ledger against a server:
//! - edits typed on stdin are merged into the pending ledger
//! - the ledger is flushed to the submit endpoint periodically and before navigation
//! - push channels are followed and their frames republished on the event bus

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use scorekeep_bus::{BusEvent, EventBus, NavigationRequest, publish_edit};
use scorekeep_channel::{ChannelConfig, ChannelSubscription, PushChannel, WsTransport};
use scorekeep_ledger::{DispatcherConfig, HttpScoreSink, LockCoordinator, QueryState, SyncClient, UpdateDispatcher};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use url::Url;

mod config;
mod console;
mod view;

use config::ClientConfig;
use console::{Command, HELP};
use view::{SCORES_CHANNEL, ScoreboardView};

/// Client command line arguments.
#[derive(Parser, Debug)]
#[command(name = "scorekeep")]
#[command(about = "Keeps a score ledger in sync with the server")]
struct Args {
	/// Configuration file
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Server origin, overrides the config file
	#[arg(short, long, value_name = "URL")]
	server: Option<Url>,

	/// Additional push channel to follow (repeatable)
	#[arg(long = "channel", value_name = "NAME")]
	channels: Vec<String>,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

struct Session {
	bus: EventBus,
	query: QueryState,
	lock: LockCoordinator,
	view: ScoreboardView,
	channels: BTreeMap<String, ChannelSubscription>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	setup_tracing(args.verbose);

	let mut config = match &args.config {
		Some(path) => ClientConfig::load(path)?,
		None => ClientConfig::default(),
	};
	config.apply_overrides(args.server, args.channels);

	info!(server = %config.server, "starting scorekeep");

	let bus = EventBus::global().clone();
	let view = ScoreboardView::attach(&bus, SCORES_CHANNEL);
	let query = QueryState::new(config.initial_query.clone());

	let sink = HttpScoreSink::new(config.submit_url()?, config.request_timeout())?;
	let dispatcher = UpdateDispatcher::new(
		LockCoordinator::new(),
		SyncClient::new(Arc::new(sink)),
		Arc::new(query.clone()),
		DispatcherConfig {
			flush_interval: config.flush_interval(),
		},
	);
	let handle = dispatcher.activate(&bus)?;

	let push = PushChannel::new(
		config.server.clone(),
		Arc::new(WsTransport),
		bus.clone(),
		ChannelConfig {
			prefix: config.channel_prefix.clone(),
			reconnect_delay: config.reconnect_delay(),
		},
	);
	let mut channels = BTreeMap::new();
	for name in &config.channels {
		match push.subscribe(name) {
			Ok(sub) => {
				info!(channel = %name, url = %sub.url(), "following channel");
				channels.insert(name.clone(), sub);
			}
			Err(e) => warn!(channel = %name, error = %e, "channel skipped"),
		}
	}

	let session = Session {
		bus,
		query,
		lock: dispatcher.lock().clone(),
		view,
		channels,
	};
	run_console(&session).await;

	info!("shutting down");
	handle.shutdown().await;
	for (_, sub) in session.channels {
		sub.close().await;
	}

	Ok(())
}

async fn run_console(session: &Session) {
	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	println!("{HELP}");

	loop {
		let line = tokio::select! {
			_ = tokio::signal::ctrl_c() => break,
			line = lines.next_line() => line,
		};
		let line = match line {
			Ok(Some(line)) => line,
			Ok(None) => break,
			Err(e) => {
				warn!(error = %e, "stdin read failed");
				break;
			}
		};

		match Command::parse(&line) {
			Ok(None) => {}
			Ok(Some(Command::Quit)) => break,
			Ok(Some(command)) => execute(session, command).await,
			Err(e) => println!("{e}"),
		}
	}
}

async fn execute(session: &Session, command: Command) {
	match command {
		Command::Edit { event_id, fields } => {
			let delivered = publish_edit(&session.bus, &event_id, &fields);
			if delivered == 0 {
				println!("nobody is listening for edits");
			}
		}
		Command::Goto { params } => {
			session.bus.publish(BusEvent::SafeRedirect(NavigationRequest { params }));
		}
		Command::Send { channel, payload } => match session.channels.get(&channel) {
			Some(sub) => {
				if let Err(e) = sub.send(&payload).await {
					println!("send on {channel} failed: {e}");
				}
			}
			None => println!("not following channel {channel:?}"),
		},
		Command::Show => show(session),
		Command::Help => println!("{HELP}"),
		Command::Quit => {}
	}
}

fn show(session: &Session) {
	match session.lock.try_acquire() {
		Ok(ledger) => {
			if ledger.is_empty() {
				println!("ledger: empty");
			}
			for (event_id, scores) in ledger.iter() {
				let fields: Vec<_> = scores.iter().map(|(field, value)| format!("{field}={value}")).collect();
				println!("ledger: {event_id} {}", fields.join(" "));
			}
		}
		Err(e) => println!("ledger: {e}"),
	}
	println!("query: {:?}", session.query.current());
	for (name, sub) in &session.channels {
		let status = sub.status();
		println!("channel {name}: {:?} (attempt {})", status.state, status.generation);
	}
	match session.view.latest() {
		Some(content) => println!("scoreboard:\n{content}"),
		None => println!("scoreboard: nothing received"),
	}
}

fn setup_tracing(verbose: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::prelude::*;

	let filter = || {
		EnvFilter::try_from_env("SCOREKEEP_LOG")
			.or_else(|_| EnvFilter::try_from_default_env())
			.unwrap_or_else(|_| {
				if verbose {
					EnvFilter::new("scorekeep=trace,scorekeep_ledger=trace,scorekeep_channel=trace,debug")
				} else {
					EnvFilter::new("info")
				}
			})
	};

	// SCOREKEEP_LOG_DIR keeps stdout free for the console
	if let Some(log_dir) = std::env::var("SCOREKEEP_LOG_DIR").ok().map(PathBuf::from)
		&& std::fs::create_dir_all(&log_dir).is_ok()
	{
		let log_path = log_dir.join(format!("scorekeep.{}.log", std::process::id()));

		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
			let file_layer = tracing_subscriber::fmt::layer().with_writer(file).with_ansi(false).with_target(true);

			tracing_subscriber::registry().with(filter()).with(file_layer).init();

			tracing::info!(path = ?log_path, "tracing initialized");
			return;
		}
	}

	tracing_subscriber::fmt()
		.with_env_filter(filter())
		.with_writer(std::io::stderr)
		.init();
}
