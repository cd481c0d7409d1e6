use std::sync::Arc;

use parking_lot::Mutex;

/// Applies query parameters to the page location.
pub trait Navigator: Send + Sync {
	/// Replaces the page's query state with `params`.
	fn set_query(&self, params: &str);
}

/// In-memory page query state.
#[derive(Debug, Clone, Default)]
pub struct QueryState {
	query: Arc<Mutex<String>>,
}

impl QueryState {
	pub fn new(initial: impl Into<String>) -> Self {
		Self {
			query: Arc::new(Mutex::new(initial.into())),
		}
	}

	pub fn current(&self) -> String {
		self.query.lock().clone()
	}
}

impl Navigator for QueryState {
	fn set_query(&self, params: &str) {
		tracing::info!(params, "navigating");
		*self.query.lock() = params.to_string();
	}
}
