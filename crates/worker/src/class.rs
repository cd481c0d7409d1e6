/// Execution classes used for spawn tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Short-lived trigger handlers (edits, navigation, flush ticks).
	Trigger,
	/// Long-running timer loops.
	Timer,
	/// Network connection drivers.
	Io,
}

impl TaskClass {
	/// Stable label used in trace fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Trigger => "trigger",
			Self::Timer => "timer",
			Self::Io => "io",
		}
	}
}
