use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};

/// Returns an interval whose first tick fires one full `period` from now.
///
/// Missed ticks are delayed rather than bursted, so a slow consumer never sees
/// a backlog of ticks.
///
/// # Panics
///
/// Panics if `period` is zero. Callers validate their intervals up front.
pub fn periodic(period: Duration) -> Interval {
	let mut interval = tokio::time::interval_at(Instant::now() + period, period);
	interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
	interval
}

/// One-shot delay.
pub fn delay(after: Duration) -> Sleep {
	tokio::time::sleep(after)
}
