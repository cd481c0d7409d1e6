//! Shared worker primitives for scorekeep services.
//!
//! Every background task in the workspace is spawned through [`spawn`] with a
//! [`TaskClass`], so task lifecycles show up uniformly in traces. Spawns made
//! outside a runtime land on a shared background runtime. The timer
//! helpers encode the fixed-interval scheduling used by the flush tick and the
//! push channel reconnect delay.

mod class;
mod spawn;
mod timer;
mod token;

pub use class::TaskClass;
pub use spawn::{runtime_handle, spawn, spawn_on};
pub use timer::{delay, periodic};
pub use token::GenerationClock;
