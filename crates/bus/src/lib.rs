//! Typed publish/subscribe registry decoupling event producers from consumers.
//!
//! Producers are form collectors, navigation requests and push channels;
//! consumers are the ledger dispatcher and render views. Every message is one
//! variant of the closed [`BusEvent`] enum. External collaborators that speak
//! the untyped wire form (an event name plus a JSON detail) go through
//! [`BusEvent::from_wire`], which rejects unknown names and malformed payloads
//! before anything reaches a subscriber.
//!
//! Delivery is synchronous: [`EventBus::publish`] invokes every subscriber that
//! is registered for the event's kind at publish time, in registration order,
//! exactly once. Nothing is buffered for late subscribers.

mod bus;
mod collect;
mod error;
mod event;

pub use bus::{EventBus, SubscriptionId};
pub use collect::{FormField, collect_edit, publish_edit};
pub use error::{BusError, Result};
pub use event::{BusEvent, EditRecord, EventKind, NavigationRequest, PushMessage, ScoreRecord};
