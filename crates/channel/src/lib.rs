//! Push channels: one persistent connection per named server channel.
//!
//! Each subscription cycles `Connecting -> Open -> Closed -> Connecting`
//! forever. Frames received while open are republished on the
//! [`EventBus`](scorekeep_bus::EventBus) as
//! [`BusEvent::PushDelivery`](scorekeep_bus::BusEvent::PushDelivery), tagged
//! with the channel name and otherwise untouched. Losing the connection
//! schedules exactly one reconnect after a fixed delay.
//!
//! Teardown cancels whatever the driver is doing: an open connection is
//! closed, a pending connect is abandoned and a pending reconnect timer never
//! fires.

mod address;
mod channel;
mod error;
mod transport;
mod ws;

pub use address::resolve_channel_url;
pub use channel::{ChannelConfig, ChannelState, ChannelStatus, ChannelSubscription, PushChannel};
pub use error::{ChannelError, Result};
pub use transport::{ChannelConnection, ChannelTransport};
pub use ws::WsTransport;
