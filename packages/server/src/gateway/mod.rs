pub mod connections;
pub mod dispatch;
pub mod events;
pub mod pubsub;
pub mod ws;

pub use connections::{ConnectionId, Connections};
pub use events::{ClientEvent, ServerEvent};
pub use pubsub::{match_channel, room_channel, PubSub, LOBBY_CHANNEL};
