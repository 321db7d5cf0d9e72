use dashmap::DashMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use super::events::ServerEvent;

pub type ConnectionId = Uuid;

/// Live socket bookkeeping for one authenticated connection.
#[derive(Debug)]
pub struct ConnectionHandle {
    pub user_id: Uuid,
    pub username: String,
    pub tx: UnboundedSender<ServerEvent>,
    /// Room this connection currently sits in, for implicit leave on disconnect.
    pub joined_room: Option<Uuid>,
}

/// Registry of every open websocket connection.
///
/// Outbound delivery goes through the per-connection unbounded channel; the
/// socket task owns the receiving end and drains it into the sink.
#[derive(Debug, Default)]
pub struct Connections {
    inner: DashMap<ConnectionId, ConnectionHandle>,
}

impl Connections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and hands back its id plus the outbound receiver.
    pub fn register(
        &self,
        user_id: Uuid,
        username: &str,
    ) -> (ConnectionId, UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.inner.insert(
            id,
            ConnectionHandle {
                user_id,
                username: username.to_string(),
                tx,
                joined_room: None,
            },
        );
        (id, rx)
    }

    pub fn deregister(&self, id: ConnectionId) {
        self.inner.remove(&id);
    }

    /// Queues an event for one connection. A connection that is mid-teardown
    /// simply drops the frame.
    pub fn send_to(&self, id: ConnectionId, event: ServerEvent) {
        if let Some(handle) = self.inner.get(&id) {
            let _ = handle.tx.send(event);
        }
    }

    pub fn set_joined_room(&self, id: ConnectionId, room: Option<Uuid>) {
        if let Some(mut handle) = self.inner.get_mut(&id) {
            handle.joined_room = room;
        }
    }

    pub fn joined_room(&self, id: ConnectionId) -> Option<Uuid> {
        self.inner.get(&id).and_then(|h| h.joined_room)
    }

    pub fn username_of(&self, id: ConnectionId) -> Option<String> {
        self.inner.get(&id).map(|h| h.username.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
