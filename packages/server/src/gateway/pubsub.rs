use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use super::connections::{ConnectionId, Connections};
use super::events::ServerEvent;

/// Channel every connection joins at registration, used for room list diffs.
pub const LOBBY_CHANNEL: &str = "rooms:lobby";

pub fn match_channel(match_id: Uuid) -> String {
    format!("match:{match_id}")
}

pub fn room_channel(room_id: Uuid) -> String {
    format!("room:{room_id}")
}

/// Channel-based fan-out over the connection registry.
///
/// Membership is tracked in both directions so a dropped connection can be
/// scrubbed from every channel it joined without a full scan.
pub struct PubSub {
    connections: Arc<Connections>,
    channels: DashMap<String, HashSet<ConnectionId>>,
    memberships: DashMap<ConnectionId, HashSet<String>>,
}

impl PubSub {
    pub fn new(connections: Arc<Connections>) -> Self {
        Self {
            connections,
            channels: DashMap::new(),
            memberships: DashMap::new(),
        }
    }

    pub fn subscribe(&self, conn: ConnectionId, channel: &str) {
        self.channels
            .entry(channel.to_string())
            .or_default()
            .insert(conn);
        self.memberships
            .entry(conn)
            .or_default()
            .insert(channel.to_string());
    }

    pub fn unsubscribe(&self, conn: ConnectionId, channel: &str) {
        if let Some(mut members) = self.channels.get_mut(channel) {
            members.remove(&conn);
        }
        if let Some(mut channels) = self.memberships.get_mut(&conn) {
            channels.remove(channel);
        }
    }

    /// Delivers an event to every channel member.
    pub fn publish(&self, channel: &str, event: &ServerEvent) {
        self.publish_inner(channel, None, event);
    }

    /// Delivers an event to every channel member except `skip`, used to relay
    /// a sender's own action back to everyone else.
    pub fn publish_except(&self, channel: &str, skip: ConnectionId, event: &ServerEvent) {
        self.publish_inner(channel, Some(skip), event);
    }

    fn publish_inner(&self, channel: &str, skip: Option<ConnectionId>, event: &ServerEvent) {
        let Some(members) = self.channels.get(channel) else {
            return;
        };
        for &conn in members.iter() {
            if Some(conn) == skip {
                continue;
            }
            self.connections.send_to(conn, event.clone());
        }
    }

    /// Removes the channel and every membership pointing at it.
    pub fn drop_channel(&self, channel: &str) {
        if let Some((_, members)) = self.channels.remove(channel) {
            for conn in members {
                if let Some(mut channels) = self.memberships.get_mut(&conn) {
                    channels.remove(channel);
                }
            }
        }
    }

    /// Scrubs a closed connection from every channel it joined.
    pub fn drop_connection(&self, conn: ConnectionId) {
        if let Some((_, channels)) = self.memberships.remove(&conn) {
            for channel in channels {
                if let Some(mut members) = self.channels.get_mut(&channel) {
                    members.remove(&conn);
                }
            }
        }
    }

    #[cfg(test)]
    pub fn member_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map(|m| m.len()).unwrap_or(0)
    }
}
