//! In-process registry of open chat WebSocket connections
//!
//! Maps each chat room to its live connections and each connection to a
//! user id. Outbound frames go through per-connection unbounded channels;
//! the socket task drains its channel into the wire. A connection whose
//! channel is closed is pruned on the next broadcast. Presence is purely
//! in-memory and lost on restart.

use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Handle identifying one registered connection within its room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionId(Uuid);

struct RoomConnection {
    id: ConnectionId,
    user_id: String,
    tx: mpsc::UnboundedSender<String>,
}

#[derive(Default)]
pub struct ChatManager {
    rooms: RwLock<HashMap<i32, Vec<RoomConnection>>>,
}

impl ChatManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection; frames broadcast to the room are pushed into
    /// `tx` and must be drained into the socket by the caller's writer task.
    pub fn connect(
        &self,
        chat_id: i32,
        user_id: &str,
        tx: mpsc::UnboundedSender<String>,
    ) -> ConnectionId {
        let id = ConnectionId(Uuid::new_v4());
        let mut rooms = self.rooms.write();
        let room = rooms.entry(chat_id).or_default();
        room.push(RoomConnection {
            id,
            user_id: user_id.to_string(),
            tx,
        });
        tracing::info!(
            chat_id = chat_id,
            user_id = %user_id,
            connections = room.len(),
            "Chat connection registered"
        );
        id
    }

    /// Drop a connection; empty rooms are removed from the map.
    pub fn disconnect(&self, chat_id: i32, connection_id: ConnectionId) {
        let mut rooms = self.rooms.write();
        if let Some(room) = rooms.get_mut(&chat_id) {
            if let Some(idx) = room.iter().position(|c| c.id == connection_id) {
                let conn = room.remove(idx);
                tracing::info!(
                    chat_id = chat_id,
                    user_id = %conn.user_id,
                    "Chat connection removed"
                );
            }
            if room.is_empty() {
                rooms.remove(&chat_id);
            }
        }
    }

    /// Send a frame to every connection in the room, skipping `exclude`.
    /// Connections whose channel is gone are pruned.
    pub fn broadcast(&self, chat_id: i32, frame: &str, exclude: Option<ConnectionId>) {
        let mut rooms = self.rooms.write();
        let Some(room) = rooms.get_mut(&chat_id) else {
            tracing::debug!(chat_id = chat_id, "Broadcast to empty chat");
            return;
        };

        room.retain(|conn| {
            if Some(conn.id) == exclude {
                return true;
            }
            match conn.tx.send(frame.to_string()) {
                Ok(()) => true,
                Err(_) => {
                    tracing::debug!(
                        chat_id = chat_id,
                        user_id = %conn.user_id,
                        "Dropping dead chat connection"
                    );
                    false
                }
            }
        });

        if room.is_empty() {
            rooms.remove(&chat_id);
        }
    }

    /// User ids currently connected to the room, in connection order
    pub fn online_users(&self, chat_id: i32) -> Vec<String> {
        self.rooms
            .read()
            .get(&chat_id)
            .map(|room| room.iter().map(|c| c.user_id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn is_user_online(&self, chat_id: i32, user_id: &str) -> bool {
        self.rooms
            .read()
            .get(&chat_id)
            .map(|room| room.iter().any(|c| c.user_id == user_id))
            .unwrap_or(false)
    }

    pub fn connection_count(&self, chat_id: i32) -> usize {
        self.rooms
            .read()
            .get(&chat_id)
            .map(|room| room.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (
        mpsc::UnboundedSender<String>,
        mpsc::UnboundedReceiver<String>,
    ) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn test_broadcast_reaches_all_members() {
        let manager = ChatManager::new();
        let (tx_a, mut rx_a) = channel();
        let (tx_b, mut rx_b) = channel();
        manager.connect(1, "alice", tx_a);
        manager.connect(1, "bob", tx_b);

        manager.broadcast(1, "hello", None);

        assert_eq!(rx_a.try_recv().unwrap(), "hello");
        assert_eq!(rx_b.try_recv().unwrap(), "hello");
    }

    #[test]
    fn test_broadcast_excludes_sender() {
        let manager = ChatManager::new();
        let (tx_a, mut rx_a) = channel();
        let (tx_b, mut rx_b) = channel();
        let conn_a = manager.connect(1, "alice", tx_a);
        manager.connect(1, "bob", tx_b);

        manager.broadcast(1, "typing", Some(conn_a));

        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap(), "typing");
    }

    #[test]
    fn test_broadcast_is_scoped_to_room() {
        let manager = ChatManager::new();
        let (tx_a, mut rx_a) = channel();
        let (tx_b, mut rx_b) = channel();
        manager.connect(1, "alice", tx_a);
        manager.connect(2, "bob", tx_b);

        manager.broadcast(1, "room one only", None);

        assert_eq!(rx_a.try_recv().unwrap(), "room one only");
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_online_users_follow_connect_disconnect() {
        let manager = ChatManager::new();
        let (tx_a, _rx_a) = channel();
        let (tx_b, _rx_b) = channel();
        let conn_a = manager.connect(7, "alice", tx_a);
        manager.connect(7, "bob", tx_b);

        assert_eq!(manager.online_users(7), vec!["alice", "bob"]);
        assert!(manager.is_user_online(7, "alice"));

        manager.disconnect(7, conn_a);
        assert_eq!(manager.online_users(7), vec!["bob"]);
        assert!(!manager.is_user_online(7, "alice"));
    }

    #[test]
    fn test_dead_connections_pruned_on_broadcast() {
        let manager = ChatManager::new();
        let (tx_a, rx_a) = channel();
        let (tx_b, mut rx_b) = channel();
        manager.connect(3, "alice", tx_a);
        manager.connect(3, "bob", tx_b);

        drop(rx_a);
        manager.broadcast(3, "ping", None);

        assert_eq!(manager.connection_count(3), 1);
        assert_eq!(manager.online_users(3), vec!["bob"]);
        assert_eq!(rx_b.try_recv().unwrap(), "ping");
    }

    #[test]
    fn test_empty_room_is_removed() {
        let manager = ChatManager::new();
        let (tx, _rx) = channel();
        let conn = manager.connect(9, "alice", tx);
        manager.disconnect(9, conn);

        assert_eq!(manager.connection_count(9), 0);
        assert!(manager.online_users(9).is_empty());
    }
}
