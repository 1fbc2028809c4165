/// Store
///
/// Contract for the external persistence collaborator. The interactor
/// only reads at connect time, to decide whether a session is resumed
/// (skip the handshake watchdog, restore the peer identity); writing is
/// the application's responsibility.
///
use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::session::Session;
use crate::types::PeerMeta;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StoredSession {
    pub session: Session,
    #[serde(rename = "peerId")]
    pub peer_id: String,
    #[serde(rename = "peerMeta")]
    pub peer_meta: PeerMeta,
}

pub trait SessionStore: Send + Sync {
    fn load(&self, topic: &str) -> Option<StoredSession>;
    fn store(&self, item: StoredSession);
    fn remove(&self, topic: &str);
}

/// In-memory store for tests and single-run applications.
#[derive(Default)]
pub struct MemorySessionStore {
    items: Mutex<HashMap<String, StoredSession>>,
}

impl MemorySessionStore {
    pub fn new() -> MemorySessionStore {
        MemorySessionStore::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, topic: &str) -> Option<StoredSession> {
        self.items.lock().unwrap().get(topic).cloned()
    }

    fn store(&self, item: StoredSession) {
        self.items
            .lock()
            .unwrap()
            .insert(item.session.topic.clone(), item);
    }

    fn remove(&self, topic: &str) {
        self.items.lock().unwrap().remove(topic);
    }
}
