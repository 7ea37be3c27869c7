//! Session Table
//!
//! Keyed collection of live SSE sessions. A session binds a unique id to the
//! sender half of that client's event stream; exactly one session owns a
//! given sender. Per-session write ordering is the channel's FIFO ordering,
//! so no further locking is needed on the delivery path.

use {
    crate::types::ResponseEnvelope,
    dashmap::DashMap,
    rand::{distr::Alphanumeric, Rng},
    std::time::Instant,
    tokio::sync::mpsc,
};

const SESSION_ID_LEN: usize = 32;

pub(crate) fn generate_session_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

struct Session {
    sender: mpsc::UnboundedSender<ResponseEnvelope>,
    #[allow(dead_code)]
    created_at: Instant,
}

#[derive(Default)]
pub struct SessionTable {
    sessions: DashMap<String, Session>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Allocate a fresh session and register its output channel. The id is
    /// drawn from a 62^32 space; if it nonetheless collides with a live
    /// session we draw again rather than replace the existing entry.
    pub fn open(&self) -> (String, mpsc::UnboundedReceiver<ResponseEnvelope>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        loop {
            let id = generate_session_id();
            match self.sessions.entry(id.clone()) {
                dashmap::mapref::entry::Entry::Occupied(_) => continue,
                dashmap::mapref::entry::Entry::Vacant(entry) => {
                    entry.insert(Session {
                        sender,
                        created_at: Instant::now(),
                    });
                    return (id, receiver);
                }
            }
        }
    }

    /// Look up the sender for a live session. Never creates an entry.
    pub fn lookup(&self, id: &str) -> Option<mpsc::UnboundedSender<ResponseEnvelope>> {
        self.sessions.get(id).map(|session| session.sender.clone())
    }

    /// Remove exactly one session. Returns whether an entry was removed.
    /// Removed ids are never revived; a later `lookup` fails.
    pub fn remove(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
