use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::ConversationTurn;

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub user_id: i64,
    pub turns: Vec<ConversationTurn>,
    pub transferred_to_human: bool,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// In-memory chat sessions. A session is only visible to the user that
/// opened it; looking one up with another user id behaves like a miss.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Returns the caller's live session, or opens a new one.
    pub fn open(&self, user_id: i64, id: Option<Uuid>) -> Session {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.retain(|_, s| s.expires_at > now);

        if let Some(existing) = id
            .and_then(|id| sessions.get(&id))
            .filter(|s| s.user_id == user_id)
        {
            return existing.clone();
        }

        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            turns: vec![],
            transferred_to_human: false,
            last_activity: now,
            expires_at: now + self.ttl,
        };
        sessions.insert(session.id, session.clone());
        session
    }

    pub fn get(&self, user_id: i64, id: Uuid) -> Option<Session> {
        let now = Utc::now();
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(&id)
            .filter(|s| s.user_id == user_id && s.expires_at > now)
            .cloned()
    }

    /// Appends a completed exchange. Only called once a reply exists, so an
    /// abandoned request leaves earlier turns untouched.
    pub fn record_exchange(
        &self,
        user_id: i64,
        id: Uuid,
        user_turn: ConversationTurn,
        assistant_turn: ConversationTurn,
        transferred: bool,
    ) -> bool {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        match sessions.get_mut(&id).filter(|s| s.user_id == user_id) {
            Some(session) => {
                session.turns.push(user_turn);
                session.turns.push(assistant_turn);
                session.transferred_to_human |= transferred;
                session.last_activity = now;
                session.expires_at = now + self.ttl;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
