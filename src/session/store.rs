//! In-memory session registry for the HTTP service.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Interaction, SessionState, Transition};
use crate::models::QueryPoint;

pub type SessionId = Uuid;

pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

type Sessions = HashMap<SessionId, SessionState>;

/// Sessions keyed by a random id. Not persisted; a restart forgets them.
///
/// Sessions idle for longer than the TTL are dropped by [`evict_idle`],
/// and creating a session past `max_sessions` drops the least recently
/// seen one.
///
/// [`evict_idle`]: SessionStore::evict_idle
pub struct SessionStore {
    sessions: Mutex<Sessions>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TTL, DEFAULT_MAX_SESSIONS)
    }
}

fn is_idle(state: &SessionState, now: DateTime<Utc>, ttl: Duration) -> bool {
    (now - state.last_seen_at)
        .to_std()
        .map(|age| age > ttl)
        .unwrap_or(false)
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn drop_idle(&self, sessions: &mut Sessions, now: DateTime<Utc>) -> usize {
        let before = sessions.len();
        sessions.retain(|_, state| !is_idle(state, now, self.idle_ttl));
        before - sessions.len()
    }

    /// Drop sessions not seen within the idle TTL; returns how many went
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let evicted = self.drop_idle(&mut self.lock(), now);
        if evicted > 0 {
            info!("Evicted {} idle session(s)", evicted);
        }
        evicted
    }

    pub fn create(&self) -> SessionId {
        self.create_at(Utc::now())
    }

    fn create_at(&self, now: DateTime<Utc>) -> SessionId {
        let mut sessions = self.lock();
        let mut evicted = self.drop_idle(&mut sessions, now);

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, state)| state.last_seen_at)
                .map(|(id, _)| *id);
            let Some(oldest) = oldest else { break };
            sessions.remove(&oldest);
            evicted += 1;
        }

        let id = Uuid::new_v4();
        let mut state = SessionState::new();
        state.last_seen_at = now;
        sessions.insert(id, state);
        info!(
            "Created session {} ({} active, {} evicted)",
            id,
            sessions.len(),
            evicted
        );
        id
    }

    /// Apply an interaction; `None` for an unknown session
    pub fn apply(&self, id: &SessionId, interaction: Interaction) -> Option<Transition> {
        let mut sessions = self.lock();
        let state = sessions.get_mut(id)?;
        state.touch(Utc::now());
        let transition = state.apply(interaction);
        debug!("Session {}: {:?}", id, transition);
        Some(transition)
    }

    /// Current query point; outer `None` for an unknown session
    pub fn query_point(&self, id: &SessionId) -> Option<Option<QueryPoint>> {
        let mut sessions = self.lock();
        let state = sessions.get_mut(id)?;
        state.touch(Utc::now());
        Some(state.current_query_point())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
