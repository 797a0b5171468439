//! In-memory session store
//!
//! Process-lifetime quota ledger keyed by opaque session id. No persistence:
//! a restart forgets all sessions, which is the accepted trade-off for this
//! tier of state.
//!
//! Consumption is check-and-decrement under the store lock, so two
//! near-simultaneous requests can never both succeed on the last credit.
//! Expired sessions are removed by an explicit sweep, either called directly
//! (tests inject a clock) or driven by the background task from
//! [`SessionStore::spawn_sweeper`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::error::PlanError;
use crate::session::{Clock, SystemClock};
use crate::types::RecommendationQuery;

/// Sessions older than this are swept regardless of remaining quota.
/// Unused prepaid quota is lost with them; bounding memory wins over
/// storing abandoned sessions indefinitely.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// How often the background sweeper runs.
pub const DEFAULT_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60 * 60);

/// One prepaid recommendation session.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub remaining_quota: u32,
    pub created_at: DateTime<Utc>,
    /// Search context captured at init so refills stay on topic.
    pub context: Option<RecommendationQuery>,
}

/// Quota ledger with TTL-based cleanup.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_clock(
            Arc::new(SystemClock),
            Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        )
    }

    pub fn with_clock(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            clock,
            ttl,
        }
    }

    /// Create a fresh ledger entry. Always succeeds; billing happens before
    /// this is called.
    pub fn create_session(
        &self,
        user_id: impl Into<String>,
        initial_quota: u32,
        context: Option<RecommendationQuery>,
    ) -> String {
        let session_id = uuid::Uuid::new_v4().to_string();
        let session = Session {
            session_id: session_id.clone(),
            user_id: user_id.into(),
            remaining_quota: initial_quota,
            created_at: self.clock.now(),
            context,
        };
        self.sessions
            .lock()
            .expect("session map lock")
            .insert(session_id.clone(), session);
        tracing::debug!(session_id = %session_id, quota = initial_quota, "session created");
        session_id
    }

    /// Atomic check-and-decrement: returns true and spends one credit iff
    /// quota remains, otherwise false with state unchanged.
    pub fn consume_quota(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.lock().expect("session map lock");
        match sessions.get_mut(session_id) {
            Some(session) if session.remaining_quota > 0 => {
                session.remaining_quota -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn get_session(&self, session_id: &str) -> Option<Session> {
        self.sessions
            .lock()
            .expect("session map lock")
            .get(session_id)
            .cloned()
    }

    /// Ownership-checked consumption with typed business outcomes, for
    /// request/response callers. Returns the quota remaining after the
    /// spend.
    pub fn consume_for_user(&self, session_id: &str, user_id: &str) -> Result<u32, PlanError> {
        let mut sessions = self.sessions.lock().expect("session map lock");
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| PlanError::SessionNotFound(session_id.to_string()))?;
        if session.user_id != user_id {
            return Err(PlanError::SessionForbidden(session_id.to_string()));
        }
        if session.remaining_quota == 0 {
            return Err(PlanError::QuotaExhausted {
                session_id: session_id.to_string(),
            });
        }
        session.remaining_quota -= 1;
        Ok(session.remaining_quota)
    }

    /// Remove every session older than the TTL, regardless of remaining
    /// quota. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut sessions = self.sessions.lock().expect("session map lock");
        let before = sessions.len();
        sessions.retain(|_, s| now - s.created_at <= ttl);
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, "swept expired sessions");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().expect("session map lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn the periodic sweep task. The handle can be aborted on shutdown;
    /// otherwise the task runs for the life of the process.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        period: std::time::Duration,
    ) -> tokio::task::JoinHandle<()> {
        let store = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately; skip it so a fresh store
            // isn't swept at startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.sweep_expired();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Manually advanced clock for sweep tests.
    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn starting_at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(now),
            })
        }

        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    #[test]
    fn quota_consumption_is_exact() {
        let store = SessionStore::new();
        let id = store.create_session("user-1", 2, None);

        assert!(store.consume_quota(&id));
        assert!(store.consume_quota(&id));
        assert!(!store.consume_quota(&id));
        assert_eq!(store.get_session(&id).unwrap().remaining_quota, 0);
    }

    #[test]
    fn unknown_session_never_consumes() {
        let store = SessionStore::new();
        assert!(!store.consume_quota("nope"));
        assert!(store.get_session("nope").is_none());
    }

    #[test]
    fn concurrent_consumption_of_last_credit_admits_one_winner() {
        let store = Arc::new(SessionStore::new());
        let id = store.create_session("user-1", 1, None);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let id = id.clone();
            handles.push(std::thread::spawn(move || store.consume_quota(&id)));
        }
        let wins = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(store.get_session(&id).unwrap().remaining_quota, 0);
    }

    #[test]
    fn typed_access_distinguishes_not_found_forbidden_and_exhausted() {
        let store = SessionStore::new();
        let id = store.create_session("alice", 1, None);

        assert!(matches!(
            store.consume_for_user("missing", "alice"),
            Err(PlanError::SessionNotFound(_))
        ));
        assert!(matches!(
            store.consume_for_user(&id, "mallory"),
            Err(PlanError::SessionForbidden(_))
        ));
        assert_eq!(store.consume_for_user(&id, "alice").unwrap(), 0);
        assert!(matches!(
            store.consume_for_user(&id, "alice"),
            Err(PlanError::QuotaExhausted { .. })
        ));
        // Ownership is rejected even with quota remaining.
        let id2 = store.create_session("alice", 5, None);
        assert!(matches!(
            store.consume_for_user(&id2, "mallory"),
            Err(PlanError::SessionForbidden(_))
        ));
    }

    #[test]
    fn sweep_removes_expired_sessions_even_with_quota_left() {
        let clock = ManualClock::starting_at(Utc::now());
        let store = SessionStore::with_clock(clock.clone(), Duration::hours(24));

        let old = store.create_session("user-1", 5, None);
        clock.advance(Duration::hours(25));
        let fresh = store.create_session("user-2", 5, None);

        assert_eq!(store.sweep_expired(), 1);
        assert!(store.get_session(&old).is_none());
        assert!(store.get_session(&fresh).is_some());
    }

    #[test]
    fn sweep_keeps_sessions_within_ttl() {
        let clock = ManualClock::starting_at(Utc::now());
        let store = SessionStore::with_clock(clock.clone(), Duration::hours(24));
        let id = store.create_session("user-1", 1, None);
        clock.advance(Duration::hours(23));
        assert_eq!(store.sweep_expired(), 0);
        assert!(store.get_session(&id).is_some());
    }

    #[tokio::test]
    async fn background_sweeper_drives_sweeps() {
        let clock = ManualClock::starting_at(Utc::now());
        let store = Arc::new(SessionStore::with_clock(clock.clone(), Duration::hours(24)));
        let id = store.create_session("user-1", 1, None);

        let sweeper = Arc::clone(&store).spawn_sweeper(std::time::Duration::from_millis(5));
        clock.advance(Duration::hours(25));
        tokio::time::sleep(std::time::Duration::from_millis(60)).await;

        assert!(store.get_session(&id).is_none());
        sweeper.abort();
    }

    #[test]
    fn session_context_is_preserved() {
        let store = SessionStore::new();
        let query = RecommendationQuery {
            location: "Kyoto".into(),
            interests: vec!["food".into()],
            category: "food".into(),
        };
        let id = store.create_session("user-1", 3, Some(query.clone()));
        assert_eq!(store.get_session(&id).unwrap().context, Some(query));
    }
}
