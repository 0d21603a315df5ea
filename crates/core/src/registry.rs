// crates/core/src/registry.rs
//! In-flight call registry, keyed by transport session id.
//!
//! Owned by whoever hosts the bridge and injected into it. Lets the host see
//! how many calls a session has running and cancel them (session teardown,
//! process shutdown). Entries disappear when their [`Registration`] drops.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

/// Session id used when the transport has no session concept (stdio).
pub const DEFAULT_SESSION: &str = "default";

/// One in-flight call.
#[derive(Debug, Clone)]
pub struct CallEntry {
    pub call_id: u64,
    pub job_id: Option<String>,
    pub cancel: CancellationToken,
    pub started_at: Instant,
}

#[derive(Default)]
pub struct CallRegistry {
    next_id: AtomicU64,
    sessions: DashMap<String, HashMap<u64, CallEntry>>,
}

impl CallRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Track a call until the returned guard drops.
    pub fn register(self: &Arc<Self>, session_id: &str, cancel: CancellationToken) -> Registration {
        let call_id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.sessions.entry(session_id.to_string()).or_default().insert(
            call_id,
            CallEntry {
                call_id,
                job_id: None,
                cancel,
                started_at: Instant::now(),
            },
        );
        tracing::debug!(session_id, call_id, "call registered");
        Registration {
            registry: Arc::clone(self),
            session_id: session_id.to_string(),
            call_id,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.sessions.iter().map(|s| s.value().len()).sum()
    }

    pub fn in_flight_for(&self, session_id: &str) -> usize {
        self.sessions.get(session_id).map_or(0, |s| s.len())
    }

    pub fn calls_for(&self, session_id: &str) -> Vec<CallEntry> {
        self.sessions
            .get(session_id)
            .map(|s| s.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Cancel every call of one session. Returns how many were signalled.
    pub fn cancel_session(&self, session_id: &str) -> usize {
        let Some(calls) = self.sessions.get(session_id) else {
            return 0;
        };
        for entry in calls.values() {
            entry.cancel.cancel();
        }
        tracing::info!(session_id, count = calls.len(), "cancelled session calls");
        calls.len()
    }

    /// Cancel everything, e.g. on shutdown.
    pub fn cancel_all(&self) -> usize {
        let mut count = 0;
        for session in self.sessions.iter() {
            for entry in session.value().values() {
                entry.cancel.cancel();
                count += 1;
            }
        }
        count
    }

    fn set_job(&self, session_id: &str, call_id: u64, job_id: &str) {
        if let Some(mut calls) = self.sessions.get_mut(session_id) {
            if let Some(entry) = calls.get_mut(&call_id) {
                entry.job_id = Some(job_id.to_string());
            }
        }
    }

    fn remove(&self, session_id: &str, call_id: u64) {
        if let Some(mut calls) = self.sessions.get_mut(session_id) {
            calls.remove(&call_id);
        }
        self.sessions.remove_if(session_id, |_, calls| calls.is_empty());
    }
}

/// Guard for one registered call; deregisters on drop.
pub struct Registration {
    registry: Arc<CallRegistry>,
    session_id: String,
    call_id: u64,
}

impl Registration {
    pub fn call_id(&self) -> u64 {
        self.call_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Record the backend job id once the start request succeeded.
    pub fn set_job(&self, job_id: &str) {
        self.registry.set_job(&self.session_id, self.call_id, job_id);
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.remove(&self.session_id, self.call_id);
        tracing::debug!(session_id = %self.session_id, call_id = self.call_id, "call deregistered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_drop() {
        let registry = CallRegistry::new();
        let a = registry.register("s1", CancellationToken::new());
        let b = registry.register("s1", CancellationToken::new());
        let c = registry.register("s2", CancellationToken::new());
        assert_ne!(a.call_id(), b.call_id());
        assert_eq!(registry.in_flight(), 3);
        assert_eq!(registry.in_flight_for("s1"), 2);

        drop(a);
        assert_eq!(registry.in_flight_for("s1"), 1);
        drop(b);
        drop(c);
        assert_eq!(registry.in_flight(), 0);
        assert!(registry.sessions.is_empty());
    }

    #[test]
    fn test_set_job() {
        let registry = CallRegistry::new();
        let reg = registry.register(DEFAULT_SESSION, CancellationToken::new());
        reg.set_job("J1");
        let calls = registry.calls_for(DEFAULT_SESSION);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].job_id.as_deref(), Some("J1"));
    }

    #[test]
    fn test_cancel_session_only_hits_that_session() {
        let registry = CallRegistry::new();
        let t1 = CancellationToken::new();
        let t2 = CancellationToken::new();
        let _r1 = registry.register("s1", t1.clone());
        let _r2 = registry.register("s2", t2.clone());

        assert_eq!(registry.cancel_session("s1"), 1);
        assert!(t1.is_cancelled());
        assert!(!t2.is_cancelled());
        assert_eq!(registry.cancel_session("missing"), 0);

        assert_eq!(registry.cancel_all(), 2);
        assert!(t2.is_cancelled());
    }
}
