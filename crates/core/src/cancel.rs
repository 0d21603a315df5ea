// crates/core/src/cancel.rs
//! Per-call cancellation watcher.

use tokio_util::sync::CancellationToken;

/// One-shot observer of a caller's cancellation signal.
///
/// Watches a child of the caller's token, so the bridge (or the registry at
/// shutdown) can fire it without touching the caller's own signal. Without a
/// caller signal the watcher still owns a fresh token. [`detach`] drops the
/// child, which unlinks it from the parent.
///
/// [`detach`]: CancellationWatcher::detach
pub struct CancellationWatcher {
    token: Option<CancellationToken>,
}

impl CancellationWatcher {
    pub fn attach(signal: Option<&CancellationToken>) -> Self {
        let token = signal
            .map(CancellationToken::child_token)
            .unwrap_or_default();
        Self { token: Some(token) }
    }

    /// Handle to the watched token, for registries that may cancel the call.
    pub fn token(&self) -> Option<CancellationToken> {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Resolves when the signal fires. Pending forever once detached.
    pub async fn fired(&self) {
        match &self.token {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    }

    /// Stop observing. Returns `false` if already detached.
    pub fn detach(&mut self) -> bool {
        self.token.take().is_some()
    }
}
