use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

/// Hands out increasing tickets; only the newest ticket is current.
#[derive(Debug, Default)]
pub struct ReloadGuard {
    latest: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl ReloadGuard {
    pub fn begin(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reload {
    Applied,
    /// A newer load started before this one finished; its result was dropped.
    Superseded,
}

/// The data one view is showing. A load replaces it only when it succeeds
/// and is still the newest load; a failed load keeps what was there.
#[derive(Debug)]
pub struct ViewState<T> {
    guard: ReloadGuard,
    current: RwLock<Option<T>>,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            guard: ReloadGuard::default(),
            current: RwLock::new(None),
        }
    }
}

impl<T: Clone> ViewState<T> {
    pub async fn reload<F, E>(&self, load: F) -> Result<Reload, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let ticket = self.guard.begin();
        let result = load.await;

        if !self.guard.is_current(ticket) {
            tracing::debug!(ticket = ticket.0, "discarding superseded load");
            return Ok(Reload::Superseded);
        }

        let value = result?;
        *self.current.write().await = Some(value);
        Ok(Reload::Applied)
    }

    pub async fn current(&self) -> Option<T> {
        self.current.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::oneshot;

    #[test]
    fn only_latest_ticket_is_current() {
        let guard = ReloadGuard::default();
        let first = guard.begin();
        assert!(guard.is_current(first));
        let second = guard.begin();
        assert!(!guard.is_current(first));
        assert!(guard.is_current(second));
    }

    #[tokio::test]
    async fn superseded_result_is_discarded() {
        let state: Arc<ViewState<&'static str>> = Arc::new(ViewState::default());
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let (stale_tx, stale_rx) = oneshot::channel::<&'static str>();

        let slow = tokio::spawn({
            let state = Arc::clone(&state);
            async move {
                state
                    .reload(async move {
                        let _ = started_tx.send(());
                        stale_rx.await.map_err(|_| "closed")
                    })
                    .await
            }
        });
        started_rx.await.unwrap();

        let fast = state.reload(async { Ok::<_, &str>("fresh") }).await;
        stale_tx.send("stale").unwrap();
        let slow = slow.await.unwrap();

        assert_eq!(fast, Ok(Reload::Applied));
        assert_eq!(slow, Ok(Reload::Superseded));
        assert_eq!(state.current().await, Some("fresh"));
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_data() {
        let state: ViewState<u32> = ViewState::default();
        let applied = state.reload(async { Ok::<_, String>(7) }).await;
        assert_eq!(applied, Ok(Reload::Applied));

        let failed = state.reload(async { Err::<u32, _>("offline".to_string()) }).await;
        assert_eq!(failed, Err("offline".to_string()));
        assert_eq!(state.current().await, Some(7));
    }
}
