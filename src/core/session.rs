//! Initialize-once client sessions
//!
//! Some providers need a keyed client that is built on first use and then
//! shared by every later request. `LazySession` is checked at the start of
//! each request instead of being built at startup, so a missing key only
//! affects the requests that need it.

use std::future::Future;
use tokio::sync::OnceCell;
use tracing::info;

use crate::models::errors::AppResult;

/// Lazily started, process-wide session
pub struct LazySession<T> {
    name: &'static str,
    cell: OnceCell<T>,
}

impl<T> LazySession<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            cell: OnceCell::new(),
        }
    }

    /// Return the session, running `init` if nobody has started it yet.
    /// Concurrent callers wait for the same initialization. A failed `init`
    /// leaves the session unstarted so the next request retries.
    pub async fn ensure_started<F, Fut>(&self, init: F) -> AppResult<&T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        self.cell
            .get_or_try_init(|| async move {
                let session = init().await?;
                info!("🔌 {} session started", self.name);
                Ok(session)
            })
            .await
    }

    pub fn is_started(&self) -> bool {
        self.cell.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_initializes_once() {
        let session = Arc::new(LazySession::new("test"));
        let inits = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let session = session.clone();
            let inits = inits.clone();
            handles.push(tokio::spawn(async move {
                let value = session
                    .ensure_started(move || async move {
                        inits.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, AppError>(42u32)
                    })
                    .await
                    .map(|v| *v);
                value
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 42);
        }
        assert_eq!(inits.load(Ordering::SeqCst), 1);
        assert!(session.is_started());
    }

    #[tokio::test]
    async fn test_failed_init_retries() {
        let session: LazySession<u32> = LazySession::new("test");

        let first = session
            .ensure_started(|| async { Err(AppError::unavailable("test", "KEY")) })
            .await;
        assert!(first.is_err());
        assert!(!session.is_started());

        let second = session.ensure_started(|| async { Ok(7) }).await;
        assert_eq!(second.ok().copied(), Some(7));
    }
}
