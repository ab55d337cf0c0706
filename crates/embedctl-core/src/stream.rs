// ── Reactive session stream ──
//
// Subscription handle for consuming session snapshots as the controller
// publishes them.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::session::SessionState;

/// A subscription to session state.
///
/// Provides point-in-time access plus change notification via
/// [`changed()`](Self::changed) or by converting into a `Stream`.
/// Intermediate snapshots may be skipped; the latest is never missed.
pub struct SessionStream {
    current: Arc<SessionState>,
    receiver: watch::Receiver<Arc<SessionState>>,
}

impl SessionStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<SessionState>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation or at the last `changed()`.
    pub fn current(&self) -> &Arc<SessionState> {
        &self.current
    }

    /// The latest published snapshot.
    pub fn latest(&self) -> Arc<SessionState> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next published snapshot.
    /// Returns `None` once the controller has shut down.
    pub async fn changed(&mut self) -> Option<Arc<SessionState>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators. The
    /// first item is the snapshot current at conversion time.
    pub fn into_stream(self) -> SessionWatchStream {
        SessionWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct SessionWatchStream {
    inner: WatchStream<Arc<SessionState>>,
}

impl Stream for SessionWatchStream {
    type Item = Arc<SessionState>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
