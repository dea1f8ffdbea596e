//! Live queries: result sets that re-deliver themselves whenever a table
//! they read changes.
//!
//! Each live query is one tokio task. It subscribes to change notifications
//! before its first run, so no change between the run and the wait is lost.
//! Snapshots go out through a bounded channel, which keeps emissions strictly
//! ordered: the next run only starts after the previous snapshot has been
//! handed over.
//!
//! While an upgrade is in progress the task holds off. Notifications that
//! arrive in the meantime are coalesced into a single re-run once the
//! upgrade window closes.

use crate::{ProviderResult, QueryInterceptor};
use futures_util::Stream;
use playa_database::{Query, StoreAdapter};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

/// Where a live query is in its run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    /// Not yet run, or held off by an upgrade.
    Idle,
    Running,
    Emitting,
    WaitingForChange,
    /// Terminal: cancelled, dropped, failed or the store went away.
    Cancelled,
}

/// A stream of snapshots for one query.
///
/// Dropping the stream stops the query.
pub struct LiveQuery<T> {
    task: JoinHandle<()>,
    receiver: mpsc::Receiver<ProviderResult<T>>,
    state: Arc<watch::Sender<LiveState>>,
}

impl<T> LiveQuery<T> {
    pub fn state(&self) -> LiveState {
        *self.state.borrow()
    }

    /// Follow state transitions.
    pub fn watch_state(&self) -> watch::Receiver<LiveState> {
        self.state.subscribe()
    }

    /// Stop re-running. Snapshots already buffered are discarded.
    pub fn cancel(&mut self) {
        self.task.abort();
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
        self.state.send_replace(LiveState::Cancelled);
    }
}

impl<T> Stream for LiveQuery<T> {
    type Item = ProviderResult<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawns live queries against one store.
#[derive(Clone)]
pub struct LiveQueryEngine {
    store: StoreAdapter,
    interceptor: Arc<dyn QueryInterceptor>,
    upgrading: watch::Receiver<bool>,
    buffer: usize,
}

impl LiveQueryEngine {
    pub fn new(
        store: StoreAdapter,
        interceptor: Arc<dyn QueryInterceptor>,
        upgrading: watch::Receiver<bool>,
        buffer: usize,
    ) -> Self {
        Self {
            store,
            interceptor,
            upgrading,
            buffer: buffer.max(1),
        }
    }

    fn intercepted<T>(&self, query: &Query<T>) -> Query<T> {
        let sql = self.interceptor.intercept(query.sql(), query.tables());
        query.clone().with_sql(sql)
    }

    /// Run a query once, through the interceptor.
    ///
    /// Waits for an upgrade in progress to end first, so a lookup never sees
    /// a half-replaced table. Do not call it from inside the upgrade window.
    pub async fn fetch<T>(&self, query: &Query<T>) -> ProviderResult<Vec<T>>
    where
        T: Send + 'static,
    {
        let mut upgrading = self.upgrading.clone();
        if *upgrading.borrow() {
            debug!(tables = ?query.tables(), "Lookup held for upgrade");
            // An error means the coordinator is gone and nothing can be
            // upgrading any more.
            let _ = upgrading.wait_for(|busy| !*busy).await;
        }
        Ok(self.store.run_query(self.intercepted(query)).await?)
    }

    /// Observe every row the query returns.
    pub fn observe<T>(&self, query: Query<T>) -> LiveQuery<Vec<T>>
    where
        T: Send + 'static,
    {
        self.spawn(query, |rows| rows)
    }

    /// Observe the first row the query returns, if any.
    pub fn observe_one<T>(&self, query: Query<T>) -> LiveQuery<Option<T>>
    where
        T: Send + 'static,
    {
        self.spawn(query, |rows| rows.into_iter().next())
    }

    fn spawn<T, R>(&self, query: Query<T>, shape: fn(Vec<T>) -> R) -> LiveQuery<R>
    where
        T: Send + 'static,
        R: Send + 'static,
    {
        let (tx, receiver) = mpsc::channel(self.buffer);
        let state = Arc::new(watch::channel(LiveState::Idle).0);
        let engine = self.clone();
        let task_state = state.clone();

        let task = tokio::spawn(async move {
            engine.run(query, shape, &tx, &task_state).await;
            // Mark the end before the channel closes, so a consumer that sees
            // the stream end also sees the terminal state.
            task_state.send_replace(LiveState::Cancelled);
            drop(tx);
        });

        LiveQuery {
            task,
            receiver,
            state,
        }
    }

    async fn run<T, R>(
        mut self,
        query: Query<T>,
        shape: fn(Vec<T>) -> R,
        tx: &mpsc::Sender<ProviderResult<R>>,
        state: &watch::Sender<LiveState>,
    ) where
        T: Send + 'static,
        R: Send + 'static,
    {
        let mut listener = self.store.notify_on_change(query.tables());

        loop {
            if *self.upgrading.borrow() {
                state.send_replace(LiveState::Idle);
                debug!(tables = ?query.tables(), "Live query held for upgrade");
                if self.upgrading.wait_for(|busy| !*busy).await.is_err() {
                    return;
                }
                listener.drain();
            }

            state.send_replace(LiveState::Running);
            let result = self.store.run_query(self.intercepted(&query)).await;
            if tx.is_closed() {
                return;
            }

            state.send_replace(LiveState::Emitting);
            match result {
                Ok(rows) => {
                    if tx.send(Ok(shape(rows))).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "Live query failed");
                    let _ = tx.send(Err(e.into())).await;
                    return;
                }
            }

            state.send_replace(LiveState::WaitingForChange);
            tokio::select! {
                changed = listener.changed() => {
                    if changed.is_none() {
                        return;
                    }
                }
                _ = tx.closed() => return,
            }
            let coalesced = listener.drain();
            debug!(tables = ?query.tables(), coalesced, "Re-running live query");
        }
    }
}
