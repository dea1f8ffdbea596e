//! Store adapter: typed queries, explicit transactions and per-table change
//! notifications on top of [`AsyncDatabase`].
//!
//! Writes publish a [`ChangeEvent`] on a broadcast channel once the statement
//! has run. While a transaction is open the events are held back and commit
//! publishes them in order. Rollback publishes one
//! [`ChangeEvent::RolledBack`] per table the transaction wrote: a query run
//! on the shared connection mid-transaction may have seen the discarded rows
//! and has to run again.

use crate::queries::Query;
use crate::record::{self, PlayaRecord};
use crate::{AsyncDatabase, DatabaseResult, PlayaItem, Table};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default capacity of the change notification channel.
pub const DEFAULT_CHANGE_CAPACITY: usize = 256;

/// A committed change to one of the category tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Insert { table: Table, id: i64 },
    Update { table: Table, id: i64 },
    Clear { table: Table, rows: usize },
    /// Writes to `table` inside a transaction were rolled back.
    RolledBack { table: Table },
    /// The listener fell behind and dropped `count` notifications. Any of
    /// its tables may have changed.
    Missed { count: u64 },
}

impl ChangeEvent {
    /// The table the change touched. `None` for [`ChangeEvent::Missed`].
    pub fn table(&self) -> Option<Table> {
        match self {
            Self::Insert { table, .. }
            | Self::Update { table, .. }
            | Self::Clear { table, .. }
            | Self::RolledBack { table } => Some(*table),
            Self::Missed { .. } => None,
        }
    }
}

/// Receives change events for a fixed set of tables.
pub struct ChangeListener {
    tables: Vec<Table>,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl ChangeListener {
    fn concerns(&self, event: &ChangeEvent) -> bool {
        event.table().map_or(true, |table| self.tables.contains(&table))
    }

    /// Wait for the next change to one of the listened tables.
    ///
    /// Returns `None` once every handle to the store has been dropped.
    pub async fn changed(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.concerns(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(count, "Change listener lagged");
                    return Some(ChangeEvent::Missed { count });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Discard notifications that are already queued, returning how many of
    /// them concerned the listened tables.
    pub fn drain(&mut self) -> usize {
        let mut relevant = 0;
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    if self.concerns(&event) {
                        relevant += 1;
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => relevant += 1,
                Err(_) => return relevant,
            }
        }
    }
}

#[derive(Default)]
struct TransactionState {
    active: AtomicBool,
    pending: Mutex<Vec<ChangeEvent>>,
}

/// Typed access to the category tables with change notification.
///
/// Cheap to clone; clones share the connection, the notification channel
/// and the transaction state.
#[derive(Clone)]
pub struct StoreAdapter {
    db: AsyncDatabase,
    changes: broadcast::Sender<ChangeEvent>,
    txn: Arc<TransactionState>,
}

impl StoreAdapter {
    pub fn new(db: AsyncDatabase, change_capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(change_capacity.max(1));
        Self {
            db,
            changes,
            txn: Arc::new(TransactionState::default()),
        }
    }

    pub fn database(&self) -> &AsyncDatabase {
        &self.db
    }

    /// Run a query on the store thread and return its rows in order.
    pub async fn run_query<T>(&self, query: Query<T>) -> DatabaseResult<Vec<T>>
    where
        T: Send + 'static,
    {
        self.db.call(move |conn| query.execute(conn)).await
    }

    /// Listen for changes to any of `tables`.
    ///
    /// Only changes published after this call are delivered.
    pub fn notify_on_change(&self, tables: &[Table]) -> ChangeListener {
        ChangeListener {
            tables: tables.to_vec(),
            rx: self.changes.subscribe(),
        }
    }

    fn publish(&self, event: ChangeEvent) {
        let mut pending = self.txn.pending.lock();
        if self.txn.active.load(Ordering::Acquire) {
            pending.push(event);
        } else {
            drop(pending);
            // No receivers is fine: nobody is watching yet.
            let _ = self.changes.send(event);
        }
    }

    /// Whether a transaction opened through this adapter is still open.
    pub fn in_transaction(&self) -> bool {
        self.txn.active.load(Ordering::Acquire)
    }

    /// Open a transaction. A no-op when one is already open.
    pub async fn begin_transaction(&self) -> DatabaseResult<()> {
        if self
            .txn
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Transaction already open, begin ignored");
            return Ok(());
        }

        if let Err(e) = self
            .db
            .call_sqlite(|conn| conn.execute_batch("BEGIN IMMEDIATE"))
            .await
        {
            self.txn.active.store(false, Ordering::Release);
            return Err(e);
        }
        debug!("Transaction started");
        Ok(())
    }

    /// Take the transaction out of the active state, returning the events it
    /// buffered, or `None` when no transaction was open.
    fn close_transaction(&self) -> Option<Vec<ChangeEvent>> {
        let mut pending = self.txn.pending.lock();
        self.txn
            .active
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(std::mem::take(&mut *pending))
    }

    /// Commit the open transaction and publish its changes.
    /// A no-op when no transaction is open.
    pub async fn commit(&self) -> DatabaseResult<()> {
        let Some(events) = self.close_transaction() else {
            debug!("No open transaction, commit ignored");
            return Ok(());
        };

        let result = self
            .db
            .call_sqlite(|conn| {
                conn.execute_batch("COMMIT").or_else(|e| {
                    if !conn.is_autocommit() {
                        conn.execute_batch("ROLLBACK")?;
                    }
                    Err(e)
                })
            })
            .await;

        match result {
            Ok(()) => {
                debug!(changes = events.len(), "Transaction committed");
                for event in events {
                    let _ = self.changes.send(event);
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Commit failed, changes discarded");
                Err(e)
            }
        }
    }

    /// Roll back the open transaction. Buffered changes are replaced by one
    /// [`ChangeEvent::RolledBack`] per table they touched.
    /// A no-op when no transaction is open.
    pub async fn rollback(&self) -> DatabaseResult<()> {
        let Some(events) = self.close_transaction() else {
            debug!("No open transaction, rollback ignored");
            return Ok(());
        };

        self.db
            .call_sqlite(|conn| {
                if conn.is_autocommit() {
                    Ok(())
                } else {
                    conn.execute_batch("ROLLBACK")
                }
            })
            .await?;

        let mut touched: Vec<Table> = Vec::new();
        for table in events.iter().filter_map(ChangeEvent::table) {
            if !touched.contains(&table) {
                touched.push(table);
            }
        }
        debug!(discarded = events.len(), tables = ?touched, "Transaction rolled back");
        for table in touched {
            let _ = self.changes.send(ChangeEvent::RolledBack { table });
        }
        Ok(())
    }

    /// Insert a record, returning its new id.
    pub async fn insert<T: PlayaRecord>(&self, record: T) -> DatabaseResult<i64> {
        let id = self.db.call(move |conn| record.insert(conn)).await?;
        self.publish(ChangeEvent::Insert { table: T::TABLE, id });
        Ok(id)
    }

    /// Replace every column of an existing row.
    pub async fn update<T: PlayaRecord>(&self, record: T) -> DatabaseResult<usize> {
        let id = record.info().id;
        let count = self.db.call(move |conn| record.update(conn)).await?;
        if count > 0 {
            self.publish(ChangeEvent::Update { table: T::TABLE, id });
        }
        Ok(count)
    }

    /// [`StoreAdapter::update`] for an item of any category.
    pub async fn update_item(&self, item: PlayaItem) -> DatabaseResult<usize> {
        let table = item.table();
        let id = item.info().id;
        let count = self
            .db
            .call(move |conn| record::update_item(conn, &item))
            .await?;
        if count > 0 {
            self.publish(ChangeEvent::Update { table, id });
        }
        Ok(count)
    }

    /// Set only the favorite flag of one row.
    pub async fn set_favorite(&self, table: Table, id: i64, favorite: bool) -> DatabaseResult<usize> {
        let count = self
            .db
            .call_sqlite(move |conn| {
                conn.execute(
                    &format!("UPDATE {table} SET favorite = ?1 WHERE id = ?2"),
                    rusqlite::params![favorite, id],
                )
            })
            .await?;
        if count > 0 {
            self.publish(ChangeEvent::Update { table, id });
        }
        Ok(count)
    }

    /// Delete every row of a table, returning how many were removed.
    pub async fn clear(&self, table: Table) -> DatabaseResult<usize> {
        let rows = self
            .db
            .call_sqlite(move |conn| conn.execute(&format!("DELETE FROM {table}"), []))
            .await?;
        debug!(%table, rows, "Table cleared");
        self.publish(ChangeEvent::Clear { table, rows });
        Ok(rows)
    }

    /// [`StoreAdapter::clear`] addressed by table name. Unknown names are
    /// logged and clear nothing.
    pub async fn clear_table(&self, name: &str) -> DatabaseResult<usize> {
        match Table::from_name(name) {
            Some(table) => self.clear(table).await,
            None => {
                warn!(table = name, "Cannot clear unknown table");
                Ok(0)
            }
        }
    }
}
