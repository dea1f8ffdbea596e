//! Upgrade window and transaction bracketing.
//!
//! An upgrade is a bulk replacement of the category tables. While one runs,
//! live queries hold off re-running and user writes wait, so nobody reads or
//! edits a half-replaced data set. The flag lives in a `watch` channel so
//! waiters wake as soon as the window closes.

use crate::{ProviderError, ProviderResult};
use playa_database::StoreAdapter;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{debug, info};

pub struct UpgradeCoordinator {
    store: StoreAdapter,
    upgrading: watch::Sender<bool>,
    successful: AtomicBool,
}

impl UpgradeCoordinator {
    pub fn new(store: StoreAdapter) -> Self {
        let (upgrading, _) = watch::channel(false);
        Self {
            store,
            upgrading,
            successful: AtomicBool::new(false),
        }
    }

    /// Open the upgrade window.
    ///
    /// Fails with [`ProviderError::UpgradeInProgress`] if it is already open.
    pub fn begin_upgrade(&self) -> ProviderResult<()> {
        let started = self.upgrading.send_if_modified(|busy| {
            if *busy {
                false
            } else {
                *busy = true;
                true
            }
        });
        if !started {
            return Err(ProviderError::UpgradeInProgress);
        }
        info!("Upgrade started");
        Ok(())
    }

    /// Close the upgrade window and release everything waiting on it.
    pub fn end_upgrade(&self) {
        let ended = self.upgrading.send_if_modified(|busy| std::mem::replace(busy, false));
        if ended {
            info!("Upgrade finished");
        } else {
            debug!("No upgrade in progress, end ignored");
        }
    }

    pub fn is_upgrading(&self) -> bool {
        *self.upgrading.borrow()
    }

    /// A receiver for the upgrade flag, used by live queries to suspend.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.upgrading.subscribe()
    }

    /// Wait until no upgrade is in progress.
    pub async fn wait_until_idle(&self) {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so the wait cannot fail.
        let _ = rx.wait_for(|busy| !*busy).await;
    }

    /// Open a transaction on the store. A no-op inside an open transaction.
    pub async fn begin_transaction(&self) -> ProviderResult<()> {
        if !self.store.in_transaction() {
            self.successful.store(false, Ordering::Release);
        }
        self.store.begin_transaction().await?;
        Ok(())
    }

    /// Mark the open transaction to be committed by
    /// [`UpgradeCoordinator::end_transaction`].
    pub fn set_transaction_successful(&self) {
        if !self.store.in_transaction() {
            debug!("No open transaction, mark ignored");
            return;
        }
        self.successful.store(true, Ordering::Release);
    }

    /// Commit the open transaction if it was marked successful, otherwise
    /// roll it back.
    pub async fn end_transaction(&self) -> ProviderResult<()> {
        if !self.store.in_transaction() {
            debug!("No open transaction, end ignored");
            return Ok(());
        }
        if self.successful.swap(false, Ordering::AcqRel) {
            self.store.commit().await?;
        } else {
            self.store.rollback().await?;
        }
        Ok(())
    }
}
