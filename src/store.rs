//! In-memory account store and transaction log.
//!
//! Concurrency contract: one mutex per account row serializes balance
//! mutation of that account while disjoint accounts proceed in parallel.
//! Global lock order, so no operation can wait in a cycle:
//!
//! 1. account mutexes, in ascending key order
//! 2. the deposits table
//! 3. the transaction log
//!
//! A holder of a later lock never acquires an earlier one.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::model::{Account, AccountKey, DepositId, LockedDeposit, Transaction};

/// Storage-layer failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account {0} already exists")]
    DuplicateAccount(AccountKey),

    /// Backend fault (connectivity loss and the like). The in-memory store
    /// never produces this; it exists for transactional backends sharing
    /// these signatures.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Stable machine-readable code for the calling layer.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::DuplicateAccount(_) => "DUPLICATE_ACCOUNT",
            StoreError::Unavailable(_) => "STORE_UNAVAILABLE",
        }
    }
}

/// Shared handle to one account row.
pub type AccountHandle = Arc<Mutex<Account>>;

/// The single shared mutable resource: accounts, locked deposits, and the
/// append-only transaction log.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: RwLock<HashMap<AccountKey, AccountHandle>>,
    deposits: Mutex<HashMap<DepositId, LockedDeposit>>,
    log: Mutex<Vec<Transaction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_account(&self, account: Account) -> Result<(), StoreError> {
        let mut accounts = self.inner.accounts.write().await;
        if accounts.contains_key(&account.key) {
            return Err(StoreError::DuplicateAccount(account.key));
        }
        accounts.insert(account.key.clone(), Arc::new(Mutex::new(account)));
        Ok(())
    }

    pub async fn account(&self, key: &AccountKey) -> Option<AccountHandle> {
        self.inner.accounts.read().await.get(key).cloned()
    }

    /// Fetch two account handles under a single read acquisition, so an
    /// insert cannot interleave between the lookups.
    pub async fn account_pair(
        &self,
        a: &AccountKey,
        b: &AccountKey,
    ) -> (Option<AccountHandle>, Option<AccountHandle>) {
        let accounts = self.inner.accounts.read().await;
        (accounts.get(a).cloned(), accounts.get(b).cloned())
    }

    /// Snapshot of every account, sorted by key.
    pub async fn accounts(&self) -> Vec<Account> {
        let handles: Vec<AccountHandle> =
            self.inner.accounts.read().await.values().cloned().collect();

        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            out.push(handle.lock().await.clone());
        }
        out.sort_by(|x, y| x.key.cmp(&y.key));
        out
    }

    /// Exclusive access to the deposits table. The guard participates in
    /// the store lock order: acquire after any account mutex, before the
    /// log.
    pub async fn deposits(&self) -> MutexGuard<'_, HashMap<DepositId, LockedDeposit>> {
        self.inner.deposits.lock().await
    }

    /// Active deposits owned by `key`.
    pub async fn active_deposits_for(&self, key: &AccountKey) -> Vec<LockedDeposit> {
        self.inner
            .deposits
            .lock()
            .await
            .values()
            .filter(|d| d.active && d.account == *key)
            .cloned()
            .collect()
    }

    /// Append a finalized transaction. Call with the affected account locks
    /// still held, so the log reflects commit order.
    pub async fn append(&self, tx: Transaction) -> Result<(), StoreError> {
        self.inner.log.lock().await.push(tx);
        Ok(())
    }

    /// Transactions where `key` is source or destination, newest first,
    /// bounded by `limit`.
    pub async fn transactions_for(&self, key: &AccountKey, limit: usize) -> Vec<Transaction> {
        self.inner
            .log
            .lock()
            .await
            .iter()
            .rev()
            .filter(|tx| tx.touches(key))
            .take(limit)
            .cloned()
            .collect()
    }
}
