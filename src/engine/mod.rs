//! The ledger engine.
//!
//! Enforces the transfer invariants (money conserved, no negative balance,
//! no lost update) and produces the transaction records. Locked-deposit
//! operations live in the `locked` submodule; both share the same store,
//! clock, and atomic-update discipline. Also supports an async stream of
//! operations.

use std::sync::Arc;

use tokio_stream::{Stream, StreamExt};
use tracing::info;

use crate::Amount;
use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::model::{Account, AccountKey, Op, Transaction};
use crate::store::{MemoryStore, StoreError};

mod locked;

mod error;
pub use error::{LedgerError, LockError, TransferError, UnlockError};

/// The ledger engine. Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct Ledger {
    store: MemoryStore,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
}

/// Public API
impl Ledger {
    pub fn new(clock: Arc<dyn Clock>, config: LedgerConfig) -> Self {
        Self {
            store: MemoryStore::new(),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Create an account with an opening balance. This is the signup hook
    /// for the authentication layer; credential material stays there.
    pub async fn register_account(
        &self,
        key: AccountKey,
        name: String,
        opening: Amount,
    ) -> Result<Account, StoreError> {
        let now = self.clock.now();
        let account = Account::new(key, name, opening, now);
        self.store.insert_account(account.clone()).await?;
        Ok(account)
    }

    /// Move `amount` from `from` to `to` as one atomic unit of work.
    ///
    /// Both balances move and the transaction is recorded, or nothing
    /// happens. The caller-authenticated source key is required; there is
    /// no fallback sender.
    pub async fn transfer(
        &self,
        from: &AccountKey,
        to: &AccountKey,
        amount: Amount,
    ) -> Result<Transaction, TransferError> {
        // Checked here, not just at the input boundary: a zero or negative
        // amount would invert the insufficient-funds guard.
        if !amount.is_positive() {
            return Err(TransferError::InvalidAmount(amount));
        }

        if from == to {
            return Err(TransferError::SelfTransfer(from.clone()));
        }

        let (src, dst) = self.store.account_pair(from, to).await;
        let src = src.ok_or_else(|| TransferError::AccountNotFound(from.clone()))?;
        let dst = dst.ok_or_else(|| TransferError::AccountNotFound(to.clone()))?;

        // Lock both accounts in ascending key order, never in call order,
        // so opposite-direction transfers on the same pair cannot deadlock.
        let (mut src_guard, mut dst_guard);
        if from < to {
            src_guard = src.lock().await;
            dst_guard = dst.lock().await;
        } else {
            dst_guard = dst.lock().await;
            src_guard = src.lock().await;
        }

        if src_guard.balance < amount {
            return Err(TransferError::InsufficientFunds(
                from.clone(),
                src_guard.balance,
                amount,
            ));
        }

        let now = self.clock.now();
        src_guard.balance -= amount;
        src_guard.updated_at = now;
        dst_guard.balance += amount;
        dst_guard.updated_at = now;

        let tx = Transaction::transfer(from.clone(), to.clone(), amount, now);
        // Appended while both account locks are held: the record lands in
        // commit order and no partial state is observable.
        self.store.append(tx.clone()).await?;

        Ok(tx)
    }

    /// Latest committed snapshot of one account.
    pub async fn balance(&self, key: &AccountKey) -> Result<Account, LedgerError> {
        let account = self
            .store
            .account(key)
            .await
            .ok_or_else(|| LedgerError::AccountNotFound(key.clone()))?;
        let snapshot = account.lock().await.clone();
        Ok(snapshot)
    }

    /// Transactions touching `key`, newest first. `limit` bounds the rows,
    /// falling back to the configured history limit.
    pub async fn transactions(&self, key: &AccountKey, limit: Option<usize>) -> Vec<Transaction> {
        let limit = limit.unwrap_or(self.config.history_limit);
        self.store.transactions_for(key, limit).await
    }

    /// Snapshot of every account, sorted by key.
    pub async fn accounts(&self) -> Vec<Account> {
        self.store.accounts().await
    }

    /// Run the engine over a stream of operations. Rejected operations are
    /// logged and skipped; the stream keeps going.
    pub async fn run(&self, mut stream: impl Stream<Item = Op> + Unpin) {
        while let Some(op) = stream.next().await {
            let _ = self.apply(op).await;
        }
    }

    /// Apply a single operation on top of the current ledger state.
    pub async fn apply(&self, op: Op) -> Result<(), LedgerError> {
        match op {
            Op::Register { key, name, opening } => {
                let result = self.register_account(key.clone(), name, opening).await;
                Self::log_result("register", &key, Some(opening), &result);
                result?;
            }
            Op::Transfer { from, to, amount } => {
                let result = self.transfer(&from, &to, amount).await;
                Self::log_result("transfer", &from, Some(amount), &result);
                result?;
            }
            Op::Lock { key, amount, months } => {
                let result = self.create_deposit(&key, amount, months).await;
                Self::log_result("lock", &key, Some(amount), &result);
                result?;
            }
            Op::Unlock { key } => {
                let result = self.withdraw_matured(&key).await;
                Self::log_result("unlock", &key, None, &result);
                result?;
            }
            Op::Sweep => {
                let matured = self.sweep_matured().await;
                info!(matured, "sweep applied");
            }
        }
        Ok(())
    }
}

/// Private API
impl Ledger {
    /// Small helper to log `apply` results
    fn log_result<T, E: std::fmt::Display>(
        op: &str,
        account: &AccountKey,
        amount: Option<Amount>,
        result: &Result<T, E>,
    ) {
        match (result, amount) {
            (Ok(_), Some(amt)) => {
                info!(account = %account, amount = %amt, "{op} applied");
            }
            (Ok(_), None) => {
                info!(account = %account, "{op} applied");
            }
            (Err(e), Some(amt)) => {
                info!(account = %account, amount = %amt, reason = %e, "{op} skipped");
            }
            (Err(e), None) => {
                info!(account = %account, reason = %e, "{op} skipped");
            }
        }
    }

    pub(crate) fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
