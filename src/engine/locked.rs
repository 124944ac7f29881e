//! The locked-deposit engine.
//!
//! A locked deposit removes funds from the spendable balance until a
//! maturity date. Per-deposit state machine:
//!
//! ```text
//! locked (active, !can_withdraw)
//!   -> matured (active, can_withdraw)     current time >= matures_at
//!   -> withdrawn (!active)                terminal
//! ```
//!
//! Maturity is detected lazily at withdrawal time or eagerly by the sweep;
//! both use [`LockedDeposit::withdrawable`] so they cannot diverge. Balance
//! changes go through the same atomic-update discipline as transfers.

use tracing::debug;

use crate::Amount;
use crate::model::{AccountKey, DepositId, LockedDeposit, Transaction};

use super::{Ledger, LockError, UnlockError};

/// Longest accepted deposit term: a century of months.
pub(crate) const MAX_TERM_MONTHS: u32 = 1200;

impl Ledger {
    /// Lock `amount` from the account's balance for `months` deposit-term
    /// months (month length comes from [`LedgerConfig`](crate::LedgerConfig)).
    /// The term must be in `1..=MAX_TERM_MONTHS`; maturity always lands
    /// strictly after the deposit timestamp.
    ///
    /// Debits the account, inserts the deposit in the locked state, and
    /// records a `DEPOSIT_LOCK` transaction, all as one unit of work.
    pub async fn create_deposit(
        &self,
        key: &AccountKey,
        amount: Amount,
        months: u32,
    ) -> Result<LockedDeposit, LockError> {
        if months == 0 || months > MAX_TERM_MONTHS {
            return Err(LockError::InvalidTerm(months));
        }

        let minimum = self.config().min_lock;
        if amount < minimum {
            return Err(LockError::BelowMinimum(minimum, amount));
        }

        let account = self
            .store()
            .account(key)
            .await
            .ok_or_else(|| LockError::AccountNotFound(key.clone()))?;
        let mut guard = account.lock().await;

        if guard.balance < amount {
            return Err(LockError::InsufficientFunds(
                key.clone(),
                guard.balance,
                amount,
            ));
        }

        let now = self.clock().now();
        // The month length is operator configuration, so the timestamp
        // arithmetic stays checked: out-of-range maturity is an error,
        // never a panic or a date in the past.
        let matures_at = self
            .config()
            .month
            .checked_mul(months as i32)
            .and_then(|term| now.checked_add_signed(term))
            .filter(|matures_at| *matures_at > now)
            .ok_or(LockError::InvalidTerm(months))?;

        guard.balance -= amount;
        guard.updated_at = now;

        let deposit = LockedDeposit::new(key.clone(), amount, now, matures_at);
        // Lock order: account mutex is held; deposits table, then log.
        self.store().deposits().await.insert(deposit.id, deposit.clone());
        let tx = Transaction::lock(key.clone(), amount, deposit.id, now);
        self.store().append(tx).await?;

        Ok(deposit)
    }

    /// Withdraw a matured deposit back into the spendable balance.
    ///
    /// The deposit must resolve by owner + id + active. Withdrawal is
    /// permitted once the clock check passes, whether or not the sweep has
    /// already flagged the deposit. Consumption is one-shot: a second
    /// withdrawal of the same id fails with `DepositNotFound`.
    pub async fn withdraw(
        &self,
        key: &AccountKey,
        deposit_id: &str,
    ) -> Result<Transaction, UnlockError> {
        let id: DepositId = deposit_id
            .parse()
            .map_err(|_| UnlockError::InvalidDepositId(deposit_id.to_string()))?;
        self.withdraw_by_id(key, id).await
    }

    /// Withdraw every matured deposit of an account; returns how many were
    /// consumed. Immature deposits are left locked.
    pub async fn withdraw_matured(&self, key: &AccountKey) -> Result<usize, UnlockError> {
        let mut consumed = 0;
        for deposit in self.store().active_deposits_for(key).await {
            match self.withdraw_by_id(key, deposit.id).await {
                Ok(_) => consumed += 1,
                Err(UnlockError::NotMature(id, matures_at)) => {
                    debug!(deposit = %id, %matures_at, "deposit still locked");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(consumed)
    }

    /// Active deposits owned by `key`.
    pub async fn deposits_for(&self, key: &AccountKey) -> Vec<LockedDeposit> {
        self.store().active_deposits_for(key).await
    }

    /// Advance every matured-but-unflagged deposit to the withdrawable
    /// state; returns the count transitioned. Never touches balances, and
    /// running it again with no elapsed time transitions nothing.
    pub async fn sweep_matured(&self) -> usize {
        let now = self.clock().now();
        let mut deposits = self.store().deposits().await;

        let mut count = 0;
        for deposit in deposits.values_mut() {
            if deposit.sweepable(now) {
                deposit.can_withdraw = true;
                count += 1;
            }
        }
        count
    }

    async fn withdraw_by_id(
        &self,
        key: &AccountKey,
        id: DepositId,
    ) -> Result<Transaction, UnlockError> {
        let account = self
            .store()
            .account(key)
            .await
            .ok_or_else(|| UnlockError::AccountNotFound(key.clone()))?;
        let mut guard = account.lock().await;

        // Account mutex held; deposits table comes next in the lock order.
        let mut deposits = self.store().deposits().await;
        let deposit = deposits
            .get_mut(&id)
            .filter(|d| d.active && d.account == *key)
            .ok_or(UnlockError::DepositNotFound(id))?;

        let now = self.clock().now();
        if !deposit.withdrawable(now) {
            return Err(UnlockError::NotMature(id, deposit.matures_at));
        }

        deposit.consume();
        let amount = deposit.amount;
        drop(deposits);

        guard.balance += amount;
        guard.updated_at = now;

        let tx = Transaction::unlock(key.clone(), amount, id, now);
        self.store().append(tx.clone()).await?;

        Ok(tx)
    }
}
