//! Core domain types for the ledger engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::Amount;

/// Opaque unique identifier for a ledger participant (a phone number in the
/// source domain). Lexicographic ordering doubles as the account lock order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountKey(String);

impl AccountKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountKey {
    fn from(s: &str) -> Self {
        AccountKey(s.to_string())
    }
}

impl From<String> for AccountKey {
    fn from(s: String) -> Self {
        AccountKey(s)
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxId(Uuid);

impl TxId {
    pub fn generate() -> Self {
        TxId(Uuid::new_v4())
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Locked-deposit identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepositId(Uuid);

impl DepositId {
    pub fn generate() -> Self {
        DepositId(Uuid::new_v4())
    }
}

impl FromStr for DepositId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(DepositId(Uuid::parse_str(s)?))
    }
}

impl fmt::Display for DepositId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A participant's account: spendable balance plus bookkeeping metadata.
/// Credential material lives with the auth layer, not here.
#[derive(Debug, Clone)]
pub struct Account {
    pub key: AccountKey,
    pub name: String,
    /// Spendable balance; never negative (enforced by the engine).
    pub balance: Amount,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(key: AccountKey, name: String, balance: Amount, now: DateTime<Utc>) -> Self {
        Self {
            key,
            name,
            balance,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A fixed-term locked deposit.
///
/// States: locked (`active`, `!can_withdraw`) → matured (`active`,
/// `can_withdraw`) → withdrawn (`!active`, terminal). `can_withdraw` never
/// reverts to false, and a withdrawn deposit is never reactivated.
#[derive(Debug, Clone)]
pub struct LockedDeposit {
    pub id: DepositId,
    pub account: AccountKey,
    pub amount: Amount,
    pub deposited_at: DateTime<Utc>,
    pub matures_at: DateTime<Utc>,
    pub can_withdraw: bool,
    pub active: bool,
}

impl LockedDeposit {
    pub fn new(
        account: AccountKey,
        amount: Amount,
        deposited_at: DateTime<Utc>,
        matures_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DepositId::generate(),
            account,
            amount,
            deposited_at,
            matures_at,
            can_withdraw: false,
            active: true,
        }
    }

    /// Whether withdrawal is permitted at `now`. The eager sweep and the
    /// lazy withdrawal-time check must agree on this exact comparison.
    pub fn withdrawable(&self, now: DateTime<Utc>) -> bool {
        self.can_withdraw || now >= self.matures_at
    }

    /// Eligible for the maturity sweep: still locked and past maturity.
    pub fn sweepable(&self, now: DateTime<Utc>) -> bool {
        self.active && !self.can_withdraw && self.matures_at <= now
    }

    /// Consume the deposit on withdrawal (terminal transition).
    pub fn consume(&mut self) {
        self.can_withdraw = true;
        self.active = false;
    }
}

/// Kind of balance-affecting event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Transfer,
    DepositLock,
    DepositUnlock,
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxKind::Transfer => "TRANSFER",
            TxKind::DepositLock => "DEPOSIT_LOCK",
            TxKind::DepositUnlock => "DEPOSIT_UNLOCK",
        };
        f.write_str(s)
    }
}

/// Transaction status. The engine finalizes synchronously, so it only ever
/// records `Completed`; the other states exist for callers that stage work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

/// Append-only record of a balance-affecting event. Immutable once recorded;
/// corrections are new transactions, never edits.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TxId,
    pub from: AccountKey,
    pub to: AccountKey,
    pub amount: Amount,
    pub kind: TxKind,
    pub status: TxStatus,
    /// Set for lock/unlock events.
    pub deposit: Option<DepositId>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn transfer(from: AccountKey, to: AccountKey, amount: Amount, now: DateTime<Utc>) -> Self {
        Self {
            id: TxId::generate(),
            from,
            to,
            amount,
            kind: TxKind::Transfer,
            status: TxStatus::Completed,
            deposit: None,
            created_at: now,
        }
    }

    /// Self-directed record of funds moving into a locked deposit.
    pub fn lock(account: AccountKey, amount: Amount, deposit: DepositId, now: DateTime<Utc>) -> Self {
        Self {
            id: TxId::generate(),
            from: account.clone(),
            to: account,
            amount,
            kind: TxKind::DepositLock,
            status: TxStatus::Completed,
            deposit: Some(deposit),
            created_at: now,
        }
    }

    /// Self-directed record of a matured deposit returning to the balance.
    pub fn unlock(account: AccountKey, amount: Amount, deposit: DepositId, now: DateTime<Utc>) -> Self {
        Self {
            id: TxId::generate(),
            from: account.clone(),
            to: account,
            amount,
            kind: TxKind::DepositUnlock,
            status: TxStatus::Completed,
            deposit: Some(deposit),
            created_at: now,
        }
    }

    /// Whether `key` is this transaction's source or destination.
    pub fn touches(&self, key: &AccountKey) -> bool {
        self.from == *key || self.to == *key
    }
}

/// An operation submitted to the engine through the batch surface.
#[derive(Debug, Clone)]
pub enum Op {
    /// Create an account with an opening balance (the signup hook).
    Register {
        key: AccountKey,
        name: String,
        opening: Amount,
    },
    /// Move funds between two different accounts.
    Transfer {
        from: AccountKey,
        to: AccountKey,
        amount: Amount,
    },
    /// Lock funds into a fixed-term deposit.
    Lock {
        key: AccountKey,
        amount: Amount,
        months: u32,
    },
    /// Withdraw every matured deposit of an account.
    Unlock { key: AccountKey },
    /// Advance eligible deposits to the matured state.
    Sweep,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn t0() -> DateTime<Utc> {
        "2026-01-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn deposit_id_round_trips_through_string() {
        let id = DepositId::generate();
        let parsed: DepositId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn deposit_id_rejects_malformed_input() {
        assert!("not-a-uuid".parse::<DepositId>().is_err());
    }

    #[test]
    fn account_key_orders_lexicographically() {
        assert!(AccountKey::from("0911000001") < AccountKey::from("0911000002"));
    }

    #[test]
    fn new_deposit_starts_locked() {
        let dep = LockedDeposit::new(
            "0911000001".into(),
            Amount::from_scaled(50_000),
            t0(),
            t0() + TimeDelta::days(30),
        );
        assert!(dep.active);
        assert!(!dep.can_withdraw);
        assert!(!dep.withdrawable(t0()));
    }

    #[test]
    fn deposit_withdrawable_at_or_after_maturity() {
        let matures = t0() + TimeDelta::days(30);
        let dep = LockedDeposit::new("0911000001".into(), Amount::from_scaled(50_000), t0(), matures);

        assert!(!dep.withdrawable(matures - TimeDelta::seconds(1)));
        assert!(dep.withdrawable(matures));
        assert!(dep.withdrawable(matures + TimeDelta::seconds(1)));
    }

    #[test]
    fn consume_is_terminal() {
        let mut dep = LockedDeposit::new(
            "0911000001".into(),
            Amount::from_scaled(50_000),
            t0(),
            t0() + TimeDelta::days(30),
        );
        dep.consume();
        assert!(!dep.active);
        assert!(dep.can_withdraw);
        assert!(!dep.sweepable(t0() + TimeDelta::days(60)));
    }

    #[test]
    fn lock_transaction_is_self_directed() {
        let tx = Transaction::lock(
            "0911000001".into(),
            Amount::from_scaled(50_000),
            DepositId::generate(),
            t0(),
        );
        assert_eq!(tx.from, tx.to);
        assert_eq!(tx.kind, TxKind::DepositLock);
        assert_eq!(tx.status, TxStatus::Completed);
        assert!(tx.deposit.is_some());
    }

    #[test]
    fn touches_matches_either_side() {
        let tx = Transaction::transfer("a".into(), "b".into(), Amount::from_scaled(100), t0());
        assert!(tx.touches(&"a".into()));
        assert!(tx.touches(&"b".into()));
        assert!(!tx.touches(&"c".into()));
    }

    #[test]
    fn tx_kind_display_matches_wire_names() {
        assert_eq!(TxKind::Transfer.to_string(), "TRANSFER");
        assert_eq!(TxKind::DepositLock.to_string(), "DEPOSIT_LOCK");
        assert_eq!(TxKind::DepositUnlock.to_string(), "DEPOSIT_UNLOCK");
    }
}
