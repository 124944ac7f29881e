//! Error taxonomy for ledger operations.
//!
//! Every domain rule violation is a typed, caller-visible outcome with a
//! stable machine-readable code. The calling layer switches on the variant
//! or its `code()`, never on message text.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::Amount;
use crate::model::{AccountKey, DepositId};
use crate::store::StoreError;

/// Top-level error returned by [`Ledger`](super::Ledger) operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("account {0} not found")]
    AccountNotFound(AccountKey),

    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("deposit failed: {0}")]
    Lock(#[from] LockError),

    #[error("withdrawal failed: {0}")]
    Unlock(#[from] UnlockError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error during a transfer between two accounts.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("transfer amount must be positive, got {0}")]
    InvalidAmount(Amount),

    #[error("cannot transfer to the same account {0}")]
    SelfTransfer(AccountKey),

    #[error("account {0} not found")]
    AccountNotFound(AccountKey),

    #[error("insufficient balance in {0}: available {1}, requested {2}")]
    InsufficientFunds(AccountKey, Amount, Amount),

    /// Commit-layer failure; the unit of work was rolled back in full.
    #[error("could not commit transfer: {0}")]
    Failed(#[from] StoreError),
}

/// Error creating a locked deposit.
#[derive(Debug, Error)]
pub enum LockError {
    /// Term is zero, over the supported maximum, or puts maturity out of
    /// timestamp range.
    #[error("unsupported deposit term of {0} months")]
    InvalidTerm(u32),

    #[error("minimum deposit is {0}, got {1}")]
    BelowMinimum(Amount, Amount),

    #[error("account {0} not found")]
    AccountNotFound(AccountKey),

    #[error("insufficient balance in {0}: available {1}, requested {2}")]
    InsufficientFunds(AccountKey, Amount, Amount),

    #[error("could not commit deposit: {0}")]
    Failed(#[from] StoreError),
}

/// Error withdrawing a locked deposit.
#[derive(Debug, Error)]
pub enum UnlockError {
    #[error("invalid deposit id '{0}'")]
    InvalidDepositId(String),

    /// No active deposit with this id owned by the caller.
    #[error("deposit {0} not found")]
    DepositNotFound(DepositId),

    #[error("deposit {0} not mature until {1}")]
    NotMature(DepositId, DateTime<Utc>),

    #[error("account {0} not found")]
    AccountNotFound(AccountKey),

    #[error("could not commit withdrawal: {0}")]
    Failed(#[from] StoreError),
}

impl LedgerError {
    /// Stable code for the calling layer (rendered alongside the message,
    /// never parsed out of it).
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            LedgerError::Transfer(e) => e.code(),
            LedgerError::Lock(e) => e.code(),
            LedgerError::Unlock(e) => e.code(),
            LedgerError::Store(e) => e.code(),
        }
    }
}

impl TransferError {
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidAmount(_) => "INVALID_AMOUNT",
            TransferError::SelfTransfer(_) => "SELF_TRANSFER",
            TransferError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            TransferError::InsufficientFunds(..) => "INSUFFICIENT_FUNDS",
            TransferError::Failed(_) => "TRANSFER_FAILED",
        }
    }
}

impl LockError {
    pub fn code(&self) -> &'static str {
        match self {
            LockError::InvalidTerm(_) => "INVALID_TERM",
            LockError::BelowMinimum(..) => "MINIMUM_DEPOSIT",
            LockError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            LockError::InsufficientFunds(..) => "INSUFFICIENT_FUNDS",
            LockError::Failed(_) => "LOCK_FAILED",
        }
    }
}

impl UnlockError {
    pub fn code(&self) -> &'static str {
        match self {
            UnlockError::InvalidDepositId(_) => "INVALID_DEPOSIT_ID",
            UnlockError::DepositNotFound(_) => "DEPOSIT_NOT_FOUND",
            UnlockError::NotMature(..) => "DEPOSIT_NOT_MATURE",
            UnlockError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            UnlockError::Failed(_) => "UNLOCK_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct_per_kind() {
        let dep = DepositId::generate();
        let errors: Vec<(&'static str, LedgerError)> = vec![
            ("ACCOUNT_NOT_FOUND", LedgerError::AccountNotFound("a".into())),
            ("SELF_TRANSFER", TransferError::SelfTransfer("a".into()).into()),
            (
                "INVALID_AMOUNT",
                TransferError::InvalidAmount(Amount::ZERO).into(),
            ),
            ("INVALID_TERM", LockError::InvalidTerm(0).into()),
            (
                "INSUFFICIENT_FUNDS",
                TransferError::InsufficientFunds(
                    "a".into(),
                    Amount::from_scaled(100),
                    Amount::from_scaled(200),
                )
                .into(),
            ),
            (
                "MINIMUM_DEPOSIT",
                LockError::BelowMinimum(Amount::from_scaled(50_000), Amount::from_scaled(49_999))
                    .into(),
            ),
            (
                "INVALID_DEPOSIT_ID",
                UnlockError::InvalidDepositId("xyz".to_string()).into(),
            ),
            ("DEPOSIT_NOT_FOUND", UnlockError::DepositNotFound(dep).into()),
            (
                "DEPOSIT_NOT_MATURE",
                UnlockError::NotMature(dep, chrono::Utc::now()).into(),
            ),
            (
                "STORE_UNAVAILABLE",
                LedgerError::Store(StoreError::Unavailable("down".to_string())),
            ),
        ];

        for (expected, err) in errors {
            assert_eq!(err.code(), expected, "for {err}");
        }
    }

    #[test]
    fn commit_failures_carry_per_operation_codes() {
        let store = || StoreError::Unavailable("down".to_string());
        assert_eq!(TransferError::from(store()).code(), "TRANSFER_FAILED");
        assert_eq!(LockError::from(store()).code(), "LOCK_FAILED");
        assert_eq!(UnlockError::from(store()).code(), "UNLOCK_FAILED");
    }
}
