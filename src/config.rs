//! Ledger policy knobs.

use chrono::TimeDelta;

use crate::Amount;

/// Policy configuration injected into the engine.
///
/// The month length is an explicit value rather than a constant: the
/// deposit term is `month * months`, and operators choosing a different
/// policy pass a different duration instead of patching the engine.
#[derive(Debug, Clone, Copy)]
pub struct LedgerConfig {
    /// Minimum amount for a locked deposit.
    pub min_lock: Amount,
    /// Length of one deposit-term month.
    pub month: TimeDelta,
    /// Default row bound for transaction history queries.
    pub history_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            min_lock: Amount::from_scaled(50_000), // 500.00
            month: TimeDelta::days(30),
            history_limit: 50,
        }
    }
}
