pub mod amount;
pub mod clock;
pub mod config;
pub mod csv;
pub mod engine;
pub mod model;
pub mod store;

pub use amount::Amount;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LedgerConfig;
pub use engine::{Ledger, LedgerError, LockError, TransferError, UnlockError};
pub use model::{Account, AccountKey, DepositId, LockedDeposit, Op, Transaction, TxId};
