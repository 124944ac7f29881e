//! CSV batch surface: operation reader and balances writer.
//!
//! The ops file has the header `op,account,to,name,amount,months`; fields a
//! given op does not use stay empty. Deposit ids are generated at runtime,
//! so `unlock` addresses deposits by owning account (every matured deposit
//! is withdrawn) rather than by id.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::model::Op;
use crate::{Account, Amount};

/// Errors that can occur when parsing csv rows
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized operation '{op}'")]
    UnrecognizedOp { line: usize, op: String },

    #[error("line {line}: {op} missing {field}")]
    MissingField {
        line: usize,
        op: &'static str,
        field: &'static str,
    },

    #[error("line {line}: invalid amount '{value}'")]
    BadAmount { line: usize, value: String },

    #[error("line {line}: invalid term of {months} months")]
    BadTerm { line: usize, months: u32 },
}

#[derive(Debug, Deserialize)]
struct InputRow {
    op: String,
    account: Option<String>,
    to: Option<String>,
    name: Option<String>,
    amount: Option<String>,
    months: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OutputRow {
    account: String,
    name: String,
    balance: String,
}

/// Read ledger operations from a csv file
pub fn read_ops(path: impl AsRef<Path>) -> impl Iterator<Item = Result<Op, CsvError>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .expect("failed to open csv file");

    reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            parse_row(line, row)
        })
}

fn parse_row(line: usize, row: InputRow) -> Result<Op, CsvError> {
    let require = |field: Option<String>, op: &'static str, name: &'static str| {
        field.ok_or(CsvError::MissingField {
            line,
            op,
            field: name,
        })
    };
    let parse_amount = |value: String| {
        value
            .parse::<Amount>()
            .map_err(|_| CsvError::BadAmount { line, value })
    };
    // The engine trusts its callers on amount shape, so movement amounts
    // are range-checked here at the input boundary.
    let parse_positive = |value: String| {
        let amount = parse_amount(value.clone())?;
        if !amount.is_positive() {
            return Err(CsvError::BadAmount { line, value });
        }
        Ok(amount)
    };

    match row.op.as_str() {
        "register" => {
            let key = require(row.account, "register", "account")?;
            let name = require(row.name, "register", "name")?;
            let opening = match row.amount {
                Some(value) => {
                    let amount = parse_amount(value.clone())?;
                    if amount < Amount::ZERO {
                        return Err(CsvError::BadAmount { line, value });
                    }
                    amount
                }
                None => Amount::ZERO,
            };
            Ok(Op::Register {
                key: key.into(),
                name,
                opening,
            })
        }
        "transfer" => {
            let from = require(row.account, "transfer", "account")?;
            let to = require(row.to, "transfer", "to")?;
            let amount = parse_positive(require(row.amount, "transfer", "amount")?)?;
            Ok(Op::Transfer {
                from: from.into(),
                to: to.into(),
                amount,
            })
        }
        "lock" => {
            let key = require(row.account, "lock", "account")?;
            let amount = parse_positive(require(row.amount, "lock", "amount")?)?;
            let months = row.months.ok_or(CsvError::MissingField {
                line,
                op: "lock",
                field: "months",
            })?;
            if months == 0 {
                return Err(CsvError::BadTerm { line, months });
            }
            Ok(Op::Lock {
                key: key.into(),
                amount,
                months,
            })
        }
        "unlock" => {
            let key = require(row.account, "unlock", "account")?;
            Ok(Op::Unlock { key: key.into() })
        }
        "sweep" => Ok(Op::Sweep),
        other => Err(CsvError::UnrecognizedOp {
            line,
            op: other.to_string(),
        }),
    }
}

/// Write account balances to stdout in csv format
pub fn write_accounts(accounts: impl IntoIterator<Item = Account>) {
    let stdout = io::stdout();
    let mut writer = csv::Writer::from_writer(stdout.lock());

    for account in accounts {
        let row = OutputRow {
            account: account.key.to_string(),
            name: account.name,
            balance: account.balance.to_string(),
        };
        writer.serialize(&row).expect("failed to write csv row");
    }

    writer.flush().expect("failed to flush csv writer");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "op,account,to,name,amount,months\n";

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn read_register() {
        let file = write_csv(&format!("{HEADER}register,0911000001,,Abebe,1000.00,\n"));
        let ops: Vec<_> = read_ops(file.path()).collect();

        assert_eq!(ops.len(), 1);
        match ops[0].as_ref().unwrap() {
            Op::Register { key, name, opening } => {
                assert_eq!(key, &"0911000001".into());
                assert_eq!(name, "Abebe");
                assert_eq!(*opening, "1000.00".parse().unwrap());
            }
            other => panic!("expected register, got {other:?}"),
        }
    }

    #[test]
    fn read_register_defaults_opening_to_zero() {
        let file = write_csv(&format!("{HEADER}register,0911000001,,Abebe,,\n"));
        let op = read_ops(file.path()).next().unwrap().unwrap();
        assert!(matches!(op, Op::Register { opening, .. } if opening == Amount::ZERO));
    }

    #[test]
    fn read_transfer() {
        let file = write_csv(&format!("{HEADER}transfer,0911000001,0911000002,,250.00,\n"));
        let op = read_ops(file.path()).next().unwrap().unwrap();

        match op {
            Op::Transfer { from, to, amount } => {
                assert_eq!(from, "0911000001".into());
                assert_eq!(to, "0911000002".into());
                assert_eq!(amount, "250.00".parse().unwrap());
            }
            other => panic!("expected transfer, got {other:?}"),
        }
    }

    #[test]
    fn read_lock_and_unlock() {
        let file = write_csv(&format!(
            "{HEADER}lock,0911000001,,,500.00,2\nunlock,0911000001,,,,\n"
        ));
        let ops: Vec<_> = read_ops(file.path()).map(Result::unwrap).collect();

        assert!(matches!(
            &ops[0],
            Op::Lock { amount, months: 2, .. } if *amount == "500.00".parse().unwrap()
        ));
        assert!(matches!(&ops[1], Op::Unlock { .. }));
    }

    #[test]
    fn read_sweep() {
        let file = write_csv(&format!("{HEADER}sweep,,,,,\n"));
        assert!(matches!(read_ops(file.path()).next(), Some(Ok(Op::Sweep))));
    }

    #[test]
    fn unrecognized_op_is_an_error() {
        let file = write_csv(&format!("{HEADER}refund,0911000001,,,1.00,\n"));
        let result = read_ops(file.path()).next().unwrap();
        assert!(matches!(result, Err(CsvError::UnrecognizedOp { line: 2, .. })));
    }

    #[test]
    fn missing_amount_is_an_error() {
        let file = write_csv(&format!("{HEADER}transfer,0911000001,0911000002,,,\n"));
        let result = read_ops(file.path()).next().unwrap();
        assert!(matches!(
            result,
            Err(CsvError::MissingField { line: 2, field: "amount", .. })
        ));
    }

    #[test]
    fn bad_amount_is_an_error() {
        let file = write_csv(&format!("{HEADER}transfer,0911000001,0911000002,,1.234,\n"));
        let result = read_ops(file.path()).next().unwrap();
        assert!(matches!(result, Err(CsvError::BadAmount { line: 2, .. })));
    }

    #[test]
    fn non_positive_movement_amount_is_an_error() {
        let file = write_csv(&format!(
            "{HEADER}transfer,0911000001,0911000002,,0.00,\nlock,0911000001,,,-500.00,1\n"
        ));
        let results: Vec<_> = read_ops(file.path()).collect();
        assert!(matches!(&results[0], Err(CsvError::BadAmount { line: 2, .. })));
        assert!(matches!(&results[1], Err(CsvError::BadAmount { line: 3, .. })));
    }

    #[test]
    fn zero_term_is_an_error() {
        let file = write_csv(&format!("{HEADER}lock,0911000001,,,500.00,0\n"));
        let result = read_ops(file.path()).next().unwrap();
        assert!(matches!(result, Err(CsvError::BadTerm { line: 2, months: 0 })));
    }

    #[test]
    fn errors_carry_line_numbers_past_good_rows() {
        let file = write_csv(&format!(
            "{HEADER}register,0911000001,,Abebe,100.00,\nnope,,,,,\n"
        ));
        let results: Vec<_> = read_ops(file.path()).collect();
        assert!(results[0].is_ok());
        assert!(matches!(
            &results[1],
            Err(CsvError::UnrecognizedOp { line: 3, .. })
        ));
    }
}
