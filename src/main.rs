use std::env;
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use ledger_eng::csv::{read_ops, write_accounts};
use ledger_eng::{Ledger, LedgerConfig, SystemClock};

/// How often the background sweep advances matured deposits.
const SWEEP_PERIOD: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let path = env::args()
        .nth(1)
        .expect("usage: ledger-eng <ops.csv> [month-days]");

    if !path.ends_with(".csv") {
        warn!(path, "input file seems to not be a csv file");
    }

    // The deposit-term month length is an explicit policy choice, not a
    // hidden constant.
    let mut config = LedgerConfig::default();
    if let Some(days) = env::args().nth(2) {
        let days: i64 = days.parse().expect("month-days must be an integer");
        config.month = TimeDelta::days(days);
    }

    let ledger = Ledger::new(Arc::new(SystemClock), config);
    let (op_sender, op_receiver) = tokio::sync::mpsc::channel(16);

    tokio::spawn(async move {
        for result in read_ops(&path) {
            match result {
                Ok(op) => {
                    op_sender.send(op).await.unwrap();
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    // Periodic sweep, independent of the request-driven operations.
    let sweeper = {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(SWEEP_PERIOD);
            loop {
                tick.tick().await;
                ledger.sweep_matured().await;
            }
        })
    };

    ledger.run(ReceiverStream::new(op_receiver)).await;
    sweeper.abort();

    write_accounts(ledger.accounts().await);
}
