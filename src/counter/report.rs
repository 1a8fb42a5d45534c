// src/counter/report.rs
// =============================================================================
// Periodic console report of the byte totals.
//
// Prints "Data written: <MB>MB, Data read: <MB>MB" every interval until the
// returned task handle is aborted. Megabytes are bytes / 1048576 with exactly
// four decimal digits, rounded half-up.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::ByteCounter;

const BYTES_IN_MEGABYTE: u64 = 1_048_576;
const SCALE: u64 = 10_000;

// Converts a byte count to megabytes with four decimals, half-up.
//
// Integer arithmetic only, so large totals don't lose precision:
//   524288  -> "0.5000"
//   53      -> "0.0001"  (0.0000505... rounds up)
//   52      -> "0.0000"
pub fn to_megabytes(bytes: u64) -> String {
    let scaled = u128::from(bytes) * u128::from(SCALE);
    let mb = u128::from(BYTES_IN_MEGABYTE);
    let mut units = scaled / mb;
    if (scaled % mb) * 2 >= mb {
        units += 1;
    }
    let scale = u128::from(SCALE);
    format!("{}.{:04}", units / scale, units % scale)
}

pub fn format_report(counter: &ByteCounter) -> String {
    format!(
        "Data written: {}MB, Data read: {}MB",
        to_megabytes(counter.bytes_written()),
        to_megabytes(counter.bytes_read())
    )
}

/// Spawns the reporter. It runs until the handle is aborted (at shutdown).
pub fn spawn_reporter(counter: Arc<ByteCounter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            println!("{}", format_report(&counter));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0.0000")]
    #[case(52, "0.0000")]
    #[case(53, "0.0001")]
    #[case(524_288, "0.5000")]
    #[case(1_048_576, "1.0000")]
    #[case(1_572_864, "1.5000")]
    #[case(10 * 1_048_576 + 1_049, "10.0010")]
    #[case(u64::MAX, "17592186044416.0000")]
    fn test_to_megabytes(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(to_megabytes(bytes), expected);
    }

    #[test]
    fn test_format_report() {
        let counter = ByteCounter::new();
        counter.record_written(1_048_576);
        counter.record_read(524_288);
        assert_eq!(
            format_report(&counter),
            "Data written: 1.0000MB, Data read: 0.5000MB"
        );
    }

    #[tokio::test]
    async fn test_reporter_runs_until_aborted() {
        let counter = Arc::new(ByteCounter::new());
        let handle = spawn_reporter(Arc::clone(&counter), Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        handle.abort();
        let err = handle.await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
