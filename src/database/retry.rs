use std::future::Future;
use std::time::Duration;
use tracing::warn;

use super::{ErrorExt2, Result};

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(50);

/// Runs a storage operation, retrying it with exponential backoff when
/// it fails with a transient connectivity fault.
///
/// Anything that is not transient (constraint violations, bad input,
/// missing rows) surfaces on the first attempt; those failures are
/// deterministic and retrying them only hides bugs.
pub async fn with_backoff<T, F, Fut>(operation: &str, mut run: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match run().await {
            Ok(value) => return Ok(value),
            Err(report) if report.is_transient() && attempt < MAX_ATTEMPTS => {
                let delay = BASE_DELAY * 2u32.pow(attempt - 1);
                warn!(
                    %operation,
                    attempt,
                    ?delay,
                    "transient database failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(report) => return Err(report),
        }
    }
}
