//! Read-retry policy: reads that fail with a transient store error are
//! retried with exponential backoff. Writes never go through here.

use std::{fmt::Display, future::Future, time::Duration};

use davinci_core::store::Transient;

const ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(50);

/// Run `read` up to three times, sleeping 50 ms then 100 ms between
/// attempts, as long as the failure is transient.
pub(crate) async fn read<T, E, F, Fut>(op: &'static str, mut read: F) -> Result<T, E>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
  E: Transient + Display,
{
  let mut delay = BASE_DELAY;
  let mut attempt = 1;
  loop {
    match read().await {
      Err(e) if e.is_transient() && attempt < ATTEMPTS => {
        tracing::debug!(op, attempt, error = %e, "transient read failure, retrying");
        tokio::time::sleep(delay).await;
        delay *= 2;
        attempt += 1;
      }
      other => return other,
    }
  }
}
