use anyhow::Result;
use std::thread::sleep;
use std::time::Duration;

/// Retry an operation with exponential backoff.
pub fn with_retry<F, T>(operation: F, max_retries: u32) -> Result<T>
where
    F: Fn() -> Result<T>,
{
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_retries => {
                let backoff_ms = backoff_ms(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries,
                    backoff_ms,
                    "API call failed: {:#}",
                    e
                );
                sleep(Duration::from_millis(backoff_ms));
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(attempts = max_retries + 1, "API call failed");
                return Err(e);
            }
        }
    }
}

// 100ms, 200ms, 400ms, 800ms...
fn backoff_ms(attempt: u32) -> u64 {
    2_u64.saturating_pow(attempt).saturating_mul(100)
}
