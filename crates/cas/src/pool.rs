//! Bounded off-runtime execution of a [`Rescaler`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::{CasError, Rescaler, ScaleFactor, ScaledImage};

/// Concurrent scaling jobs allowed by default.
pub const DEFAULT_WORKERS: usize = 5;

/// Wall-clock bound on one scaling job.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs a [`Rescaler`] on the blocking thread pool, at most `workers` jobs
/// at a time and each bounded by a timeout.
///
/// A job that times out keeps its slot until the blocking call returns, so
/// hung jobs still count against the limit.
pub struct ScalePool<R> {
    rescaler: Arc<R>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl<R: Rescaler + 'static> ScalePool<R> {
    pub fn new(rescaler: R) -> Self {
        Self::with_limits(rescaler, DEFAULT_WORKERS, DEFAULT_TIMEOUT)
    }

    /// # Panics
    ///
    /// Panics if `workers` is zero.
    pub fn with_limits(rescaler: R, workers: usize, timeout: Duration) -> Self {
        assert!(workers > 0, "scale pool needs at least one worker");
        ScalePool {
            rescaler: Arc::new(rescaler),
            permits: Arc::new(Semaphore::new(workers)),
            timeout,
        }
    }

    pub fn rescaler(&self) -> &R {
        &self.rescaler
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Scale `image` by `factor` without blocking the calling task.
    pub async fn scale(&self, image: Vec<u8>, factor: ScaleFactor) -> Result<ScaledImage, CasError> {
        let permit = Arc::clone(&self.permits).acquire_owned().await?;
        let rescaler = Arc::clone(&self.rescaler);
        let job = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            rescaler.rescale(&image, factor)
        });

        match tokio::time::timeout(self.timeout, job).await {
            Ok(joined) => joined?,
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "scaling timed out");
                Err(CasError::Timeout(self.timeout))
            }
        }
    }
}
