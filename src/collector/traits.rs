//! Core collector traits and types.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

use crate::metrics::{ErrorKind, MetricDesc, MetricSink};
use crate::upstream::TransportError;

/// Errors that can occur while building or scraping a collector.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// A queued scrape did not get the scrape lock in time.
    #[error("scrape lock not acquired within {0:?}")]
    LockTimeout(Duration),

    /// A metric descriptor could not be built.
    #[error("invalid metric descriptor: {0}")]
    Descriptor(#[from] prometheus::Error),

    /// The upstream address does not form a valid URL.
    #[error("invalid upstream address: {0}")]
    Address(#[from] url::ParseError),

    /// The transport could not be built.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl CollectorError {
    /// Scrape error kind recorded when this error ends a scrape.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::LockTimeout(_) => Some(ErrorKind::LockTimeout),
            Self::Descriptor(_) | Self::Address(_) | Self::Transport(_) => None,
        }
    }
}

/// Core collector trait for scrape-time collectors.
///
/// # Error Handling Philosophy
///
/// Upstream problems are observations, not collector failures: a collector
/// skips the affected entity, logs, counts the failure through
/// [`MetricSink::record_error`] and keeps going. `collect()` returns
/// `Err` only when the scrape as a whole could not run.
#[async_trait::async_trait]
pub trait Collector: Send + Sync + 'static {
    /// Name used in logs and in the exporter's own metric labels.
    fn name(&self) -> &str;

    /// Every metric family this collector can emit.
    fn describe(&self) -> Vec<Arc<MetricDesc>>;

    /// Perform one scrape, writing samples into `sink`.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Scrape ran (possibly with skipped entities)
    /// - `Err(CollectorError::LockTimeout)`: A previous scrape held the lock too long
    async fn collect(&self, sink: &MetricSink) -> Result<(), CollectorError>;
}

/// Acquire `lock`, waiting at most `deadline`.
///
/// Holding the returned guard for the whole fetch sequence keeps at most one
/// sequence in flight per collector. Waiters do their own fetch afterwards.
pub(crate) async fn lock_scrape(
    lock: &Mutex<()>,
    deadline: Duration,
) -> Result<MutexGuard<'_, ()>, CollectorError> {
    tokio::time::timeout(deadline, lock.lock())
        .await
        .map_err(|_| CollectorError::LockTimeout(deadline))
}
