//! Cancellation for driver calls.
//!
//! A [`CancellationSource`] owns the right to cancel; every [`Context`]
//! derived from it observes the cancellation. Driver operations race each
//! backend call against [`Context::cancelled`] and return
//! [`DriverError::Cancelled`] as soon as the source fires.
//!
//! ```
//! use flatfs_driver::context::CancellationSource;
//! use flatfs_driver::error::DriverError;
//!
//! # tokio_test::block_on(async {
//! let source = CancellationSource::new();
//! let ctx = source.context();
//! assert!(!ctx.is_cancelled());
//!
//! source.cancel();
//! assert!(ctx.is_cancelled());
//! let result = ctx.run(async { Ok::<_, DriverError>(1) }).await;
//! assert!(matches!(result, Err(DriverError::Cancelled)));
//! # });
//! ```

use std::future::Future;

use tokio::sync::watch;

use crate::error::{DriverError, DriverResult};

/// Cancellation handle passed to every driver call.
///
/// Cloning is cheap; all clones observe the same source.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// `None` for a context that can never be cancelled.
    cancelled: Option<watch::Receiver<bool>>,
}

impl Context {
    /// A context that is never cancelled.
    #[must_use]
    pub fn background() -> Self {
        Self { cancelled: None }
    }

    /// Whether the source has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Return [`DriverError::Cancelled`] if the source has fired.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Cancelled`] when cancelled.
    pub fn check(&self) -> DriverResult<()> {
        if self.is_cancelled() {
            Err(DriverError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolve once the context is cancelled; never resolves otherwise.
    pub async fn cancelled(&self) {
        if let Some(rx) = &self.cancelled {
            let mut rx = rx.clone();
            let fired = rx.wait_for(|fired| *fired).await.is_ok();
            if fired {
                return;
            }
        }
        std::future::pending::<()>().await;
    }

    /// Drive `fut` to completion unless the context is cancelled first.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Cancelled`] if cancellation wins, otherwise the
    /// future's own error converted into a [`DriverError`].
    pub async fn run<T, E, F>(&self, fut: F) -> DriverResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<DriverError>,
    {
        self.check()?;
        tokio::select! {
            biased;
            () = self.cancelled() => Err(DriverError::Cancelled),
            result = fut => result.map_err(Into::into),
        }
    }
}

/// The cancelling side of a [`Context`].
#[derive(Debug)]
pub struct CancellationSource {
    tx: watch::Sender<bool>,
}

impl CancellationSource {
    /// Create a source that has not fired.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// A context observing this source.
    #[must_use]
    pub fn context(&self) -> Context {
        Context {
            cancelled: Some(self.tx.subscribe()),
        }
    }

    /// Cancel every derived context. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}
