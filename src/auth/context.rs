//! Explicit context handed to every validator, issuer and gate
//!
//! Holds the store handle, the clock and the per-call store deadline. There
//! is no process-wide instance; callers build one and clone it where needed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::auth::clock::{Clock, SystemClock};
use crate::store::CredentialStore;
use crate::types::{Result, TurnstileError};

/// Default deadline for a single store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Clone)]
pub struct AuthContext {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl AuthContext {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    /// Run a store call under the configured deadline.
    ///
    /// An elapsed deadline is reported as `StoreUnavailable`, never as a
    /// missing record.
    pub async fn bounded<T, F>(&self, op: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    op,
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    "store call timed out"
                );
                Err(TurnstileError::StoreUnavailable(format!(
                    "{} timed out after {}ms",
                    op,
                    self.store_timeout.as_millis()
                )))
            }
        }
    }
}
