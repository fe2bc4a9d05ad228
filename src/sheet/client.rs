//! Range operations against one spreadsheet.
//!
//! Every call checks its preconditions, attaches the current bearer token,
//! passes through a single FIFO gate that spaces consecutive requests, and is
//! retried with exponential backoff when the failure is transient.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use super::error::{ApiFailure, SheetError};
use super::layout::SheetLayout;
use super::state::{ClientState, Lifecycle};
use super::transport::{CallContext, SheetsTransport, UpdateSummary, ValueRange};
use crate::auth::CredentialStore;

/// Backoff and pacing parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Base delay used instead of `base_delay` after a 429.
    pub rate_limit_base_delay: Duration,
    /// Minimum gap between two consecutive requests.
    pub request_spacing: Duration,
}

impl RetryPolicy {
    /// No delays at all; used by tests and local fakes.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            rate_limit_base_delay: Duration::ZERO,
            request_spacing: Duration::ZERO,
        }
    }

    /// Delay before the next attempt after `failures` failed attempts.
    pub fn delay_for(&self, error: &SheetError, failures: u32) -> Duration {
        let base = match error {
            SheetError::RateLimited => self.rate_limit_base_delay,
            _ => self.base_delay,
        };
        base.saturating_mul(2u32.saturating_pow(failures))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            rate_limit_base_delay: Duration::from_millis(5000),
            request_spacing: Duration::from_millis(1000),
        }
    }
}

pub struct TableClient<T: SheetsTransport> {
    transport: T,
    credentials: Arc<CredentialStore>,
    spreadsheet_id: Option<String>,
    layout: SheetLayout,
    policy: RetryPolicy,
    lifecycle: Lifecycle,
    /// Time the previous request finished; holding the lock is the queue.
    gate: Mutex<Option<Instant>>,
    last_error: RwLock<Option<String>>,
}

impl<T: SheetsTransport> TableClient<T> {
    pub fn new(
        transport: T,
        credentials: Arc<CredentialStore>,
        spreadsheet_id: Option<String>,
        layout: SheetLayout,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            credentials,
            spreadsheet_id: spreadsheet_id.filter(|id| !id.trim().is_empty()),
            layout,
            policy,
            lifecycle: Lifecycle::new(),
            gate: Mutex::new(None),
            last_error: RwLock::new(None),
        }
    }

    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn state(&self) -> ClientState {
        self.lifecycle.state()
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle.state() == ClientState::Ready
    }

    pub async fn is_signed_in(&self) -> bool {
        self.credentials.is_signed_in().await
    }

    /// Brings the client to `Ready`, or `Failed` with the reason.
    ///
    /// Calling this while already ready is a no-op; while another
    /// initialization is in flight it waits for that one to settle.
    pub async fn initialize(&self) -> Result<(), SheetError> {
        match self.lifecycle.state() {
            ClientState::Ready => return Ok(()),
            ClientState::Initializing => return self.ready().await,
            _ => {}
        }

        if self
            .lifecycle
            .transition_to(ClientState::Initializing)
            .is_err()
        {
            // Lost the race to another caller.
            return self.ready().await;
        }

        let outcome = match self.spreadsheet_id {
            None => Err(SheetError::MissingSpreadsheetId),
            Some(_) => self
                .transport
                .connect()
                .await
                .map_err(|failure| SheetError::Api(failure.message)),
        };

        match outcome {
            Ok(()) => {
                let _ = self.lifecycle.transition_to(ClientState::Ready);
                tracing::info!(sheet = self.layout.sheet_name(), "spreadsheet client ready");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "spreadsheet client failed to initialize");
                let _ = self
                    .lifecycle
                    .transition_to(ClientState::Failed(e.to_string()));
                self.record_error(&e).await;
                Err(e)
            }
        }
    }

    /// Resolves once initialization has settled; errors unless it settled
    /// on `Ready`.
    pub async fn ready(&self) -> Result<(), SheetError> {
        match self.lifecycle.settled().await {
            ClientState::Ready => Ok(()),
            other => Err(SheetError::NotReady(other)),
        }
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    pub async fn clear_error(&self) {
        *self.last_error.write().await = None;
    }

    /// Stores a message raised outside a sheet call (e.g. a failed replay).
    pub async fn set_last_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }

    pub async fn read_range(&self, range: &str) -> Result<ValueRange, SheetError> {
        self.execute("read", range, |ctx| self.transport.get_values(ctx, range))
            .await
    }

    pub async fn write_range(
        &self,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<UpdateSummary, SheetError> {
        self.execute("write", range, |ctx| {
            self.transport.update_values(ctx, range, rows)
        })
        .await
    }

    pub async fn append_rows(
        &self,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<UpdateSummary, SheetError> {
        self.execute("append", range, |ctx| {
            self.transport.append_values(ctx, range, rows)
        })
        .await
    }

    pub async fn clear_range(&self, range: &str) -> Result<String, SheetError> {
        self.execute("clear", range, |ctx| self.transport.clear_values(ctx, range))
            .await
    }

    async fn preconditions(&self) -> Result<CallContext, SheetError> {
        let access_token = self
            .credentials
            .get()
            .await
            .ok_or(SheetError::NotSignedIn)?;
        if self.lifecycle.state() == ClientState::Initializing {
            self.ready().await?;
        }
        let state = self.lifecycle.state();
        if state != ClientState::Ready {
            return Err(SheetError::NotReady(state));
        }
        let spreadsheet_id = self
            .spreadsheet_id
            .clone()
            .ok_or(SheetError::MissingSpreadsheetId)?;

        Ok(CallContext {
            spreadsheet_id,
            access_token,
        })
    }

    async fn execute<R, F, Fut>(
        &self,
        operation: &'static str,
        range: &str,
        call: F,
    ) -> Result<R, SheetError>
    where
        F: Fn(CallContext) -> Fut,
        Fut: Future<Output = Result<R, ApiFailure>>,
    {
        self.clear_error().await;

        let ctx = match self.preconditions().await {
            Ok(ctx) => ctx,
            Err(e) => {
                self.record_error(&e).await;
                return Err(e);
            }
        };

        let mut failures = 0;
        loop {
            let failure = match self.paced(call(ctx.clone())).await {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            let error = SheetError::classify(&failure, range);
            if !error.is_transient() || failures >= self.policy.max_retries {
                tracing::warn!(operation, range, error = %error, "sheet call failed");
                if error == SheetError::Unauthenticated {
                    if let Err(e) = self.credentials.clear().await {
                        tracing::warn!(error = %e, "failed to clear stored token");
                    }
                }
                self.record_error(&error).await;
                return Err(error);
            }

            failures += 1;
            let delay = self.policy.delay_for(&error, failures);
            tracing::debug!(
                operation,
                range,
                attempt = failures,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "retrying sheet call"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Runs one request through the gate, keeping `request_spacing` between
    /// the end of the previous request and the start of this one.
    async fn paced<Fut, R>(&self, request: Fut) -> R
    where
        Fut: Future<Output = R>,
    {
        let mut previous = self.gate.lock().await;
        if let Some(finished) = *previous {
            let ready_at = finished + self.policy.request_spacing;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        let result = request.await;
        *previous = Some(Instant::now());
        result
    }

    async fn record_error(&self, error: &SheetError) {
        *self.last_error.write().await = Some(error.to_string());
    }
}
