//! Bracket fetching with per-attempt timeouts, bounded retries and
//! cancellation.
//!
//! One logical fetch is an explicit loop:
//!
//! 1. Reject years outside the configured set (no I/O).
//! 2. Run one attempt against the [`BracketSource`], bounded by
//!    [`FetcherConfig::timeout`].
//! 3. On success, validate the payload into a [`BracketTable`]. Bad data is
//!    final ([`TaxApiError::InvalidResponse`]).
//! 4. On a transient failure, wait `retry_base_delay * 2^n` and go to 2,
//!    until [`FetcherConfig::max_retries`] retries are spent.
//!
//! Cancellation is observed both while an attempt is in flight and while
//! waiting between attempts.

use std::time::Duration;

use tax_core::{BracketTable, TaxApiError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::FetcherConfig;
use crate::source::{AttemptError, BracketSource};

/// Retrieves validated bracket tables from a [`BracketSource`].
///
/// Holds no mutable state, so a single fetcher can serve any number of
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct BracketFetcher<S> {
    source: S,
    config: FetcherConfig,
}

impl<S: BracketSource> BracketFetcher<S> {
    pub fn new(
        source: S,
        config: FetcherConfig,
    ) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fails with [`TaxApiError::InvalidTaxYear`] when `tax_year` is not in
    /// the configured supported set.
    pub fn check_year(
        &self,
        tax_year: i32,
    ) -> Result<(), TaxApiError> {
        if self.config.supported_years.contains(tax_year) {
            Ok(())
        } else {
            Err(TaxApiError::InvalidTaxYear {
                year: tax_year,
                supported: self.config.supported_years.clone(),
            })
        }
    }

    /// Fetches the bracket table for `tax_year`, retrying transient failures.
    pub async fn fetch_brackets(
        &self,
        tax_year: i32,
    ) -> Result<BracketTable, TaxApiError> {
        self.fetch_brackets_cancellable(tax_year, &CancellationToken::new())
            .await
    }

    /// Like [`fetch_brackets`](Self::fetch_brackets), but gives up with
    /// [`TaxApiError::Cancelled`] once `deadline` has elapsed overall.
    ///
    /// The per-attempt timeout still applies to each attempt independently.
    pub async fn fetch_brackets_with_deadline(
        &self,
        tax_year: i32,
        deadline: Duration,
    ) -> Result<BracketTable, TaxApiError> {
        tokio::time::timeout(deadline, self.fetch_brackets(tax_year))
            .await
            .unwrap_or_else(|_| Err(deadline_exceeded(tax_year, deadline)))
    }

    /// Fetches the bracket table for `tax_year`, stopping promptly with
    /// [`TaxApiError::Cancelled`] when `cancel` fires.
    pub async fn fetch_brackets_cancellable(
        &self,
        tax_year: i32,
        cancel: &CancellationToken,
    ) -> Result<BracketTable, TaxApiError> {
        self.check_year(tax_year)?;

        let location = self.source.location(tax_year);
        let mut backoff =
            ExponentialBackoff::new(self.config.retry_base_delay, self.config.max_retries);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            debug!(tax_year, attempt, %location, "fetching tax brackets");

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(cancelled()),
                result = tokio::time::timeout(self.config.timeout, self.source.fetch_once(tax_year)) => result,
            };

            let failure = match outcome {
                Ok(Ok(response)) => {
                    let table = response.into_table().map_err(|e| {
                        warn!(tax_year, error = %e, "bracket source returned an invalid table");
                        TaxApiError::from(e)
                    })?;
                    info!(tax_year, brackets = table.len(), attempts = attempt, "fetched tax brackets");
                    return Ok(table);
                }
                Ok(Err(err)) => err,
                Err(_) => AttemptError::Timeout(self.config.timeout),
            };

            if !failure.is_retryable() {
                warn!(tax_year, attempt, error = %failure, "bracket fetch failed permanently");
                return Err(terminal_error(failure, attempt));
            }

            let Some(delay) = backoff.next_backoff() else {
                warn!(tax_year, attempts = attempt, error = %failure, "bracket fetch retries exhausted");
                return Err(exhausted_error(failure, attempt));
            };

            warn!(
                tax_year,
                attempt,
                max_retries = self.config.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "bracket fetch failed, retrying"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(cancelled()),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}

pub(crate) fn deadline_exceeded(
    tax_year: i32,
    deadline: Duration,
) -> TaxApiError {
    warn!(tax_year, deadline_ms = deadline.as_millis() as u64, "overall deadline exceeded");
    TaxApiError::Cancelled {
        reason: format!("deadline of {}ms exceeded", deadline.as_millis()),
    }
}

fn cancelled() -> TaxApiError {
    TaxApiError::Cancelled {
        reason: "cancelled by caller".to_string(),
    }
}

/// Maps a failure that will not be retried onto the public taxonomy.
fn terminal_error(
    failure: AttemptError,
    attempts: u32,
) -> TaxApiError {
    match failure {
        AttemptError::MalformedBody(reason) => TaxApiError::InvalidResponse { reason },
        AttemptError::Status {
            status,
            message,
            code,
        } => TaxApiError::Server {
            message,
            status,
            code,
        },
        transient @ (AttemptError::Timeout(_) | AttemptError::Transport(_)) => {
            exhausted_error(transient, attempts)
        }
    }
}

fn exhausted_error(
    failure: AttemptError,
    attempts: u32,
) -> TaxApiError {
    TaxApiError::Network {
        status: failure.status(),
        code: failure.code().map(str::to_string),
        message: failure.to_string(),
        attempts,
    }
}

/// Backoff schedule: retry `n` (zero-based) waits `base_delay * 2^n`, for at
/// most `max_retries` retries.
#[derive(Debug)]
struct ExponentialBackoff {
    retries: u32,
    max_retries: u32,
    base_delay: Duration,
}

impl ExponentialBackoff {
    const fn new(
        base_delay: Duration,
        max_retries: u32,
    ) -> Self {
        Self {
            retries: 0,
            max_retries,
            base_delay,
        }
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.retries >= self.max_retries {
            return None;
        }

        let factor = 2u32.saturating_pow(self.retries);
        self.retries += 1;
        Some(self.base_delay.saturating_mul(factor))
    }
}
