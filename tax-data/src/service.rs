//! The entry point collaborators call: validate, fetch, calculate.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tax_core::{
    BracketTable, MarginalTaxCalculator, TaxApiError, TaxCalculationRequest,
    TaxCalculationResult,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::BracketCache;
use crate::config::FetcherConfig;
use crate::fetcher::{BracketFetcher, deadline_exceeded};
use crate::http::{ClientBuildError, HttpBracketSource};
use crate::source::BracketSource;

/// Calculates marginal tax against bracket tables from a [`BracketSource`].
///
/// The only state shared between calls is the optional [`BracketCache`], so
/// a service can sit behind an `Arc` and serve concurrent requests.
#[derive(Debug)]
pub struct TaxService<S> {
    fetcher: BracketFetcher<S>,
    cache: Option<BracketCache>,
}

impl TaxService<HttpBracketSource> {
    /// Service backed by the HTTP bracket API at `config.base_url`.
    pub fn http(config: FetcherConfig) -> Result<Self, ClientBuildError> {
        let source = HttpBracketSource::new(&config)?;
        Ok(Self::new(source, config))
    }
}

impl<S: BracketSource> TaxService<S> {
    pub fn new(
        source: S,
        config: FetcherConfig,
    ) -> Self {
        Self {
            fetcher: BracketFetcher::new(source, config),
            cache: None,
        }
    }

    /// Keep each successfully fetched table for the life of the service.
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(BracketCache::new());
        self
    }

    pub fn cache(&self) -> Option<&BracketCache> {
        self.cache.as_ref()
    }

    pub async fn fetch_brackets(
        &self,
        tax_year: i32,
    ) -> Result<BracketTable, TaxApiError> {
        self.fetch_brackets_cancellable(tax_year, &CancellationToken::new())
            .await
    }

    pub async fn fetch_brackets_cancellable(
        &self,
        tax_year: i32,
        cancel: &CancellationToken,
    ) -> Result<BracketTable, TaxApiError> {
        let table = self.table_for(tax_year, cancel).await?;
        Ok(Arc::unwrap_or_clone(table))
    }

    pub async fn calculate(
        &self,
        request: &TaxCalculationRequest,
    ) -> Result<TaxCalculationResult, TaxApiError> {
        self.calculate_cancellable(request, &CancellationToken::new())
            .await
    }

    /// Like [`calculate`](Self::calculate), but gives up with
    /// [`TaxApiError::Cancelled`] once `deadline` has elapsed overall.
    ///
    /// Input validation still fails immediately, and the per-attempt timeout
    /// still applies to each fetch attempt.
    pub async fn calculate_with_deadline(
        &self,
        request: &TaxCalculationRequest,
        deadline: Duration,
    ) -> Result<TaxCalculationResult, TaxApiError> {
        tokio::time::timeout(deadline, self.calculate(request))
            .await
            .unwrap_or_else(|_| Err(deadline_exceeded(request.tax_year, deadline)))
    }

    /// Validates `request`, obtains the table for its year and runs the
    /// calculator.
    ///
    /// # Errors
    ///
    /// - [`TaxApiError::InvalidIncome`] / [`TaxApiError::InvalidTaxYear`]
    ///   before any fetch is attempted, income checked first
    /// - [`TaxApiError::InvalidResponse`] when the fetched table does not
    ///   extend to the requested income
    /// - any fetch error from [`BracketFetcher`]
    pub async fn calculate_cancellable(
        &self,
        request: &TaxCalculationRequest,
        cancel: &CancellationToken,
    ) -> Result<TaxCalculationResult, TaxApiError> {
        let annual_income = request.annual_income;
        let tax_year = request.tax_year;

        if annual_income < Decimal::ZERO {
            return Err(TaxApiError::InvalidIncome {
                income: annual_income,
            });
        }
        self.fetcher.check_year(tax_year)?;

        let table = self.table_for(tax_year, cancel).await?;
        if !table.covers(annual_income) {
            return Err(TaxApiError::InvalidResponse {
                reason: format!(
                    "brackets for {tax_year} end at {} and do not cover income {annual_income}",
                    table.upper_bound().unwrap_or_default()
                ),
            });
        }

        let result = MarginalTaxCalculator::new(&table).calculate(annual_income)?;
        info!(
            tax_year,
            %annual_income,
            total_tax = %result.total_tax,
            effective_rate = %result.effective_rate,
            "calculated marginal tax"
        );

        Ok(result)
    }

    async fn table_for(
        &self,
        tax_year: i32,
        cancel: &CancellationToken,
    ) -> Result<Arc<BracketTable>, TaxApiError> {
        let Some(cache) = &self.cache else {
            let table = self.fetcher.fetch_brackets_cancellable(tax_year, cancel).await?;
            return Ok(Arc::new(table));
        };

        if let Some(table) = cache.get(tax_year) {
            debug!(tax_year, "bracket cache hit");
            return Ok(table);
        }

        let table = self.fetcher.fetch_brackets_cancellable(tax_year, cancel).await?;
        Ok(cache.insert(tax_year, table))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::source::AttemptError;
    use crate::testing::{
        BOUNDED_AT_20000, FEDERAL_2022, NON_CONTIGUOUS, StubSource, brackets, stub,
    };

    fn service(source: StubSource) -> TaxService<StubSource> {
        TaxService::new(source, FetcherConfig::default())
    }

    fn request(
        income: Decimal,
        year: i32,
    ) -> TaxCalculationRequest {
        TaxCalculationRequest::new(income, year)
    }

    // =========================================================================
    // calculate
    // =========================================================================

    #[tokio::test]
    async fn calculates_income_inside_second_bracket() {
        let (source, calls) = stub(|_| Ok(brackets(FEDERAL_2022)));

        let result = service(source)
            .calculate(&request(dec!(50000), 2022))
            .await
            .unwrap();

        assert_eq!(result.total_tax, dec!(7500));
        assert_eq!(result.effective_rate, dec!(0.15));
        assert_eq!(result.per_bracket.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn calculates_income_across_brackets() {
        let (source, _calls) = stub(|_| Ok(brackets(FEDERAL_2022)));

        let result = service(source)
            .calculate(&request(dec!(100000), 2022))
            .await
            .unwrap();

        assert_eq!(result.total_tax, dec!(17739.165));
        assert_eq!(result.effective_rate, dec!(0.17739165));
        assert_eq!(result.marginal_rate(), dec!(0.205));
    }

    #[tokio::test]
    async fn zero_income_owes_nothing() {
        let (source, _calls) = stub(|_| Ok(brackets(FEDERAL_2022)));

        let result = service(source)
            .calculate(&request(dec!(0), 2022))
            .await
            .unwrap();

        assert_eq!(result.total_tax, dec!(0));
        assert_eq!(result.effective_rate, dec!(0));
        assert!(result.per_bracket.is_empty());
    }

    #[tokio::test]
    async fn repeated_calculations_agree() {
        let (source, _calls) = stub(|_| Ok(brackets(FEDERAL_2022)));
        let service = service(source);
        let request = request(dec!(123456.78), 2022);

        let first = service.calculate(&request).await.unwrap();
        let second = service.calculate(&request).await.unwrap();

        assert_eq!(first, second);
    }

    // =========================================================================
    // validation before I/O
    // =========================================================================

    #[tokio::test]
    async fn unsupported_year_makes_no_call() {
        let (source, calls) = stub(|_| Ok(brackets(FEDERAL_2022)));

        let err = service(source)
            .calculate(&request(dec!(50000), 2023))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "INVALID_TAX_YEAR");
        assert_eq!(
            err.to_string(),
            "Tax year 2023 is not supported. Supported years: 2019, 2020, 2021, 2022"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn negative_income_makes_no_call() {
        let (source, calls) = stub(|_| Ok(brackets(FEDERAL_2022)));

        let err = service(source)
            .calculate(&request(dec!(-1), 2022))
            .await
            .unwrap_err();

        assert_eq!(err, TaxApiError::InvalidIncome { income: dec!(-1) });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn income_is_checked_before_year() {
        let (source, _calls) = stub(|_| Ok(brackets(FEDERAL_2022)));

        let err = service(source)
            .calculate(&request(dec!(-1), 2023))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "INVALID_INCOME");
    }

    // =========================================================================
    // bad tables
    // =========================================================================

    #[tokio::test]
    async fn non_contiguous_table_is_rejected() {
        let (source, calls) = stub(|_| Ok(brackets(NON_CONTIGUOUS)));

        let err = service(source)
            .calculate(&request(dec!(50000), 2022))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "INVALID_RESPONSE");
        assert!(!err.is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn table_below_income_is_rejected() {
        let (source, _calls) = stub(|_| Ok(brackets(BOUNDED_AT_20000)));

        let err = service(source)
            .calculate(&request(dec!(25000), 2022))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TaxApiError::InvalidResponse {
                reason: "brackets for 2022 end at 20000 and do not cover income 25000"
                    .to_string(),
            }
        );
    }

    #[tokio::test]
    async fn bounded_table_covering_income_is_used() {
        let (source, _calls) = stub(|_| Ok(brackets(BOUNDED_AT_20000)));

        let result = service(source)
            .calculate(&request(dec!(20000), 2022))
            .await
            .unwrap();

        assert_eq!(result.total_tax, dec!(3000));
    }

    // =========================================================================
    // cache
    // =========================================================================

    #[tokio::test]
    async fn cached_table_is_reused() {
        let (source, calls) = stub(|_| Ok(brackets(FEDERAL_2022)));
        let service = service(source).with_cache();

        service.calculate(&request(dec!(50000), 2022)).await.unwrap();
        let table = service.fetch_brackets(2022).await.unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.cache().map(BracketCache::years), Some(vec![2022]));
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let (source, calls) = stub(|call| {
            if call == 1 {
                Err(AttemptError::Status {
                    status: 404,
                    message: "not found".to_string(),
                    code: None,
                })
            } else {
                Ok(brackets(FEDERAL_2022))
            }
        });
        let service = service(source).with_cache();

        let first = service.fetch_brackets(2022).await;
        let second = service.fetch_brackets(2022).await;

        assert!(first.is_err());
        assert!(second.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn without_cache_every_call_fetches() {
        let (source, calls) = stub(|_| Ok(brackets(FEDERAL_2022)));
        let service = service(source);

        service.fetch_brackets(2022).await.unwrap();
        service.fetch_brackets(2022).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(service.cache().is_none());
    }

    // =========================================================================
    // cancellation and deadlines
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn deadline_stops_a_retrying_calculation() {
        let (source, calls) = stub(|_| {
            Err(AttemptError::Status {
                status: 503,
                message: "HTTP 503".to_string(),
                code: None,
            })
        });

        let err = service(source)
            .calculate_with_deadline(&request(dec!(50000), 2022), Duration::from_secs(2))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TaxApiError::Cancelled {
                reason: "deadline of 2000ms exceeded".to_string(),
            }
        );
        // Attempts at t=0s and t=1s; the deadline lands in the 2s backoff.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_does_not_mask_invalid_input() {
        let (source, calls) = stub(|_| Ok(brackets(FEDERAL_2022)));

        let err = service(source)
            .calculate_with_deadline(&request(dec!(-5), 2022), Duration::from_millis(1))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "INVALID_INCOME");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn calculation_within_deadline_succeeds() {
        let (source, _calls) = stub(|_| Ok(brackets(FEDERAL_2022)));

        let result = service(source)
            .calculate_with_deadline(&request(dec!(100000), 2022), Duration::from_secs(30))
            .await
            .unwrap();

        assert_eq!(result.total_tax, dec!(17739.165));
    }

    #[tokio::test]
    async fn cancelled_calculation_reports_cancelled() {
        let (source, calls) = stub(|_| Ok(brackets(FEDERAL_2022)));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service(source)
            .calculate_cancellable(&request(dec!(50000), 2022), &cancel)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "CANCELLED");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
