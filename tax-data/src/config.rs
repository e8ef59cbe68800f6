use std::time::Duration;

use tax_core::SupportedTaxYears;

/// Connection and retry settings for a bracket fetcher.
///
/// Passed explicitly to constructors; there is no process-wide default
/// instance, so several configurations can coexist (e.g. in tests).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Address of the remote bracket source, without a trailing slash.
    pub base_url: String,
    /// Upper bound on a single network attempt.
    pub timeout: Duration,
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Seed for exponential backoff: retry `n` waits `retry_base_delay * 2^n`.
    pub retry_base_delay: Duration,
    /// Years the bracket source is expected to serve.
    pub supported_years: SupportedTaxYears,
}

impl FetcherConfig {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:5001";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_retries(
        mut self,
        max_retries: u32,
    ) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_retry_base_delay(
        mut self,
        delay: Duration,
    ) -> Self {
        self.retry_base_delay = delay;
        self
    }

    #[must_use]
    pub fn with_supported_years(
        mut self,
        years: SupportedTaxYears,
    ) -> Self {
        self.supported_years = years;
        self
    }

    /// Address the brackets for `tax_year` are fetched from.
    pub fn brackets_url(
        &self,
        tax_year: i32,
    ) -> String {
        format!("{}/tax-calculator/tax-year/{}", self.base_url, tax_year)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
            max_retries: Self::DEFAULT_MAX_RETRIES,
            retry_base_delay: Self::DEFAULT_RETRY_BASE_DELAY,
            supported_years: SupportedTaxYears::default(),
        }
    }
}
