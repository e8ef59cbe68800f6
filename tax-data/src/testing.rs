//! Test doubles shared by the fetcher and service tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::source::{AttemptError, BracketSource};
use crate::wire::BracketsResponse;

pub(crate) const FEDERAL_2022: &str = r#"{
    "tax_brackets": [
        { "min": 0, "max": 50197, "rate": 0.15 },
        { "min": 50197, "max": 100392, "rate": 0.205 },
        { "min": 100392, "rate": 0.33 }
    ]
}"#;

pub(crate) const NON_CONTIGUOUS: &str = r#"{
    "tax_brackets": [
        { "min": 0, "max": 50000, "rate": 0.15 },
        { "min": 60000, "rate": 0.33 }
    ]
}"#;

pub(crate) const BOUNDED_AT_20000: &str = r#"{
    "tax_brackets": [
        { "min": 0, "max": 10000, "rate": 0.10 },
        { "min": 10000, "max": 20000, "rate": 0.20 }
    ]
}"#;

type Responder = Box<dyn Fn(u32) -> Result<BracketsResponse, AttemptError> + Send + Sync>;

/// Counts calls and answers from a closure keyed by the 1-based call number.
/// A nonzero `latency` makes each call sleep first.
pub(crate) struct StubSource {
    calls: Arc<AtomicU32>,
    pub(crate) latency: Duration,
    respond: Responder,
}

#[async_trait]
impl BracketSource for StubSource {
    fn location(
        &self,
        tax_year: i32,
    ) -> String {
        format!("stub://{tax_year}")
    }

    async fn fetch_once(
        &self,
        _tax_year: i32,
    ) -> Result<BracketsResponse, AttemptError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        (self.respond)(call)
    }
}

/// Build a [`StubSource`] and return it alongside its call counter.
pub(crate) fn stub(
    respond: impl Fn(u32) -> Result<BracketsResponse, AttemptError> + Send + Sync + 'static,
) -> (StubSource, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    (
        StubSource {
            calls: calls.clone(),
            latency: Duration::ZERO,
            respond: Box::new(respond),
        },
        calls,
    )
}

pub(crate) fn brackets(json: &str) -> BracketsResponse {
    serde_json::from_str(json).unwrap()
}
