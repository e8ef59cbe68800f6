//! Bracket acquisition for the tax calculator: configuration, the HTTP
//! bracket source, the retrying fetcher, and the [`TaxService`] facade.

pub mod cache;
pub mod config;
pub mod fetcher;
pub mod http;
pub mod service;
pub mod source;
pub mod wire;

#[cfg(test)]
mod testing;

pub use cache::BracketCache;
pub use config::FetcherConfig;
pub use fetcher::BracketFetcher;
pub use http::{ClientBuildError, HttpBracketSource};
pub use service::TaxService;
pub use source::{AttemptError, BracketSource};
pub use wire::{BracketsResponse, ErrorPayload, WireBracket};
