//! Tax calculation modules.
//!
//! This module provides the marginal bracket walk along with the rounding
//! helpers used when results are displayed.

pub mod common;
pub mod marginal;

pub use marginal::{MarginalTaxCalculator, MarginalTaxError};
