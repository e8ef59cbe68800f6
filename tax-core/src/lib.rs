pub mod calculations;
pub mod error;
pub mod models;

pub use calculations::{MarginalTaxCalculator, MarginalTaxError};
pub use error::{ErrorKind, ErrorReport, TaxApiError};
pub use models::*;
