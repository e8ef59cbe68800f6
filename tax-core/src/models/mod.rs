mod bracket_table;
mod tax_bracket;
mod tax_calculation;
mod tax_year;

pub use bracket_table::{BracketTable, BracketTableError};
pub use tax_bracket::TaxBracket;
pub use tax_calculation::{BracketAllocation, TaxCalculationRequest, TaxCalculationResult};
pub use tax_year::SupportedTaxYears;
