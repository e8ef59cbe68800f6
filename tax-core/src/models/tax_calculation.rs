use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TaxBracket;

/// Caller-supplied input for a tax calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalculationRequest {
    pub annual_income: Decimal,
    pub tax_year: i32,
}

impl TaxCalculationRequest {
    pub fn new(
        annual_income: Decimal,
        tax_year: i32,
    ) -> Self {
        Self {
            annual_income,
            tax_year,
        }
    }
}

/// The slice of income that fell into one bracket and the tax it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketAllocation {
    pub bracket: TaxBracket,
    pub taxable_amount: Decimal,
    pub tax_amount: Decimal,
}

/// Outcome of a marginal tax calculation.
///
/// Values are unrounded; rounding to cents is a presentation concern.
/// `per_bracket` holds only brackets with a nonzero taxable amount, in
/// ascending bracket order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalculationResult {
    pub total_tax: Decimal,
    pub effective_rate: Decimal,
    pub per_bracket: Vec<BracketAllocation>,
}

impl TaxCalculationResult {
    /// Rate of the highest bracket the income reached, or zero when no
    /// income was taxed.
    pub fn marginal_rate(&self) -> Decimal {
        self.per_bracket
            .last()
            .map_or(Decimal::ZERO, |allocation| allocation.bracket.rate)
    }

    /// Sum of the taxable amounts across all allocations.
    pub fn taxed_income(&self) -> Decimal {
        self.per_bracket.iter().map(|a| a.taxable_amount).sum()
    }
}
