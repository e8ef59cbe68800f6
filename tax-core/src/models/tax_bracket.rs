use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A contiguous income range taxed at a flat marginal rate.
///
/// `max` is `None` for the open-ended top bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub min: Decimal,
    pub max: Option<Decimal>,
    pub rate: Decimal,
}

impl TaxBracket {
    pub fn new(
        min: Decimal,
        max: Option<Decimal>,
        rate: Decimal,
    ) -> Self {
        Self { min, max, rate }
    }

    pub fn is_unbounded(&self) -> bool {
        self.max.is_none()
    }

    /// Width of the bracket, or `None` when it has no upper bound.
    pub fn width(&self) -> Option<Decimal> {
        self.max.map(|max| max - self.min)
    }
}
