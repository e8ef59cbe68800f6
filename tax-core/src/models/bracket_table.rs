use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::TaxBracket;

/// Reasons a sequence of brackets cannot form a [`BracketTable`].
///
/// Indices are zero-based positions in the offending sequence.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BracketTableError {
    #[error("bracket table is empty")]
    Empty,

    #[error("first bracket starts at {0}, expected 0")]
    FirstBracketNotAtZero(Decimal),

    #[error("bracket {index} has maximum {max} not above its minimum {min}")]
    EmptyRange {
        index: usize,
        min: Decimal,
        max: Decimal,
    },

    #[error("bracket {index} has rate {rate} outside [0, 1]")]
    RateOutOfRange { index: usize, rate: Decimal },

    #[error("bracket {index} starts at {found}, expected {expected} (brackets must be contiguous)")]
    NotContiguous {
        index: usize,
        expected: Decimal,
        found: Decimal,
    },

    #[error("unbounded bracket at position {index} is not the last bracket")]
    UnboundedNotLast { index: usize },
}

/// An ordered, contiguous, validated sequence of [`TaxBracket`]s.
///
/// The only way to build one is [`BracketTable::try_new`], so every table in
/// circulation starts at zero and ascends without gaps or overlaps. Since the
/// first minimum is zero and each `max` exceeds its `min`, no minimum can be
/// negative. At most one bracket is unbounded and it is always last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TaxBracket>", into = "Vec<TaxBracket>")]
pub struct BracketTable {
    brackets: Vec<TaxBracket>,
}

impl BracketTable {
    /// Validates `brackets` and wraps them in a table.
    ///
    /// # Errors
    ///
    /// Returns the first [`BracketTableError`] found, checking brackets in
    /// ascending order.
    pub fn try_new(brackets: Vec<TaxBracket>) -> Result<Self, BracketTableError> {
        let first = brackets.first().ok_or(BracketTableError::Empty)?;
        if !first.min.is_zero() {
            return Err(BracketTableError::FirstBracketNotAtZero(first.min));
        }

        let last_index = brackets.len() - 1;
        for (index, bracket) in brackets.iter().enumerate() {
            if bracket.rate < Decimal::ZERO || bracket.rate > Decimal::ONE {
                return Err(BracketTableError::RateOutOfRange {
                    index,
                    rate: bracket.rate,
                });
            }

            match bracket.max {
                Some(max) if max <= bracket.min => {
                    return Err(BracketTableError::EmptyRange {
                        index,
                        min: bracket.min,
                        max,
                    });
                }
                None if index != last_index => {
                    return Err(BracketTableError::UnboundedNotLast { index });
                }
                _ => {}
            }

            if let Some(next) = brackets.get(index + 1) {
                // `max` is present here; an unbounded non-last bracket was rejected above.
                let expected = bracket.max.unwrap_or(Decimal::MAX);
                if next.min != expected {
                    return Err(BracketTableError::NotContiguous {
                        index: index + 1,
                        expected,
                        found: next.min,
                    });
                }
            }
        }

        Ok(Self { brackets })
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TaxBracket> {
        self.brackets.iter()
    }

    pub fn len(&self) -> usize {
        self.brackets.len()
    }

    /// Always `false`; an empty table fails validation.
    pub fn is_empty(&self) -> bool {
        self.brackets.is_empty()
    }

    /// Upper bound of the table's domain, or `None` when the top bracket is
    /// open-ended.
    pub fn upper_bound(&self) -> Option<Decimal> {
        self.brackets.last().and_then(|b| b.max)
    }

    /// Whether every unit of `income` falls inside some bracket.
    pub fn covers(
        &self,
        income: Decimal,
    ) -> bool {
        self.upper_bound().is_none_or(|top| income <= top)
    }

    /// Highest marginal rate in the table.
    pub fn max_rate(&self) -> Decimal {
        self.brackets
            .iter()
            .map(|b| b.rate)
            .max()
            .unwrap_or(Decimal::ZERO)
    }
}

impl TryFrom<Vec<TaxBracket>> for BracketTable {
    type Error = BracketTableError;

    fn try_from(brackets: Vec<TaxBracket>) -> Result<Self, Self::Error> {
        Self::try_new(brackets)
    }
}

impl From<BracketTable> for Vec<TaxBracket> {
    fn from(table: BracketTable) -> Self {
        table.brackets
    }
}

impl<'a> IntoIterator for &'a BracketTable {
    type Item = &'a TaxBracket;
    type IntoIter = std::slice::Iter<'a, TaxBracket>;

    fn into_iter(self) -> Self::IntoIter {
        self.brackets.iter()
    }
}
