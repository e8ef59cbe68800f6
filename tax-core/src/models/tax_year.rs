use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The tax years a bracket source is known to serve.
///
/// This is configuration, not domain law: the default mirrors what the
/// remote bracket source currently publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupportedTaxYears(BTreeSet<i32>);

impl SupportedTaxYears {
    pub const DEFAULT_YEARS: [i32; 4] = [2019, 2020, 2021, 2022];

    pub fn new(years: impl IntoIterator<Item = i32>) -> Self {
        Self(years.into_iter().collect())
    }

    pub fn contains(
        &self,
        year: i32,
    ) -> bool {
        self.0.contains(&year)
    }

    /// Years in ascending order.
    pub fn years(&self) -> Vec<i32> {
        self.0.iter().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for SupportedTaxYears {
    fn default() -> Self {
        Self::new(Self::DEFAULT_YEARS)
    }
}

impl FromIterator<i32> for SupportedTaxYears {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Display for SupportedTaxYears {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(i32::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&joined)
    }
}
