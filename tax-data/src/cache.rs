use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tax_core::BracketTable;

/// In-process bracket tables keyed strictly by tax year.
///
/// Tables for a given year never change, so entries are immutable: the first
/// table stored for a year is kept and later inserts return it unchanged.
#[derive(Debug, Default)]
pub struct BracketCache {
    entries: RwLock<HashMap<i32, Arc<BracketTable>>>,
}

impl BracketCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        tax_year: i32,
    ) -> Option<Arc<BracketTable>> {
        // Entries are insert-only, so a poisoned lock still guards a valid map.
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&tax_year).cloned()
    }

    /// Stores `table` for `tax_year` unless an entry already exists, and
    /// returns whichever table is now cached.
    pub fn insert(
        &self,
        tax_year: i32,
        table: BracketTable,
    ) -> Arc<BracketTable> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(tax_year)
            .or_insert_with(|| Arc::new(table))
            .clone()
    }

    /// Cached years, ascending.
    pub fn years(&self) -> Vec<i32> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut years: Vec<_> = entries.keys().copied().collect();
        years.sort_unstable();
        years
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
