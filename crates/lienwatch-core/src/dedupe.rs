use std::collections::HashSet;

use crate::Filing;

/// Drop filings whose identity was already seen. Order is kept; the first
/// occurrence wins.
pub fn dedupe(filings: Vec<Filing>) -> Vec<Filing> {
    let mut seen = HashSet::with_capacity(filings.len());
    filings
        .into_iter()
        .filter(|filing| seen.insert(filing.identity()))
        .collect()
}
