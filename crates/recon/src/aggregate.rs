use std::collections::BTreeMap;
use std::fmt;

use crate::model::{FactKey, FactObservation, FactRecord, RawCell};

/// Why a quantity cell produced no observation.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantityRejection {
    Blank,
    Zero,
    Negative,
    NotNumeric(String),
    /// Adding the quantity would overflow the running total for its key.
    Overflow,
}

impl QuantityRejection {
    /// Blank and zero cells are the normal "no sales" case. Only the rest
    /// count as dropped input.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Negative | Self::NotNumeric(_) | Self::Overflow)
    }
}

impl fmt::Display for QuantityRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blank => write!(f, "blank"),
            Self::Zero => write!(f, "zero"),
            Self::Negative => write!(f, "negative"),
            Self::NotNumeric(s) => write!(f, "not a number: '{s}'"),
            Self::Overflow => write!(f, "total overflows"),
        }
    }
}

/// Read a sold-unit count from a cell.
///
/// Numbers and numeric text are accepted and truncated toward zero, so
/// `"3.0"` and `3.9` both give 3. Anything below one unit is rejected.
pub fn parse_quantity(cell: &RawCell) -> Result<u64, QuantityRejection> {
    let value = match cell {
        RawCell::Empty => return Err(QuantityRejection::Blank),
        RawCell::Number(n) => *n,
        RawCell::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Err(QuantityRejection::Blank);
            }
            s.parse::<f64>()
                .map_err(|_| QuantityRejection::NotNumeric(s.to_string()))?
        }
        RawCell::Date(d) => return Err(QuantityRejection::NotNumeric(d.to_string())),
    };

    if !value.is_finite() {
        return Err(QuantityRejection::NotNumeric(value.to_string()));
    }
    let whole = value.trunc();
    if whole < 0.0 {
        return Err(QuantityRejection::Negative);
    }
    if whole == 0.0 {
        return Err(QuantityRejection::Zero);
    }
    if whole >= u64::MAX as f64 {
        return Err(QuantityRejection::NotNumeric(value.to_string()));
    }
    Ok(whole as u64)
}

/// Collapses observations sharing a [`FactKey`] into one summed record.
///
/// Keys are kept sorted, so `finalize` yields the same order on every run.
#[derive(Debug, Default)]
pub struct FactAggregator {
    facts: BTreeMap<FactKey, u64>,
}

impl FactAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses, leaving the aggregate untouched, a zero quantity or one
    /// whose sum would not fit in a `u64`.
    pub fn add(&mut self, observation: FactObservation) -> Result<(), QuantityRejection> {
        if observation.quantity == 0 {
            return Err(QuantityRejection::Zero);
        }
        let key = observation.key();
        let current = self.facts.get(&key).copied().unwrap_or(0);
        let total = current
            .checked_add(observation.quantity)
            .ok_or(QuantityRejection::Overflow)?;
        self.facts.insert(key, total);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn finalize(self) -> Vec<FactRecord> {
        self.facts
            .into_iter()
            .map(|(key, quantity)| FactRecord::from_key(key, quantity))
            .collect()
    }
}
