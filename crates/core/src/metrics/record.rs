//! Nullable metric records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::keys::MetricKey;

/// Metric values for one (version, year).
///
/// A key that is absent is null. Setting a key to `None` removes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricRecord {
    values: BTreeMap<MetricKey, Decimal>,
}

impl MetricRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `key`, or `None` if it is null.
    #[must_use]
    pub fn get(&self, key: MetricKey) -> Option<Decimal> {
        self.values.get(&key).copied()
    }

    /// Sets `key` to a known value.
    pub fn insert(&mut self, key: MetricKey, value: Decimal) {
        self.values.insert(key, value);
    }

    /// Sets `key`, clearing it when `value` is `None`.
    pub fn set(&mut self, key: MetricKey, value: Option<Decimal>) {
        match value {
            Some(value) => {
                self.values.insert(key, value);
            }
            None => {
                self.values.remove(&key);
            }
        }
    }

    /// Removes `key`, returning its previous value.
    pub fn remove(&mut self, key: MetricKey) -> Option<Decimal> {
        self.values.remove(&key)
    }

    /// Returns true if `key` has a known value.
    #[must_use]
    pub fn contains(&self, key: MetricKey) -> bool {
        self.values.contains_key(&key)
    }

    /// Copies every known value of `other` into `self`.
    ///
    /// Known values in `self` are overwritten; nulls in `other` never clear
    /// anything.
    pub fn merge(&mut self, other: &Self) {
        self.values
            .extend(other.values.iter().map(|(key, value)| (*key, *value)));
    }

    /// Iterates the known values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (MetricKey, Decimal)> + '_ {
        self.values.iter().map(|(key, value)| (*key, *value))
    }

    /// Number of known values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if every key is null.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(MetricKey, Decimal)> for MetricRecord {
    fn from_iter<I: IntoIterator<Item = (MetricKey, Decimal)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_set_none_clears() {
        let mut record = MetricRecord::new();
        record.insert(MetricKey::Revenue, dec!(10));
        record.set(MetricKey::Revenue, None);
        assert_eq!(record.get(MetricKey::Revenue), None);
        assert!(record.is_empty());
    }

    #[test]
    fn test_merge_overwrites_known_and_keeps_rest() {
        let mut base: MetricRecord = [
            (MetricKey::Revenue, dec!(100)),
            (MetricKey::Equity, dec!(5)),
        ]
        .into_iter()
        .collect();
        let derived: MetricRecord = [(MetricKey::Equity, dec!(7))].into_iter().collect();

        base.merge(&derived);

        assert_eq!(base.get(MetricKey::Revenue), Some(dec!(100)));
        assert_eq!(base.get(MetricKey::Equity), Some(dec!(7)));
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let record: MetricRecord = [(MetricKey::CashEnding, dec!(12.5))].into_iter().collect();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({ "cash_ending": "12.5" }));

        let back: MetricRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
