use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ConvertedAmount {
    Value(f64),
    NotAvailable,
}

impl ConvertedAmount {
    pub fn value(self) -> Option<f64> {
        match self {
            ConvertedAmount::Value(v) => Some(v),
            ConvertedAmount::NotAvailable => None,
        }
    }
}

impl fmt::Display for ConvertedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertedAmount::Value(v) => write!(f, "{v:.2}"),
            ConvertedAmount::NotAvailable => f.write_str("N/A"),
        }
    }
}

impl PartialEq<&str> for ConvertedAmount {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

impl Serialize for ConvertedAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConvertedAmount::Value(v) => serializer.serialize_f64(*v),
            ConvertedAmount::NotAvailable => serializer.serialize_str("N/A"),
        }
    }
}

/// Converts `amount` of the working currency into `target`, where `rates`
/// maps a currency code to working-currency units per one unit of that
/// currency. Codes compare case-insensitively.
pub fn convert_currency(amount: f64, target: &str, rates: &BTreeMap<String, f64>) -> ConvertedAmount {
    if !amount.is_finite() {
        return ConvertedAmount::NotAvailable;
    }
    let rate = rates
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(target))
        .map(|(_, rate)| *rate);
    match rate {
        Some(rate) if rate.is_finite() && rate > 0.0 => ConvertedAmount::Value(amount / rate),
        _ => ConvertedAmount::NotAvailable,
    }
}
