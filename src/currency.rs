//! Fixed EUR conversion rates for listing prices.

use std::collections::BTreeMap;

use crate::error::{ReconcileError, ReconcileResult};

const DEFAULT_RATES: &[(&str, f64)] = &[
    ("EUR", 1.0),
    ("GBP", 1.17),
    ("CHF", 1.05),
    ("DKK", 0.134),
    ("SEK", 0.087),
    ("NOK", 0.086),
    ("CZK", 0.040),
    ("PLN", 0.23),
    ("HUF", 0.0025),
    ("TRY", 0.028),
    ("USD", 0.92),
];

#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyTable {
    rates: BTreeMap<String, f64>,
}

impl Default for CurrencyTable {
    fn default() -> Self {
        CurrencyTable {
            rates: DEFAULT_RATES
                .iter()
                .map(|(code, rate)| (code.to_string(), *rate))
                .collect(),
        }
    }
}

impl CurrencyTable {
    pub fn from_rates<I, S>(rates: I) -> ReconcileResult<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut table = BTreeMap::new();
        for (code, rate) in rates {
            let code = code.as_ref().trim().to_ascii_uppercase();
            if code.is_empty() || !rate.is_finite() || rate <= 0.0 {
                return Err(ReconcileError::Config(format!(
                    "invalid conversion rate {rate} for currency '{code}'"
                )));
            }
            table.insert(code, rate);
        }
        Ok(CurrencyTable { rates: table })
    }

    /// Overlays `overrides` on top of the current rates.
    pub fn merged_with(&self, overrides: &BTreeMap<String, f64>) -> ReconcileResult<Self> {
        let extra = CurrencyTable::from_rates(overrides.iter().map(|(k, v)| (k.as_str(), *v)))?;
        let mut rates = self.rates.clone();
        rates.extend(extra.rates);
        Ok(CurrencyTable { rates })
    }

    pub fn rate(&self, code: &str) -> ReconcileResult<f64> {
        let normalized = code.trim().to_ascii_uppercase();
        self.rates
            .get(&normalized)
            .copied()
            .ok_or(ReconcileError::UnknownCurrency { code: normalized })
    }

    /// Converts an amount to EUR. An absent amount stays absent.
    pub fn convert(&self, value: Option<f64>, code: &str) -> ReconcileResult<Option<f64>> {
        match value {
            None => Ok(None),
            Some(amount) => Ok(Some(amount * self.rate(code)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_with_configured_rate() {
        let table = CurrencyTable::default();
        let converted = table.convert(Some(100.0), "GBP").unwrap().unwrap();
        assert!((converted - 117.0).abs() < 1e-9);
        assert_eq!(table.convert(Some(42.5), "eur").unwrap(), Some(42.5));
    }

    #[test]
    fn absent_value_stays_absent() {
        let table = CurrencyTable::default();
        assert_eq!(table.convert(None, "GBP").unwrap(), None);
        assert_eq!(table.convert(None, "XYZ").unwrap(), None);
    }

    #[test]
    fn unknown_currency_is_an_error() {
        let table = CurrencyTable::default();
        assert_eq!(
            table.convert(Some(10.0), "xyz"),
            Err(ReconcileError::UnknownCurrency {
                code: "XYZ".to_string()
            })
        );
    }

    #[test]
    fn overrides_replace_and_extend_rates() {
        let overrides = BTreeMap::from([("gbp".to_string(), 1.2), ("ISK".to_string(), 0.0066)]);
        let table = CurrencyTable::default().merged_with(&overrides).unwrap();
        assert_eq!(table.rate("GBP").unwrap(), 1.2);
        assert_eq!(table.rate("isk").unwrap(), 0.0066);
        assert_eq!(table.rate("EUR").unwrap(), 1.0);
    }

    #[test]
    fn rejects_non_positive_rates() {
        assert!(CurrencyTable::from_rates([("EUR", 0.0)]).is_err());
        assert!(CurrencyTable::from_rates([("EUR", f64::NAN)]).is_err());
    }
}
