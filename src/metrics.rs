//! Derived metrics. Each takes present inputs only; callers decide whether a
//! record exists at all before asking for a metric.

use crate::error::{ReconcileError, ReconcileResult};

pub const DEFAULT_NIGHTS_PER_MONTH: f64 = 30.0;

fn divide(
    numerator: f64,
    denominator: f64,
    metric: &'static str,
    denominator_name: &'static str,
    entity: &str,
) -> ReconcileResult<f64> {
    if denominator == 0.0 {
        return Err(ReconcileError::DivisionByZero {
            metric,
            entity: entity.to_string(),
            denominator: denominator_name,
        });
    }
    Ok(numerator / denominator)
}

/// Short-term income for a period relative to one month of long-term rent.
pub fn affordability_ratio(
    entity: &str,
    nightly_price: f64,
    nights: f64,
    monthly_rent: f64,
) -> ReconcileResult<f64> {
    divide(
        nightly_price * nights,
        monthly_rent,
        "affordability ratio",
        "monthly rent",
        entity,
    )
}

/// Listings as a percentage of the housing stock.
pub fn housing_pressure_share(
    entity: &str,
    listings: f64,
    housing_units: f64,
) -> ReconcileResult<f64> {
    divide(
        listings * 100.0,
        housing_units,
        "housing pressure share",
        "total housing",
        entity,
    )
}

/// Listings per 1,000 residents.
pub fn density_per_thousand(entity: &str, listings: f64, population: f64) -> ReconcileResult<f64> {
    divide(
        listings * 1000.0,
        population,
        "listing density",
        "population",
        entity,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_plain_ratios() {
        assert_eq!(affordability_ratio("vienna", 100.0, 30.0, 1000.0).unwrap(), 3.0);
        assert_eq!(housing_pressure_share("x", 500.0, 20_000.0).unwrap(), 2.5);
        assert_eq!(density_per_thousand("x", 250.0, 50_000.0).unwrap(), 5.0);
    }

    #[test]
    fn zero_denominators_are_surfaced() {
        let err = density_per_thousand("nowhere", 10.0, 0.0).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::DivisionByZero {
                metric: "listing density",
                entity: "nowhere".to_string(),
                denominator: "population",
            }
        );
        assert!(affordability_ratio("x", 1.0, 30.0, 0.0).is_err());
        assert!(housing_pressure_share("x", 1.0, 0.0).is_err());
    }
}
