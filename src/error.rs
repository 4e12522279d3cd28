//! Typed failures raised by the reconciliation core.
//!
//! Structural problems with an input (a sheet without its header marker, a
//! missing year column, an unmapped currency) and arithmetic that cannot be
//! carried out (a zero denominator) are fatal. Missing values are not errors
//! and never surface here.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ReconcileError {
    #[error("Could not locate {marker} row in sheet '{sheet}'")]
    HeaderNotFound { sheet: String, marker: String },

    #[error("Sheet '{sheet}' has no column for year {year}")]
    YearNotFound { sheet: String, year: String },

    #[error("No EUR conversion rate configured for currency '{code}'")]
    UnknownCurrency { code: String },

    #[error("Cannot compute {metric} for '{entity}': {denominator} is zero")]
    DivisionByZero {
        metric: &'static str,
        entity: String,
        denominator: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type ReconcileResult<T> = std::result::Result<T, ReconcileError>;
