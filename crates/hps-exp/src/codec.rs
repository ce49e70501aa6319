//! Mixed-radix codec between flat grid indices and coordinates.
//!
//! Dimension 0 is the most significant digit. Indices are reduced modulo the
//! product of the cardinalities, so encoding is periodic with that product as
//! its period. Products are computed in `u64`; spaces with more combinations
//! than `u64::MAX` are rejected with [`HpsError::Overflow`].

use hps_core::errors::{ErrorInfo, HpsError};
use hps_core::Coordinate;

/// Number of points in the Cartesian product described by `cardinalities`.
///
/// The empty product is 1: a space without dimensions has exactly one point,
/// the empty coordinate.
pub fn product(cardinalities: &[u64]) -> Result<u64, HpsError> {
    let mut total: u64 = 1;
    for (dimension, &cardinality) in cardinalities.iter().enumerate() {
        if cardinality == 0 {
            return Err(HpsError::Space(
                ErrorInfo::new("zero-cardinality", "dimension has no candidates")
                    .with_context("dimension", dimension.to_string()),
            ));
        }
        total = total.checked_mul(cardinality).ok_or_else(|| {
            HpsError::Overflow(
                ErrorInfo::new("combination-overflow", "combination count exceeds u64")
                    .with_context("dimensions", cardinalities.len().to_string())
                    .with_hint("split the sweep or reduce candidate lists"),
            )
        })?;
    }
    Ok(total)
}

/// Decomposes `index` into one digit per dimension.
pub fn encode(index: u64, cardinalities: &[u64]) -> Result<Coordinate, HpsError> {
    let period = product(cardinalities)?;
    let mut remainder = index % period;
    let mut digits = vec![0; cardinalities.len()];
    for (slot, &cardinality) in digits.iter_mut().zip(cardinalities).rev() {
        *slot = remainder % cardinality;
        remainder /= cardinality;
    }
    Ok(Coordinate::new(digits))
}

/// Evaluates a coordinate as a mixed-radix number, the inverse of [`encode`].
pub fn decode(coordinate: &Coordinate, cardinalities: &[u64]) -> Result<u64, HpsError> {
    let period = product(cardinalities)?;
    if coordinate.len() != cardinalities.len() {
        return Err(HpsError::Space(
            ErrorInfo::new("coordinate-rank", "coordinate rank does not match cardinalities")
                .with_context("expected", cardinalities.len().to_string())
                .with_context("actual", coordinate.len().to_string()),
        ));
    }
    let mut index: u64 = 0;
    for (dimension, (&digit, &cardinality)) in
        coordinate.digits().iter().zip(cardinalities).enumerate()
    {
        if digit >= cardinality {
            return Err(HpsError::Space(
                ErrorInfo::new("coordinate-range", "coordinate digit out of range")
                    .with_context("dimension", dimension.to_string())
                    .with_context("digit", digit.to_string())
                    .with_context("cardinality", cardinality.to_string()),
            ));
        }
        // Stays below the running product, which is bounded by `period`.
        index = index * cardinality + digit;
    }
    Ok(index % period)
}
