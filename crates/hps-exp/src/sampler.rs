use hps_core::errors::{ErrorInfo, HpsError};
use hps_core::{Coordinate, SweepMethod};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::codec;

/// Outcome of drawing one coordinate from a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub method: SweepMethod,
    pub coordinate: Coordinate,
    /// Cursor to persist after a grid draw; `None` for random draws.
    pub next_cursor: Option<u64>,
}

/// Draws a coordinate for the sweep method named by `method`.
///
/// Unknown tags fail with [`HpsError::Method`] before any randomness is
/// consumed. `cursor` is ignored by the random method.
pub fn sample<R: Rng + ?Sized>(
    method: &str,
    cardinalities: &[u64],
    cursor: u64,
    rng: &mut R,
) -> Result<Sample, HpsError> {
    match method.parse::<SweepMethod>()? {
        SweepMethod::Random => sample_random(cardinalities, rng),
        SweepMethod::Grid => sample_grid(cardinalities, cursor),
    }
}

/// Independent uniform digit per dimension.
pub fn sample_random<R: Rng + ?Sized>(
    cardinalities: &[u64],
    rng: &mut R,
) -> Result<Sample, HpsError> {
    let mut digits = Vec::with_capacity(cardinalities.len());
    for (dimension, &cardinality) in cardinalities.iter().enumerate() {
        if cardinality == 0 {
            return Err(HpsError::Space(
                ErrorInfo::new("zero-cardinality", "dimension has no candidates")
                    .with_context("dimension", dimension.to_string()),
            ));
        }
        digits.push(rng.gen_range(0..cardinality));
    }
    Ok(Sample {
        method: SweepMethod::Random,
        coordinate: Coordinate::new(digits),
        next_cursor: None,
    })
}

/// Coordinate at `cursor` in the grid enumeration, plus the advanced cursor.
pub fn sample_grid(cardinalities: &[u64], cursor: u64) -> Result<Sample, HpsError> {
    let coordinate = codec::encode(cursor, cardinalities)?;
    let next_cursor = cursor.checked_add(1).ok_or_else(|| {
        HpsError::Overflow(
            ErrorInfo::new("cursor-overflow", "grid cursor cannot advance further")
                .with_context("cursor", cursor.to_string()),
        )
    })?;
    Ok(Sample {
        method: SweepMethod::Grid,
        coordinate,
        next_cursor: Some(next_cursor),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn unknown_method_is_rejected() {
        let mut rng = StepRng::new(0, 1);
        let err = sample("bogus", &[2, 2], 0, &mut rng).unwrap_err();
        assert!(matches!(err, HpsError::Method(_)));
    }

    #[test]
    fn grid_advances_cursor_by_one() {
        let drawn = sample_grid(&[2, 2], 3).unwrap();
        assert_eq!(drawn.coordinate.digits(), &[1, 1]);
        assert_eq!(drawn.next_cursor, Some(4));
        assert!(matches!(sample_grid(&[2], u64::MAX), Err(HpsError::Overflow(_))));
    }

    #[test]
    fn random_ignores_cursor() {
        let mut rng = StepRng::new(0, 1);
        let drawn = sample("random", &[3, 5], 17, &mut rng).unwrap();
        assert_eq!(drawn.next_cursor, None);
        assert!(drawn.coordinate.digits()[0] < 3 && drawn.coordinate.digits()[1] < 5);
    }
}
