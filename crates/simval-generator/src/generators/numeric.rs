//! Numeric value generators.

use super::GeneratorError;
use rand::Rng;

/// Inclusive integer range, validated once so sampling cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRange {
    min: i64,
    max: i64,
}

impl IntRange {
    pub fn new(min: i64, max: i64) -> Result<Self, GeneratorError> {
        if min > max {
            return Err(GeneratorError::InvalidRange {
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(Self { min, max })
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> i64 {
        rng.gen_range(self.min..=self.max)
    }
}

/// Inclusive float range with finite bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatRange {
    min: f64,
    max: f64,
}

impl FloatRange {
    pub fn new(min: f64, max: f64) -> Result<Self, GeneratorError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(GeneratorError::InvalidRange {
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(Self { min, max })
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.min..=self.max)
    }
}

/// Generate a random integer in the given range (inclusive).
pub fn int_range<R: Rng>(rng: &mut R, min: i64, max: i64) -> Result<i64, GeneratorError> {
    Ok(IntRange::new(min, max)?.sample(rng))
}

/// Generate a random float in the given range (inclusive).
pub fn float_range<R: Rng>(rng: &mut R, min: f64, max: f64) -> Result<f64, GeneratorError> {
    Ok(FloatRange::new(min, max)?.sample(rng))
}

/// Generate `true` with probability `true_weight`.
pub fn weighted_bool<R: Rng>(rng: &mut R, true_weight: f64) -> Result<bool, GeneratorError> {
    if !(0.0..=1.0).contains(&true_weight) {
        return Err(GeneratorError::InvalidProbability(true_weight));
    }
    Ok(rng.gen_bool(true_weight))
}
