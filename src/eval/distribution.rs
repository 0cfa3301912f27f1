//! Distribution descriptors produced at the root of a CPF.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value::Value;

/// A distribution over the next value of a ground fluent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    /// Point mass on any value.
    KronDelta { value: Value },
    /// Point mass on a real.
    DiracDelta { value: f64 },
    /// `true` with probability `p`.
    Bernoulli { p: f64 },
    /// Continuous uniform over `[low, high)`.
    Uniform { low: f64, high: f64 },
}

impl Distribution {
    /// Validated Bernoulli constructor.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ProbabilityOutOfRange` if `p` is not a finite
    /// number in `[0, 1]`.
    pub fn bernoulli(p: f64, context: &str) -> Result<Self, DomainError> {
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(DomainError::ProbabilityOutOfRange {
                value: p,
                context: context.to_string(),
            });
        }
        Ok(Self::Bernoulli { p })
    }

    /// Validated Uniform constructor.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidBounds` unless both bounds are finite and
    /// `low < high`.
    pub fn uniform(low: f64, high: f64, context: &str) -> Result<Self, DomainError> {
        if !low.is_finite() || !high.is_finite() || low >= high {
            return Err(DomainError::InvalidBounds {
                low,
                high,
                context: context.to_string(),
            });
        }
        Ok(Self::Uniform { low, high })
    }

    /// True for point masses, which consume no randomness.
    #[must_use]
    pub const fn is_deterministic(&self) -> bool {
        matches!(self, Self::KronDelta { .. } | Self::DiracDelta { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bernoulli_bounds() {
        assert!(Distribution::bernoulli(0.0, "t").is_ok());
        assert!(Distribution::bernoulli(1.0, "t").is_ok());
        assert!(matches!(
            Distribution::bernoulli(1.5, "t"),
            Err(DomainError::ProbabilityOutOfRange { .. })
        ));
        assert!(Distribution::bernoulli(f64::NAN, "t").is_err());
        assert!(Distribution::bernoulli(-0.1, "t").is_err());
    }

    #[test]
    fn uniform_requires_ordered_finite_bounds() {
        assert!(Distribution::uniform(0.0, 1.0, "t").is_ok());
        assert!(Distribution::uniform(1.0, 1.0, "t").is_err());
        assert!(Distribution::uniform(0.0, f64::INFINITY, "t").is_err());
    }

    #[test]
    fn point_masses_are_deterministic() {
        assert!(Distribution::KronDelta { value: Value::Bool(true) }.is_deterministic());
        assert!(Distribution::DiracDelta { value: 0.5 }.is_deterministic());
        assert!(!Distribution::Bernoulli { p: 0.5 }.is_deterministic());
    }
}
