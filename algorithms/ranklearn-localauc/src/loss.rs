use std::fmt;
use std::str::FromStr;

use ranklearn::Float;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::MaxLocalAucError;

/// Largest argument passed to `exp`, larger values are clamped
const MAX_EXP_ARG: f64 = 50.0;

fn clamped_exp<F: Float>(x: F) -> F {
    x.min(F::cast(MAX_EXP_ARG)).exp()
}

/// Pairwise surrogate losses
///
/// A loss compares the score `s_p` of an observed item with the score `s_q` of an unobserved
/// item of the same user, whose threshold is `r`. Minimising the loss pushes `s_p` above `s_q`.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Loss {
    /// Smooth local AUC surrogate `-1 / ((1 + gamma)(1 + kappa))` with
    /// `gamma = exp(-(s_p - s_q))` and `kappa = exp(-(s_p - r))`
    Sigmoid,
    /// `max(0, 1 - (s_p - s_q))`
    Hinge,
    /// `max(0, 1 - (s_p - s_q))^2`
    SquaredHinge,
    /// `(1 - (s_p - s_q))^2`
    Square,
    /// `ln(1 + exp(-(s_p - s_q)))`
    Logistic,
}

impl Default for Loss {
    fn default() -> Self {
        Loss::Sigmoid
    }
}

impl Loss {
    pub fn name(&self) -> &'static str {
        match self {
            Loss::Sigmoid => "sigmoid",
            Loss::Hinge => "hinge",
            Loss::SquaredHinge => "squared_hinge",
            Loss::Square => "square",
            Loss::Logistic => "logistic",
        }
    }

    /// Loss of the pair `(p, q)`
    pub fn value<F: Float>(&self, sp: F, sq: F, r: F) -> F {
        let margin = sp - sq;
        match self {
            Loss::Sigmoid => {
                let gamma = clamped_exp(-margin);
                let kappa = clamped_exp(r - sp);
                -F::one() / ((F::one() + gamma) * (F::one() + kappa))
            }
            Loss::Hinge => (F::one() - margin).max(F::zero()),
            Loss::SquaredHinge => (F::one() - margin).max(F::zero()).powi(2),
            Loss::Square => (F::one() - margin).powi(2),
            Loss::Logistic => clamped_exp(-margin).ln_1p(),
        }
    }

    /// Partial derivatives `(dl/ds_p, dl/ds_q)` of the loss of the pair `(p, q)`
    pub fn gradient<F: Float>(&self, sp: F, sq: F, r: F) -> (F, F) {
        let margin = sp - sq;
        let one = F::one();
        let two = F::cast(2);
        match self {
            Loss::Sigmoid => {
                let gamma = clamped_exp(-margin);
                let kappa = clamped_exp(r - sp);
                let one_gamma = one + gamma;
                let one_kappa = one + kappa;
                let dp = -(gamma + kappa + two * gamma * kappa)
                    / (one_gamma * one_gamma * one_kappa * one_kappa);
                let dq = gamma / (one_gamma * one_gamma * one_kappa);
                (dp, dq)
            }
            Loss::Hinge => {
                if margin < one {
                    (-one, one)
                } else {
                    (F::zero(), F::zero())
                }
            }
            Loss::SquaredHinge => {
                let h = (one - margin).max(F::zero());
                (-two * h, two * h)
            }
            Loss::Square => {
                let e = one - margin;
                (-two * e, two * e)
            }
            Loss::Logistic => {
                let d = one / (one + clamped_exp(margin));
                (-d, d)
            }
        }
    }
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Loss {
    type Err = MaxLocalAucError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sigmoid" => Ok(Loss::Sigmoid),
            "hinge" => Ok(Loss::Hinge),
            "squared_hinge" => Ok(Loss::SquaredHinge),
            "square" => Ok(Loss::Square),
            "logistic" => Ok(Loss::Logistic),
            _ => Err(MaxLocalAucError::UnknownLoss(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const LOSSES: [Loss; 5] = [
        Loss::Sigmoid,
        Loss::Hinge,
        Loss::SquaredHinge,
        Loss::Square,
        Loss::Logistic,
    ];

    #[test]
    fn gradients_match_finite_differences() {
        let h = 1e-6;
        // away from the hinge kink at margin 1
        let points = [(0.3, -0.2, 0.1), (1.5, 2.0, 0.7), (-0.4, 0.9, -1.0), (0.8, 0.1, 1.2)];

        for loss in LOSSES.iter() {
            for &(sp, sq, r) in points.iter() {
                let (dp, dq) = loss.gradient(sp, sq, r);
                let num_dp = (loss.value(sp + h, sq, r) - loss.value(sp - h, sq, r)) / (2.0 * h);
                let num_dq = (loss.value(sp, sq + h, r) - loss.value(sp, sq - h, r)) / (2.0 * h);

                assert_abs_diff_eq!(dp, num_dp, epsilon = 1e-6);
                assert_abs_diff_eq!(dq, num_dq, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn sigmoid_values() {
        // gamma = kappa = 1
        assert_abs_diff_eq!(Loss::Sigmoid.value(1.0, 1.0, 1.0), -0.25);
        // large margins approach the minimum -1
        assert_abs_diff_eq!(Loss::Sigmoid.value(100.0, 0.0, 0.0), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn exponents_are_clamped() {
        for loss in LOSSES.iter() {
            assert!(loss.value(-1e4f64, 1e4, 1e4).is_finite());
            let (dp, dq) = loss.gradient(-1e4f64, 1e4, 1e4);
            assert!(dp.is_finite() && dq.is_finite());
        }
    }

    #[test]
    fn hinge_vanishes_past_the_margin() {
        assert_eq!(Loss::Hinge.value(2.5, 1.0, 0.0), 0.0);
        assert_eq!(Loss::Hinge.gradient(2.5, 1.0, 0.0), (0.0, 0.0));
        assert_eq!(Loss::Hinge.value(0.5, 1.0, 0.0), 1.5);
    }

    #[test]
    fn names_roundtrip() {
        for loss in LOSSES.iter() {
            assert_eq!(loss.name().parse::<Loss>().unwrap(), *loss);
        }
        assert!(matches!(
            "cubic".parse::<Loss>(),
            Err(MaxLocalAucError::UnknownLoss(_))
        ));
    }
}
