use num_traits::{One, Zero};
use std::fmt::Debug;
use std::ops::{Div, Mul};

/// The weights every algorithm in this crate computes with: a totally
/// ordered semiring where `max` is the addition and greater means better,
/// extended with division for weight pushing and telescoping.
///
/// `log_domain::LogDomain<f64>` is the usual instance.
pub trait Weight: Copy + Ord + Zero + One + Mul<Output = Self> + Div<Output = Self> + Debug {}

impl<W> Weight for W where W: Copy + Ord + Zero + One + Mul<Output = W> + Div<Output = W> + Debug {}

/// `numerator / denominator`, or zero if the denominator is zero.
pub fn ratio<W: Weight>(numerator: W, denominator: W) -> W {
    if denominator.is_zero() {
        W::zero()
    } else {
        numerator / denominator
    }
}

/// Semiring product of all weights, `one` for the empty sequence.
pub fn product<W: Weight, I: IntoIterator<Item = W>>(weights: I) -> W {
    weights.into_iter().fold(W::one(), |acc, w| acc * w)
}

#[cfg(test)]
mod test {
    use super::*;
    use log_domain::LogDomain;

    #[test]
    fn ratio_by_zero() {
        let half: LogDomain<f64> = LogDomain::new(0.5).unwrap();
        assert_eq!(ratio(half, LogDomain::zero()), LogDomain::zero());
        assert!((ratio(half, half).value() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn product_of_weights() {
        let ws = vec![0.5, 0.4, 0.5].into_iter().map(|p: f64| LogDomain::new(p).unwrap());
        assert!((product(ws).value() - 0.1).abs() < 1e-9);
        assert_eq!(product(Vec::<LogDomain<f64>>::new()), LogDomain::one());
    }
}
