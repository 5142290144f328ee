/*!
Input data scaling
*/
use crate::CpuFloat;
use num::Float;

/// A min-max scaler mapping a fitted series onto `[0, 1]`
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MinMaxScaler<F = CpuFloat> {
    /// The smallest finite value seen while fitting
    pub min: F,
    /// The largest finite value seen while fitting
    pub max: F,
}

impl<F> MinMaxScaler<F>
where
    F: Copy + Float,
{
    /// Fit a scaler to the finite values of a series, returning `None` if there are none
    pub fn fit(values: &[F]) -> Option<MinMaxScaler<F>> {
        let mut finite = values.iter().copied().filter(|v| v.is_finite());
        let first = finite.next()?;
        let (min, max) = finite.fold((first, first), |(min, max), v| (min.min(v), max.max(v)));
        Some(MinMaxScaler { min, max })
    }

    /// The fitted range, `max - min`
    #[inline]
    pub fn range(&self) -> F {
        self.max - self.min
    }

    /// Scale a value according to the fitted range. A constant series scales to zero.
    #[inline]
    pub fn transform(&self, val: F) -> F {
        let range = self.range();
        if range == F::zero() {
            return F::zero();
        }
        (val - self.min) / range
    }

    /// Undo [`transform`](Self::transform)
    #[inline]
    pub fn inverse(&self, scaled: F) -> F {
        scaled * self.range() + self.min
    }

    /// Scale a whole series
    pub fn transform_all(&self, values: &[F]) -> Vec<F> {
        values.iter().map(|&v| self.transform(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_into_unit_interval() {
        let scaler = MinMaxScaler::fit(&[10.0, 20.0, f64::NAN, 15.0]).unwrap();
        assert_eq!(scaler.min, 10.0);
        assert_eq!(scaler.max, 20.0);
        assert_eq!(scaler.transform_all(&[10.0, 15.0, 20.0]), vec![0.0, 0.5, 1.0]);
        assert_eq!(scaler.inverse(0.25), 12.5);
        // Out-of-range values extrapolate rather than clip
        assert_eq!(scaler.transform(30.0), 2.0);
    }

    #[test]
    fn constant_and_empty_series() {
        let scaler = MinMaxScaler::fit(&[4.0f32, 4.0]).unwrap();
        assert_eq!(scaler.transform(4.0), 0.0);
        assert_eq!(scaler.inverse(0.0), 4.0);
        assert!(MinMaxScaler::<f64>::fit(&[]).is_none());
        assert!(MinMaxScaler::fit(&[f64::INFINITY]).is_none());
    }
}
