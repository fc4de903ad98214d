use crate::error::Result;

/// Point and interval estimates of a one-dimensional draw sequence
pub trait IntervalOps {
    type Scalar;

    /// Arithmetic mean of the draws
    fn sample_mean(&self) -> Self::Scalar;

    /// Narrowest interval covering `mass` of the empirical distribution
    fn hpd_interval(&self, mass: Self::Scalar) -> Result<(Self::Scalar, Self::Scalar)>;

    /// Narrowest interval covering `mass` that also contains `point`
    fn hpd_interval_around(
        &self,
        mass: Self::Scalar,
        point: Self::Scalar,
    ) -> Result<(Self::Scalar, Self::Scalar)>;

    /// Interval between the `(1 - mass)/2` and `(1 + mass)/2` quantiles
    fn equal_tail_interval(&self, mass: Self::Scalar) -> Result<(Self::Scalar, Self::Scalar)>;
}
