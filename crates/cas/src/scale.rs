//! The user-supplied scale factor.

use std::fmt;

use crate::CasError;

/// A scale factor in `0..=2`.
///
/// ```
/// use cas::ScaleFactor;
///
/// let half = ScaleFactor::new(0.5).unwrap();
/// assert_eq!(half.apply(101, 40), (50, 20));
/// assert!(ScaleFactor::new(2.5).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct ScaleFactor(f64);

impl ScaleFactor {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 2.0;
    pub const DEFAULT: f64 = 0.5;

    /// Validate `factor`. NaN and anything outside `0..=2` is rejected.
    pub fn new(factor: f64) -> Result<Self, CasError> {
        if (Self::MIN..=Self::MAX).contains(&factor) {
            Ok(ScaleFactor(factor))
        } else {
            Err(CasError::ScaleOutOfRange(factor))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }

    /// Target size for a `width` x `height` image. Fractions are truncated
    /// and each side is at least one pixel.
    pub fn apply(self, width: u32, height: u32) -> (u32, u32) {
        (self.scale(width), self.scale(height))
    }

    fn scale(self, side: u32) -> u32 {
        ((f64::from(side) * self.0) as u32).max(1)
    }
}

impl Default for ScaleFactor {
    fn default() -> Self {
        ScaleFactor(Self::DEFAULT)
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_inclusive() {
        assert!(ScaleFactor::new(0.0).is_ok());
        assert!(ScaleFactor::new(2.0).is_ok());
        assert!(matches!(
            ScaleFactor::new(-0.1),
            Err(CasError::ScaleOutOfRange(_))
        ));
        assert!(ScaleFactor::new(2.01).is_err());
        assert!(ScaleFactor::new(f64::NAN).is_err());
        assert!(ScaleFactor::new(f64::INFINITY).is_err());
    }

    #[test]
    fn default_is_half() {
        assert_eq!(ScaleFactor::default().get(), 0.5);
    }

    #[test]
    fn zero_clamps_to_one_pixel() {
        let zero = ScaleFactor::new(0.0).unwrap();
        assert_eq!(zero.apply(640, 480), (1, 1));
    }

    #[test]
    fn upscale_and_truncate() {
        let f = ScaleFactor::new(1.5).unwrap();
        assert_eq!(f.apply(3, 5), (4, 7));
        let f = ScaleFactor::new(2.0).unwrap();
        assert_eq!(f.apply(10, 1), (20, 2));
    }
}
