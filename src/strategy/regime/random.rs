//! Injectable randomness for confidence jitter

use rand::Rng;

/// Source of uniform samples in `[0, 1)`
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;
}

/// Thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&mut self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Always returns the same sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedRandom(pub f64);

impl Default for FixedRandom {
    /// Midpoint, which makes jitter vanish
    fn default() -> Self {
        Self(0.5)
    }
}

impl RandomSource for FixedRandom {
    fn next_f64(&mut self) -> f64 {
        self.0
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_f64(&mut self) -> f64 {
        (**self).next_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_random_range() {
        let mut rng = ThreadRandom;
        for _ in 0..100 {
            let x = rng.next_f64();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn test_fixed_random() {
        let mut rng = FixedRandom(0.25);
        assert_eq!(rng.next_f64(), 0.25);
        assert_eq!(FixedRandom::default().next_f64(), 0.5);
    }
}
