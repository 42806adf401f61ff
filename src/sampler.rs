//! Pure sampling predicate over `sampleRate`, with an injectable source of
//! randomness (the same algorithm/randomness separation a jitter backoff
//! makes between its delay formula and its `RandomSource`).

use std::sync::Arc;

use rand::Rng;

/// A source of uniform(0, 1) draws.
pub trait RandomSource: Send + Sync {
    fn uniform01(&self) -> f64;
}

/// Production source, backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSource;

impl RandomSource for ThreadRngSource {
    fn uniform01(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Test source that always returns the same draw.
#[derive(Debug, Clone, Copy)]
pub struct FixedSource(pub f64);

impl RandomSource for FixedSource {
    fn uniform01(&self) -> f64 {
        self.0
    }
}

/// Samples events by `sampleRate`.
///
/// An event is admitted iff `sample_rate <= 1` or `uniform01() < 1 /
/// sample_rate`. With `sample_rate = k` and a uniform random source, the
/// admitted fraction tends to `1/k` as the number of trials grows.
#[derive(Clone)]
pub struct Sampler {
    source: Arc<dyn RandomSource>,
}

impl Sampler {
    pub fn new(source: Arc<dyn RandomSource>) -> Self {
        Self { source }
    }

    pub fn admit(&self, sample_rate: u32) -> bool {
        if sample_rate <= 1 {
            return true;
        }
        self.source.uniform01() < 1.0 / f64::from(sample_rate)
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(Arc::new(ThreadRngSource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_one_always_admits() {
        let sampler = Sampler::new(Arc::new(FixedSource(0.999)));
        assert!(sampler.admit(1));
        assert!(sampler.admit(0));
    }

    #[test]
    fn fixed_source_below_threshold_admits() {
        // rate 10 -> threshold 0.1; 0.05 < 0.1 admits
        let sampler = Sampler::new(Arc::new(FixedSource(0.05)));
        assert!(sampler.admit(10));
    }

    #[test]
    fn fixed_source_above_threshold_drops() {
        // rate 10 -> threshold 0.1; 0.11 >= 0.1 drops
        let sampler = Sampler::new(Arc::new(FixedSource(0.11)));
        assert!(!sampler.admit(10));
    }
}
