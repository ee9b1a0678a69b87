//! Filter workload profiled by the probe.
//!
//! Both kernels sum the values divisible by 7 and scale the sum by 0.1.
//! The sum is accumulated as an integer so the two kernels agree exactly.

use std::convert::Infallible;
use std::time::Duration;

use tier_dispatch::Implementation;

/// Which formulation of the filter a kernel runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelVariant {
    /// Element-by-element loop.
    HighLevel,
    /// Chunked iterator pipeline.
    Optimized,
}

/// Filter kernel with an optional artificial delay.
#[derive(Debug, Clone, Copy)]
pub struct FilterKernel {
    variant: KernelVariant,
    delay: Duration,
}

impl FilterKernel {
    pub fn high_level() -> Self {
        Self {
            variant: KernelVariant::HighLevel,
            delay: Duration::ZERO,
        }
    }

    pub fn optimized() -> Self {
        Self {
            variant: KernelVariant::Optimized,
            delay: Duration::ZERO,
        }
    }

    /// Sleep for `delay` on every call, to simulate a slow path.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn variant(&self) -> KernelVariant {
        self.variant
    }
}

impl Implementation<[u64]> for FilterKernel {
    type Output = f64;
    type Error = Infallible;

    fn run(&self, data: &[u64]) -> Result<f64, Infallible> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let total = match self.variant {
            KernelVariant::HighLevel => high_level_sum(data),
            KernelVariant::Optimized => optimized_sum(data),
        };
        Ok(total as f64 * 0.1)
    }
}

fn high_level_sum(data: &[u64]) -> u64 {
    let mut total = 0u64;
    for &value in data {
        if value % 7 == 0 {
            total = total.wrapping_add(value);
        }
    }
    total
}

fn optimized_sum(data: &[u64]) -> u64 {
    const LANES: usize = 8;
    let chunks = data.chunks_exact(LANES);
    let tail = chunks.remainder();
    let mut lanes = [0u64; LANES];
    for chunk in chunks {
        for (lane, &value) in lanes.iter_mut().zip(chunk) {
            if value % 7 == 0 {
                *lane = lane.wrapping_add(value);
            }
        }
    }
    let body = lanes.iter().fold(0u64, |acc, v| acc.wrapping_add(*v));
    tail.iter()
        .filter(|v| *v % 7 == 0)
        .fold(body, |acc, v| acc.wrapping_add(*v))
}

/// Dataset `0..size`.
pub fn dataset(size: usize) -> Vec<u64> {
    (0..size as u64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernels_agree() {
        for size in [0, 1, 7, 8, 9, 63, 1_000, 100_000] {
            let data = dataset(size);
            assert_eq!(
                FilterKernel::high_level().run(data.as_slice()).unwrap(),
                FilterKernel::optimized().run(data.as_slice()).unwrap(),
                "size {size}"
            );
        }
    }

    #[test]
    fn test_known_value() {
        // multiples of 7 below 100: 7 + 14 + ... + 98 = 735
        let data = dataset(100);
        assert_eq!(high_level_sum(&data), 735);
        assert_eq!(optimized_sum(&data), 735);
    }

    #[test]
    fn test_delay_is_applied() {
        let kernel = FilterKernel::optimized().with_delay(Duration::from_millis(3));
        let start = std::time::Instant::now();
        kernel.run(dataset(10).as_slice()).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(3));
        assert_eq!(kernel.variant(), KernelVariant::Optimized);
    }
}
