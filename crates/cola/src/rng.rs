/// Small deterministic RNG (xorshift64*) so layouts are reproducible for a given seed.
#[derive(Debug, Clone)]
pub(crate) struct XorShift64Star {
    state: u64,
}

impl XorShift64Star {
    pub(crate) fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D_u64)
    }

    /// Uniform in `[-1, 1)`.
    pub(crate) fn next_f64_signed(&mut self) -> f64 {
        let u = self.next_u64() >> 11;
        let v = (u as f64) / ((1u64 << 53) as f64);
        (v * 2.0) - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::XorShift64Star;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = XorShift64Star::new(7);
        let mut b = XorShift64Star::new(7);
        for _ in 0..16 {
            assert_eq!(a.next_f64_signed().to_bits(), b.next_f64_signed().to_bits());
        }
    }

    #[test]
    fn signed_samples_stay_in_range() {
        // Seed 0 is bumped to 1 so the generator never gets stuck at zero.
        let mut rng = XorShift64Star::new(0);
        for _ in 0..1000 {
            let v = rng.next_f64_signed();
            assert!((-1.0..1.0).contains(&v), "{v}");
        }
    }
}
