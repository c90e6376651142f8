use std::sync::atomic::{AtomicU64, Ordering};

/// Lazily memoized weighting value for a query part instance.
///
/// Deliberately unsynchronized: concurrent evaluations racing on the first
/// access may each run the computation, and both stores are accepted. The
/// computation is idempotent for a given index snapshot, so the race is
/// benign, and no lock is taken on the hot path.
pub(crate) struct CachedWeighting(AtomicU64);

/// u64::MAX is a NaN bit pattern; computed weightings are always finite
const UNSET: u64 = u64::MAX;

impl CachedWeighting {
    pub const fn new() -> Self {
        CachedWeighting(AtomicU64::new(UNSET))
    }

    pub fn get_or_compute(&self, compute: impl FnOnce() -> f64) -> f64 {
        let bits = self.0.load(Ordering::Relaxed);
        if bits != UNSET {
            return f64::from_bits(bits);
        }
        let value = compute();
        let value = if value.is_finite() { value } else { 0.0 };
        self.0.store(value.to_bits(), Ordering::Relaxed);
        value
    }
}

impl Default for CachedWeighting {
    fn default() -> Self {
        CachedWeighting::new()
    }
}

impl Clone for CachedWeighting {
    fn clone(&self) -> Self {
        CachedWeighting(AtomicU64::new(self.0.load(Ordering::Relaxed)))
    }
}

impl std::fmt::Debug for CachedWeighting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.load(Ordering::Relaxed) {
            UNSET => write!(f, "CachedWeighting(unset)"),
            bits => write!(f, "CachedWeighting({})", f64::from_bits(bits)),
        }
    }
}
