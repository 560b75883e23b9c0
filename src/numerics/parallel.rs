use crate::discretization::kernel::Site;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Below this many sites `Auto` stays on the calling thread.
pub const MIN_PARALLEL_SITES: usize = 4096;

/// How a per-site kernel body is scheduled.
///
/// Every variant evaluates the same body and returns results in site order;
/// callers then accumulate them sequentially, so the output does not depend
/// on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionBackend {
    Serial,
    Threaded,
    #[default]
    Auto,
}

impl ExecutionBackend {
    pub fn is_threaded(&self, n: usize) -> bool {
        match self {
            ExecutionBackend::Serial => false,
            ExecutionBackend::Threaded => true,
            ExecutionBackend::Auto => n >= MIN_PARALLEL_SITES,
        }
    }

    /// Evaluate `f(k)` for `k` in `0..n`.
    pub fn map_range<T, F>(&self, n: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        if self.is_threaded(n) {
            (0..n).into_par_iter().map(f).collect()
        } else {
            (0..n).map(f).collect()
        }
    }

    /// Evaluate `f` on each of an explicit list of sites.
    pub fn map_sites<T, F>(&self, sites: &[Site], f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&Site) -> T + Sync + Send,
    {
        if self.is_threaded(sites.len()) {
            sites.par_iter().map(f).collect()
        } else {
            sites.iter().map(f).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_switches_on_size() {
        assert!(!ExecutionBackend::Auto.is_threaded(MIN_PARALLEL_SITES - 1));
        assert!(ExecutionBackend::Auto.is_threaded(MIN_PARALLEL_SITES));
        assert!(ExecutionBackend::Threaded.is_threaded(1));
        assert!(!ExecutionBackend::Serial.is_threaded(usize::MAX));
    }

    #[test]
    fn threaded_map_preserves_order() {
        let serial = ExecutionBackend::Serial.map_range(10_000, |k| (k as f64).sqrt());
        let threaded = ExecutionBackend::Threaded.map_range(10_000, |k| (k as f64).sqrt());
        assert_eq!(serial, threaded);
    }

    #[test]
    fn backend_deserialises_from_snake_case() {
        let backend: ExecutionBackend = serde_json::from_str("\"threaded\"").unwrap();
        assert_eq!(backend, ExecutionBackend::Threaded);
    }
}
