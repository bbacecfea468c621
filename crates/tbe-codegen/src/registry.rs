//! Accumulator of the optimizers a run ended up supporting.

use crate::catalogue::OptimizerDescriptor;

/// Append-only record filled while the orchestrator walks the catalogue.
#[derive(Debug, Clone, Default)]
pub struct OutputRegistry {
    all: Vec<String>,
    offloaded: Vec<String>,
}

/// Registry contents once the catalogue walk is over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    /// Optimizers with at least one backend, dense placeholder excluded.
    pub all_optimizers: Vec<String>,
    /// Subset of `all_optimizers` that supports offloaded storage.
    pub offloaded_optimizers: Vec<String>,
}

impl OutputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `descriptor` if it is a real optimizer on some backend.
    ///
    /// Returns whether it was recorded.
    pub fn record(&mut self, descriptor: &OptimizerDescriptor) -> bool {
        if !descriptor.supports_any_backend() || descriptor.is_dense {
            return false;
        }
        self.all.push(descriptor.name.clone());
        if descriptor.supports_offloaded_storage {
            self.offloaded.push(descriptor.name.clone());
        }
        true
    }

    pub fn finalize(self) -> RegistrySnapshot {
        RegistrySnapshot {
            all_optimizers: self.all,
            offloaded_optimizers: self.offloaded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(name: &str, cpu: bool, gpu: bool, ssd: bool, dense: bool) -> OptimizerDescriptor {
        let mut d = OptimizerDescriptor::device_catalogue(false, ssd);
        d.name = name.to_string();
        d.supports_cpu = cpu;
        d.supports_gpu = gpu;
        d.is_dense = dense;
        d
    }

    #[test]
    fn records_in_order_and_splits_offloaded() {
        let mut r = OutputRegistry::new();
        assert!(r.record(&opt("adam", false, true, true, false)));
        assert!(r.record(&opt("approx_sgd", true, false, false, false)));
        assert!(r.record(&opt("sgd", true, true, true, false)));
        let snap = r.finalize();
        assert_eq!(snap.all_optimizers, vec!["adam", "approx_sgd", "sgd"]);
        assert_eq!(snap.offloaded_optimizers, vec!["adam", "sgd"]);
    }

    #[test]
    fn skips_dense_and_backendless() {
        let mut r = OutputRegistry::new();
        assert!(!r.record(&opt("dense", true, true, false, true)));
        assert!(!r.record(&opt("nowhere", false, false, true, false)));
        assert_eq!(r.finalize(), RegistrySnapshot::default());
    }
}
