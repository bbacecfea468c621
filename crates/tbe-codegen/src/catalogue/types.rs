use serde::{Deserialize, Serialize};

use crate::template::Bindings;

/// A complete optimizer catalogue.
///
/// Root of `codegen/catalogue.yaml`. The order of `optimizers` is the
/// iteration order of a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalogue {
    pub version: String,
    pub aux_args: AuxArgsDecl,
    /// Tensors that only exist when rows live in offloaded storage.
    #[serde(default)]
    pub offloaded_tensors: Vec<String>,
    #[serde(default)]
    pub optimizers: Vec<OptimizerDescriptor>,
}

/// Declaration of the positional auxiliary-argument schema.
///
/// `bucket_order` restates the bucket names in the order the generated
/// headers index them; it must agree with the order of `buckets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuxArgsDecl {
    pub bucket_order: Vec<String>,
    pub buckets: Vec<BucketDecl>,
    /// Appended to the boolean bucket in the offloaded-storage form.
    ///
    /// Defaults to empty so a catalogue can be parsed and validated without
    /// it; building the schema rejects an empty list.
    #[serde(default)]
    pub offloaded_bool_extras: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketDecl {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Capability record for one optimizer.
///
/// Deserialized once per run and only ever borrowed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerDescriptor {
    pub name: String,
    #[serde(default)]
    pub supports_cpu: bool,
    #[serde(default)]
    pub supports_gpu: bool,
    #[serde(default)]
    pub supports_variable_batch: bool,
    #[serde(default)]
    pub supports_offloaded_storage: bool,
    #[serde(default)]
    pub supports_global_decay: bool,
    /// Dense placeholder entry: no optimizer state, narrower host surface.
    #[serde(default)]
    pub is_dense: bool,
    /// Selects the tolerant CPU kernel template.
    #[serde(default)]
    pub is_approximate: bool,
    #[serde(default, rename = "arguments")]
    pub device_argument_sets: DeviceArgumentSets,
}

/// Optimizer-specific argument names per backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceArgumentSets {
    #[serde(default)]
    pub gpu: Vec<String>,
    #[serde(default)]
    pub cpu: Vec<String>,
    /// Compiled-execution surface shared by both backends.
    #[serde(default)]
    pub unified: Vec<String>,
}

/// Device backend a set of bindings is prepared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Gpu,
    Cpu,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gpu => write!(f, "gpu"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

impl OptimizerDescriptor {
    /// Synthetic descriptor used by the backend-wide device-kernel passes.
    ///
    /// Those passes are not tied to an optimizer, so the name is empty and
    /// only the GPU capabilities that shape the option space are set.
    pub fn device_catalogue(supports_variable_batch: bool, supports_offloaded_storage: bool) -> Self {
        Self {
            name: String::new(),
            supports_cpu: false,
            supports_gpu: true,
            supports_variable_batch,
            supports_offloaded_storage,
            supports_global_decay: false,
            is_dense: false,
            is_approximate: false,
            device_argument_sets: DeviceArgumentSets::default(),
        }
    }

    pub fn supports_any_backend(&self) -> bool {
        self.supports_cpu || self.supports_gpu
    }

    /// Offloaded-storage values this optimizer is generated for, `true` first.
    pub fn storage_modes(&self) -> &'static [bool] {
        if self.supports_offloaded_storage && !self.is_dense {
            &[true, false]
        } else {
            &[false]
        }
    }

    /// Bindings every template rendered for this optimizer can rely on.
    pub fn bindings(&self, backend: Backend) -> Bindings {
        let args = match backend {
            Backend::Gpu => &self.device_argument_sets.gpu,
            Backend::Cpu => &self.device_argument_sets.cpu,
        };
        Bindings::new()
            .with("optimizer", self.name.as_str())
            .with("backend", backend.to_string())
            .with("supports_cpu", self.supports_cpu)
            .with("supports_gpu", self.supports_gpu)
            .with("supports_variable_batch", self.supports_variable_batch)
            .with("supports_offloaded_storage", self.supports_offloaded_storage)
            .with("supports_global_decay", self.supports_global_decay)
            .with("dense", self.is_dense)
            .with("approximate", self.is_approximate)
            .with("args", args.clone())
            .with("unified_args", self.device_argument_sets.unified.clone())
    }
}
