//! Variant planner — expands an option space into generation tasks.
//!
//! Planning is pure: it decides which files exist, what they are called
//! and what they are rendered against, but never touches a template or
//! the filesystem.

use crate::catalogue::{Backend, OptimizerDescriptor};
use crate::naming::{VariantNames, index_weight_descriptor, output_filename};
use crate::options::{OptionSpace, PassKind, VariantFlags, is_valid_storage};
use crate::template::Bindings;

/// One file to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTask {
    /// Template path, relative to the template root.
    pub template: String,
    /// Output filename, relative to the output directory.
    pub output: String,
    pub bindings: Bindings,
    /// Variant the task was expanded from; `None` for tasks that are not
    /// part of a combinatorial expansion.
    pub flags: Option<VariantFlags>,
}

impl GenerationTask {
    pub fn single(template: &str, output: impl Into<String>, bindings: Bindings) -> Self {
        Self {
            template: template.to_string(),
            output: output.into(),
            bindings,
            flags: None,
        }
    }
}

/// Bindings describing one variant.
pub fn variant_bindings(flags: &VariantFlags) -> Bindings {
    let names = VariantNames::of(flags);
    Bindings::new()
        .with("weighted", flags.weighted)
        .with("no_pooling", flags.no_pooling)
        .with("variable_batch", flags.variable_batch)
        .with("offloaded_storage", flags.offloaded_storage)
        .with("global_decay", flags.global_decay)
        .with("index_select", false)
        .with("gen_once", false)
        .with("kind_descriptor", names.kind)
        .with("storage_descriptor", names.storage)
        .with("descriptor", names.full)
}

/// Plan every valid variant of one GPU template for `descriptor`.
///
/// `pattern` is a filename pattern with `{optimizer}` and `{desc}`
/// placeholders; `{desc}` receives the full descriptor. A descriptor
/// without GPU support yields no tasks.
///
/// A global-decay pass keeps the variable-batch dimension for pooled
/// variants; whether every kernel body supports that combination has not
/// been verified, so the filter deliberately stays as loose as the
/// kernels it was written for.
pub fn plan(
    template: &str,
    pattern: &str,
    descriptor: &OptimizerDescriptor,
    pass: PassKind,
) -> Vec<GenerationTask> {
    if !descriptor.supports_gpu {
        return Vec::new();
    }

    let base = descriptor.bindings(Backend::Gpu);
    OptionSpace::new(descriptor, pass)
        .combinations()
        .into_iter()
        .map(|flags| {
            let mut bindings = base.clone();
            bindings.extend(&variant_bindings(&flags));
            let desc = VariantNames::of(&flags).full;
            GenerationTask {
                template: template.to_string(),
                output: output_filename(pattern, &descriptor.name, &desc),
                bindings,
                flags: Some(flags),
            }
        })
        .collect()
}

/// Plan the index-weight gradient kernels over `{dense, offloaded}`.
///
/// Dense with offloaded storage is rejected, leaving `dense`, `ssd` and
/// `split`.
pub fn plan_index_weights(template: &str, pattern: &str) -> Vec<GenerationTask> {
    let mut tasks = Vec::new();
    for dense in [true, false] {
        for offloaded_storage in [true, false] {
            if !is_valid_storage(dense, offloaded_storage) {
                continue;
            }
            let desc = index_weight_descriptor(dense, offloaded_storage);
            let bindings = Bindings::new()
                .with("dense", dense)
                .with("offloaded_storage", offloaded_storage)
                .with("descriptor", desc);
            tasks.push(GenerationTask::single(
                template,
                output_filename(pattern, "", desc),
                bindings,
            ));
        }
    }
    tasks
}
