//! Variant dimensions and the validity predicate.
//!
//! The option space is the Cartesian product of four boolean
//! dimensions, each collapsed to `{false}` when the optimizer or the pass
//! cannot use it. Combinations that do not apply are filtered by
//! [`is_valid`]; a rejected combination is a silent skip, not an error.

use crate::catalogue::OptimizerDescriptor;

/// Whether a planning pass produces global-decay kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassKind {
    #[default]
    Regular,
    GlobalDecay,
}

impl PassKind {
    pub fn is_global_decay(self) -> bool {
        self == Self::GlobalDecay
    }
}

/// One point of the option space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantFlags {
    pub weighted: bool,
    pub no_pooling: bool,
    pub variable_batch: bool,
    pub offloaded_storage: bool,
    pub global_decay: bool,
}

/// Validity predicate over a combination.
///
/// Rejects no-pooling with weighting or variable batch, dense with
/// offloaded storage, and offloaded storage on a global-decay pass.
pub fn is_valid(flags: &VariantFlags, is_dense: bool) -> bool {
    if flags.no_pooling && (flags.weighted || flags.variable_batch) {
        return false;
    }
    if !is_valid_storage(is_dense, flags.offloaded_storage) {
        return false;
    }
    !(flags.offloaded_storage && flags.global_decay)
}

/// Dense mode and offloaded storage are mutually exclusive.
pub fn is_valid_storage(is_dense: bool, offloaded_storage: bool) -> bool {
    !(is_dense && offloaded_storage)
}

const BOTH: &[bool] = &[true, false];
const OFF: &[bool] = &[false];

/// Per-dimension domains for one optimizer and pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpace {
    weighted: &'static [bool],
    no_pooling: &'static [bool],
    variable_batch: &'static [bool],
    offloaded_storage: &'static [bool],
    is_dense: bool,
    pass: PassKind,
}

impl OptionSpace {
    pub fn new(descriptor: &OptimizerDescriptor, pass: PassKind) -> Self {
        Self {
            weighted: BOTH,
            no_pooling: if pass.is_global_decay() { OFF } else { BOTH },
            variable_batch: if descriptor.supports_variable_batch { BOTH } else { OFF },
            offloaded_storage: if descriptor.supports_offloaded_storage { BOTH } else { OFF },
            is_dense: descriptor.is_dense,
            pass,
        }
    }

    /// Size of the unfiltered product.
    pub fn cardinality(&self) -> usize {
        self.weighted.len()
            * self.no_pooling.len()
            * self.variable_batch.len()
            * self.offloaded_storage.len()
    }

    /// Every valid combination, `weighted` outermost, `offloaded_storage`
    /// innermost, `true` before `false` in each dimension.
    pub fn combinations(&self) -> Vec<VariantFlags> {
        let mut out = Vec::with_capacity(self.cardinality());
        for &weighted in self.weighted {
            for &no_pooling in self.no_pooling {
                for &variable_batch in self.variable_batch {
                    for &offloaded_storage in self.offloaded_storage {
                        let flags = VariantFlags {
                            weighted,
                            no_pooling,
                            variable_batch,
                            offloaded_storage,
                            global_decay: self.pass.is_global_decay(),
                        };
                        if is_valid(&flags, self.is_dense) {
                            out.push(flags);
                        }
                    }
                }
            }
        }
        out
    }
}
