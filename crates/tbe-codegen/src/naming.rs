//! Variant descriptors and output filenames.
//!
//! Everything here is a pure function of its inputs: identical flags
//! always produce identical names, which keeps two runs byte-identical.

use crate::options::VariantFlags;

/// Descriptor strings derived from a [`VariantFlags`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantNames {
    /// `weighted|unweighted` + `_nobag` + `_vbe`.
    pub kind: String,
    /// `ssd` or `split`.
    pub storage: &'static str,
    /// `{storage}_{kind}`.
    pub full: String,
}

impl VariantNames {
    pub fn of(flags: &VariantFlags) -> Self {
        let kind = kind_descriptor(flags);
        let storage = storage_descriptor(flags.offloaded_storage);
        let full = format!("{storage}_{kind}");
        Self { kind, storage, full }
    }
}

pub fn kind_descriptor(flags: &VariantFlags) -> String {
    let mut kind = String::from(if flags.weighted { "weighted" } else { "unweighted" });
    if flags.no_pooling {
        kind.push_str("_nobag");
    }
    if flags.variable_batch {
        kind.push_str("_vbe");
    }
    kind
}

pub fn storage_descriptor(offloaded_storage: bool) -> &'static str {
    if offloaded_storage { "ssd" } else { "split" }
}

/// `_ssd` for the offloaded form, empty otherwise.
pub fn storage_suffix(offloaded_storage: bool) -> &'static str {
    if offloaded_storage { "_ssd" } else { "" }
}

/// Descriptor of an index-weight gradient kernel.
pub fn index_weight_descriptor(dense: bool, offloaded_storage: bool) -> &'static str {
    if dense {
        "dense"
    } else {
        storage_descriptor(offloaded_storage)
    }
}

/// Substitute `{optimizer}` and `{desc}` into a filename pattern.
pub fn output_filename(pattern: &str, optimizer: &str, desc: &str) -> String {
    pattern
        .replace("{optimizer}", optimizer)
        .replace("{desc}", desc)
}
