//! # tbe-codegen
//!
//! Build-time source generator for table-batched embedding backward
//! kernels.
//!
//! From a YAML optimizer catalogue, the generator enumerates every valid
//! combination of variant flags (weighted, no-pooling, variable-batch,
//! offloaded storage, global decay, dense) per optimizer and device
//! backend, names each variant, binds it to a template, and writes one
//! source file per (template, variant) pair. Every artifact that packs
//! auxiliary arguments positionally is bound to the same
//! [`aux_args::AuxArgSchema`] form.
//!
//! ## Modules
//!
//! - [`catalogue`] — Parse and validate the YAML optimizer catalogue
//! - [`options`] — Variant dimensions and the validity predicate
//! - [`naming`] — Variant descriptors and output filenames
//! - [`aux_args`] — Positional auxiliary-argument schema (base + offloaded)
//! - [`planner`] — Expand an option space into generation tasks
//! - [`template`] — Template loading and `{{ name }}` rendering
//! - [`registry`] — Accumulator of supported optimizer names
//! - [`generate`] — Orchestrate every pass and write the output set

pub mod aux_args;
pub mod catalogue;
pub mod error;
pub mod generate;
pub mod naming;
pub mod options;
pub mod planner;
pub mod registry;
pub mod template;
