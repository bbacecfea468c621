//! End-to-end generation — plans every pass, renders, writes to disk.
//!
//! A run has three phases. [`Orchestrator`] walks the catalogue and the
//! backend-wide passes and produces a [`RunPlan`] without touching any
//! template. [`RunPlan::render`] renders every task in memory. Only when
//! everything rendered does [`write_rendered`] create files, so a failing
//! run leaves the output directory untouched.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::aux_args::{AuxArgSchema, AuxArgSchemas};
use crate::catalogue::{Backend, Catalogue, OptimizerDescriptor, validate_catalogue};
use crate::error::{CodegenError, Severity};
use crate::naming::{output_filename, storage_descriptor, storage_suffix};
use crate::options::PassKind;
use crate::planner::{GenerationTask, plan, plan_index_weights};
use crate::registry::{OutputRegistry, RegistrySnapshot};
use crate::template::{Bindings, Template, TemplateSource};

/// The kind of generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Combinatorial GPU backward kernel (main, meta, CTA or warp).
    GpuKernel,
    /// GPU kernel planned on the global-decay pass.
    GlobalDecayKernel,
    /// Per-row optimizer-state update kernel.
    OptimizerKernel,
    /// Host-level autograd wrapper.
    HostWrapper,
    /// Unified compiled-execution autograd wrapper.
    CompiledAutograd,
    /// Compiled-execution GPU wrapper.
    CompiledWrapper,
    /// High-level dispatch module for one optimizer and storage form.
    DispatchModule,
    /// CPU backward kernel body, exact or approximate.
    CpuKernel,
    /// CPU host wrapper.
    CpuHostWrapper,
    /// Compiled-execution CPU wrapper.
    CpuCompiledWrapper,
    /// Shared device kernel from the backend-wide catalogue.
    DeviceKernel,
    /// Gradient-accumulation kernel, generated once.
    GradKernel,
    /// Index-weight gradient kernel.
    IndexWeights,
    /// Device kernel for the alternate GPU backend.
    AltGpuDeviceKernel,
    /// Header with positional auxiliary-argument indices.
    SchemaHeader,
    /// Listing of every generated dispatch module.
    ModuleListing,
    /// Argument-container module for the dispatch layer.
    ArgListing,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::GpuKernel => "gpu-kernel",
            Self::GlobalDecayKernel => "gwd-kernel",
            Self::OptimizerKernel => "optimizer-kernel",
            Self::HostWrapper => "host-wrapper",
            Self::CompiledAutograd => "compiled-autograd",
            Self::CompiledWrapper => "compiled-wrapper",
            Self::DispatchModule => "dispatch-module",
            Self::CpuKernel => "cpu-kernel",
            Self::CpuHostWrapper => "cpu-host-wrapper",
            Self::CpuCompiledWrapper => "cpu-compiled-wrapper",
            Self::DeviceKernel => "device-kernel",
            Self::GradKernel => "grad-kernel",
            Self::IndexWeights => "index-weights",
            Self::AltGpuDeviceKernel => "alt-gpu-device-kernel",
            Self::SchemaHeader => "schema-header",
            Self::ModuleListing => "module-listing",
            Self::ArgListing => "arg-listing",
        };
        write!(f, "{s}")
    }
}

/// A template and the filename pattern its outputs follow.
#[derive(Debug, Clone, Copy)]
pub struct TemplateSpec {
    pub path: &'static str,
    pub pattern: &'static str,
    pub kind: ArtifactKind,
}

const fn spec(path: &'static str, pattern: &'static str, kind: ArtifactKind) -> TemplateSpec {
    TemplateSpec {
        path,
        pattern,
        kind,
    }
}

const MAIN_KERNEL: &str = "training/backward/embedding_backward_split_template.cu";
const CTA_KERNEL: &str = "training/backward/embedding_backward_split_kernel_cta_template.cu";
const WARP_KERNEL: &str = "training/backward/embedding_backward_split_kernel_warp_template.cu";
const DEVICE_KERNEL_TEMPLATE: &str =
    "training/backward/embedding_backward_split_device_kernel_template.cuh";

pub const GPU_KERNELS: [TemplateSpec; 4] = [
    spec(
        MAIN_KERNEL,
        "gen_embedding_backward_{optimizer}_{desc}_cuda.cu",
        ArtifactKind::GpuKernel,
    ),
    spec(
        "training/backward/embedding_backward_split_meta_template.cpp",
        "gen_embedding_backward_{optimizer}_{desc}_meta.cpp",
        ArtifactKind::GpuKernel,
    ),
    spec(
        CTA_KERNEL,
        "gen_embedding_backward_{optimizer}_{desc}_kernel_cta.cu",
        ArtifactKind::GpuKernel,
    ),
    spec(
        WARP_KERNEL,
        "gen_embedding_backward_{optimizer}_{desc}_kernel_warp.cu",
        ArtifactKind::GpuKernel,
    ),
];

pub const GLOBAL_DECAY_KERNELS: [TemplateSpec; 3] = [
    spec(
        CTA_KERNEL,
        "gen_embedding_backward_{optimizer}_{desc}_gwd_kernel_cta.cu",
        ArtifactKind::GlobalDecayKernel,
    ),
    spec(
        WARP_KERNEL,
        "gen_embedding_backward_{optimizer}_{desc}_gwd_kernel_warp.cu",
        ArtifactKind::GlobalDecayKernel,
    ),
    spec(
        MAIN_KERNEL,
        "gen_embedding_backward_{optimizer}_{desc}_gwd_cuda.cu",
        ArtifactKind::GlobalDecayKernel,
    ),
];

pub const OPTIMIZER_KERNEL: TemplateSpec = spec(
    "training/optimizer/embedding_optimizer_split_device_kernel_template.cuh",
    "gen_embedding_optimizer_{optimizer}_{desc}_device_kernel.cuh",
    ArtifactKind::OptimizerKernel,
);

pub const HOST_WRAPPER: TemplateSpec = spec(
    "training/backward/embedding_backward_split_host_template.cpp",
    "gen_embedding_backward_{desc}_{optimizer}.cpp",
    ArtifactKind::HostWrapper,
);

pub const COMPILED_AUTOGRAD: TemplateSpec = spec(
    "training/pt2/embedding_split_host_pt2_autograd_template.cpp",
    "gen_embedding_{desc}_{optimizer}_pt2_autograd.cpp",
    ArtifactKind::CompiledAutograd,
);

pub const COMPILED_WRAPPER: TemplateSpec = spec(
    "training/pt2/embedding_split_host_pt2_cuda_wrapper_template.cpp",
    "gen_embedding_backward_{desc}_{optimizer}_pt2_cuda_wrapper.cpp",
    ArtifactKind::CompiledWrapper,
);

pub const DISPATCH_MODULE: TemplateSpec = spec(
    "training/python/split_embedding_codegen_lookup_invoker.template",
    "lookup_{optimizer}{desc}.py",
    ArtifactKind::DispatchModule,
);

pub const CPU_KERNEL: TemplateSpec = spec(
    "training/backward/embedding_backward_split_cpu_template.cpp",
    "gen_embedding_backward_{optimizer}_split_cpu.cpp",
    ArtifactKind::CpuKernel,
);

pub const CPU_APPROX_KERNEL: TemplateSpec = spec(
    "training/backward/embedding_backward_split_cpu_approx_template.cpp",
    "gen_embedding_backward_{optimizer}_split_cpu.cpp",
    ArtifactKind::CpuKernel,
);

pub const CPU_HOST_WRAPPER: TemplateSpec = spec(
    "training/backward/embedding_backward_split_host_cpu_template.cpp",
    "gen_embedding_backward_split_{optimizer}_cpu.cpp",
    ArtifactKind::CpuHostWrapper,
);

pub const CPU_COMPILED_WRAPPER: TemplateSpec = spec(
    "training/pt2/embedding_split_host_pt2_cpu_wrapper_template.cpp",
    "gen_embedding_backward_split_{optimizer}_pt2_cpu_wrapper.cpp",
    ArtifactKind::CpuCompiledWrapper,
);

pub const DEVICE_KERNEL: TemplateSpec = spec(
    DEVICE_KERNEL_TEMPLATE,
    "gen_embedding_backward_{desc}_device_kernel.cuh",
    ArtifactKind::DeviceKernel,
);

pub const COMMON_DEVICE_KERNEL: TemplateSpec = spec(
    DEVICE_KERNEL_TEMPLATE,
    "gen_embedding_backward_split_common_device_kernel.cuh",
    ArtifactKind::DeviceKernel,
);

pub const GRAD_KERNEL: TemplateSpec = spec(
    "training/backward/embedding_backward_split_grad_template.cu",
    "gen_embedding_backward_split_grad_embedding_ops.cu",
    ArtifactKind::GradKernel,
);

pub const INDEX_WEIGHTS: TemplateSpec = spec(
    "training/backward/embedding_backward_split_indice_weights_template.cu",
    "gen_embedding_backward_{desc}_indice_weights_codegen_cuda.cu",
    ArtifactKind::IndexWeights,
);

pub const ALT_GPU_DEVICE_KERNEL: TemplateSpec = spec(
    "training/backward/rocm/embedding_backward_split_device_kernel_template.hip",
    "gen_embedding_backward_{desc}_device_kernel_hip.hip",
    ArtifactKind::AltGpuDeviceKernel,
);

pub const SCHEMA_HEADER: TemplateSpec = spec(
    "training/pt2/pt2_arg_utils_template.h",
    "pt2_arg_utils{desc}.h",
    ArtifactKind::SchemaHeader,
);

pub const MODULE_LISTING: TemplateSpec = spec(
    "training/python/__init__.template",
    "__init__.py",
    ArtifactKind::ModuleListing,
);

pub const ARG_LISTING: TemplateSpec = spec(
    "training/python/lookup_args.template",
    "lookup_args{desc}.py",
    ArtifactKind::ArgListing,
);

/// A planned output and the artifact kind it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedArtifact {
    pub kind: ArtifactKind,
    pub task: GenerationTask,
}

/// Everything a run will write, in emission order.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub artifacts: Vec<PlannedArtifact>,
    pub registry: RegistrySnapshot,
}

/// A rendered file held in memory until the run commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub relative_path: PathBuf,
    pub kind: ArtifactKind,
    pub contents: String,
}

/// Manifest of generated files.
#[derive(Debug, Clone)]
pub struct GeneratedFiles {
    /// Files that were generated.
    pub files: Vec<GeneratedFile>,
    pub registry: RegistrySnapshot,
}

/// A single generated file.
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    /// Path relative to the output directory.
    pub relative_path: PathBuf,
    /// Absolute path where the file was written.
    pub absolute_path: PathBuf,
    /// What kind of artifact this is.
    pub kind: ArtifactKind,
    /// Number of bytes written.
    pub bytes: usize,
}

/// Walks the catalogue and the backend-wide passes, collecting tasks.
///
/// Holds both schema forms by shared reference; each call site picks the
/// form it needs with [`AuxArgSchemas::for_storage`].
pub struct Orchestrator<'a> {
    schemas: &'a AuxArgSchemas,
    offloaded_tensors: &'a [String],
    registry: OutputRegistry,
    artifacts: Vec<PlannedArtifact>,
    outputs: HashSet<String>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(schemas: &'a AuxArgSchemas, offloaded_tensors: &'a [String]) -> Self {
        Self {
            schemas,
            offloaded_tensors,
            registry: OutputRegistry::new(),
            artifacts: Vec::new(),
            outputs: HashSet::new(),
        }
    }

    /// Plan every per-optimizer pass for `descriptor` and record it in
    /// the registry.
    ///
    /// # Errors
    ///
    /// Returns [`CodegenError::DuplicateOutput`] if an output filename was
    /// already planned in this run.
    pub fn optimizer(&mut self, descriptor: &OptimizerDescriptor) -> Result<(), CodegenError> {
        let before = self.artifacts.len();

        self.gpu_kernels(descriptor)?;
        self.optimizer_kernels(descriptor)?;
        if descriptor.is_dense {
            self.dense_host(descriptor)?;
        } else {
            self.host_and_dispatch(descriptor)?;
        }
        self.cpu(descriptor)?;
        let recorded = self.registry.record(descriptor);

        info!(
            optimizer = %descriptor.name,
            planned = self.artifacts.len() - before,
            recorded,
            "planned optimizer"
        );
        Ok(())
    }

    /// Plan the passes that run once per run, independent of optimizers.
    pub fn backend_passes(&mut self) -> Result<(), CodegenError> {
        let before = self.artifacts.len();

        // Alternate GPU backend: no variable batch, no offloaded storage.
        let alt = OptimizerDescriptor::device_catalogue(false, false);
        self.push_all(
            ALT_GPU_DEVICE_KERNEL.kind,
            plan(
                ALT_GPU_DEVICE_KERNEL.path,
                ALT_GPU_DEVICE_KERNEL.pattern,
                &alt,
                PassKind::Regular,
            ),
        )?;

        let shared = OptimizerDescriptor::device_catalogue(true, true);
        self.push_all(
            DEVICE_KERNEL.kind,
            plan(DEVICE_KERNEL.path, DEVICE_KERNEL.pattern, &shared, PassKind::Regular),
        )?;
        self.push(
            COMMON_DEVICE_KERNEL.kind,
            GenerationTask::single(
                COMMON_DEVICE_KERNEL.path,
                COMMON_DEVICE_KERNEL.pattern,
                Bindings::new()
                    .with("gen_once", true)
                    .with("descriptor", "common"),
            ),
        )?;

        self.push(
            GRAD_KERNEL.kind,
            GenerationTask::single(
                GRAD_KERNEL.path,
                GRAD_KERNEL.pattern,
                Bindings::new().with("index_select", false),
            ),
        )?;

        self.push_all(
            INDEX_WEIGHTS.kind,
            plan_index_weights(INDEX_WEIGHTS.path, INDEX_WEIGHTS.pattern),
        )?;

        for offloaded in [true, false] {
            let schema = self.schemas.for_storage(offloaded);
            self.push(
                SCHEMA_HEADER.kind,
                GenerationTask::single(
                    SCHEMA_HEADER.path,
                    output_filename(SCHEMA_HEADER.pattern, "", storage_suffix(offloaded)),
                    schema.bindings(),
                ),
            )?;
        }

        info!(planned = self.artifacts.len() - before, "planned backend-wide passes");
        Ok(())
    }

    /// Finalize the registry and plan the listings that depend on it.
    pub fn finish(mut self) -> Result<RunPlan, CodegenError> {
        let registry = std::mem::take(&mut self.registry).finalize();

        self.push(
            MODULE_LISTING.kind,
            GenerationTask::single(
                MODULE_LISTING.path,
                MODULE_LISTING.pattern,
                Bindings::new()
                    .with("all_optimizers", registry.all_optimizers.clone())
                    .with("offloaded_optimizers", registry.offloaded_optimizers.clone()),
            ),
        )?;

        for offloaded in [true, false] {
            let mut bindings = self.schemas.for_storage(offloaded).bindings();
            bindings.set("offloaded_storage", offloaded);
            self.push(
                ARG_LISTING.kind,
                GenerationTask::single(
                    ARG_LISTING.path,
                    output_filename(ARG_LISTING.pattern, "", storage_suffix(offloaded)),
                    bindings,
                ),
            )?;
        }

        Ok(RunPlan {
            artifacts: self.artifacts,
            registry,
        })
    }

    fn gpu_kernels(&mut self, d: &OptimizerDescriptor) -> Result<(), CodegenError> {
        for spec in &GPU_KERNELS {
            let tasks = plan(spec.path, spec.pattern, d, PassKind::Regular);
            self.push_optimizer_tasks(spec.kind, tasks)?;
        }

        if d.supports_global_decay {
            if d.supports_variable_batch {
                debug!(
                    optimizer = %d.name,
                    "global-decay pass keeps pooled variable-batch variants"
                );
            }
            for spec in &GLOBAL_DECAY_KERNELS {
                let tasks = plan(spec.path, spec.pattern, d, PassKind::GlobalDecay);
                self.push_optimizer_tasks(spec.kind, tasks)?;
            }
        }
        Ok(())
    }

    /// Per-row optimizer-state kernel, once per storage mode.
    fn optimizer_kernels(&mut self, d: &OptimizerDescriptor) -> Result<(), CodegenError> {
        for &offloaded in d.storage_modes() {
            let bindings = self.storage_bindings(d, Backend::Gpu, offloaded);
            self.push(
                OPTIMIZER_KERNEL.kind,
                GenerationTask::single(
                    OPTIMIZER_KERNEL.path,
                    output_filename(OPTIMIZER_KERNEL.pattern, &d.name, storage_descriptor(offloaded)),
                    bindings,
                ),
            )?;
        }
        Ok(())
    }

    fn host_and_dispatch(&mut self, d: &OptimizerDescriptor) -> Result<(), CodegenError> {
        for &offloaded in d.storage_modes() {
            let schema = self.schemas.for_storage(offloaded);
            let bindings = self.schema_bindings(d, Backend::Gpu, offloaded, schema);
            let desc = storage_descriptor(offloaded);

            for spec in [HOST_WRAPPER, COMPILED_AUTOGRAD, COMPILED_WRAPPER] {
                self.push(
                    spec.kind,
                    GenerationTask::single(
                        spec.path,
                        output_filename(spec.pattern, &d.name, desc),
                        bindings.clone(),
                    ),
                )?;
            }

            if d.supports_any_backend() {
                self.push(
                    DISPATCH_MODULE.kind,
                    GenerationTask::single(
                        DISPATCH_MODULE.path,
                        output_filename(DISPATCH_MODULE.pattern, &d.name, storage_suffix(offloaded)),
                        bindings,
                    ),
                )?;
            }
        }
        Ok(())
    }

    /// Dense keeps a single host wrapper and no schema-bound artifacts.
    fn dense_host(&mut self, d: &OptimizerDescriptor) -> Result<(), CodegenError> {
        let bindings = self.storage_bindings(d, Backend::Gpu, false);
        self.push(
            HOST_WRAPPER.kind,
            GenerationTask::single(
                HOST_WRAPPER.path,
                output_filename(HOST_WRAPPER.pattern, &d.name, storage_descriptor(false)),
                bindings,
            ),
        )
    }

    fn cpu(&mut self, d: &OptimizerDescriptor) -> Result<(), CodegenError> {
        if d.supports_cpu {
            let spec = if d.is_approximate {
                CPU_APPROX_KERNEL
            } else {
                CPU_KERNEL
            };
            self.push(
                spec.kind,
                GenerationTask::single(
                    spec.path,
                    output_filename(spec.pattern, &d.name, ""),
                    self.optimizer_bindings(d, Backend::Cpu),
                ),
            )?;
        }

        if !d.is_dense {
            // The CPU backend has no offloaded storage.
            let bindings = self.schema_bindings(d, Backend::Cpu, false, self.schemas.base());
            for spec in [CPU_HOST_WRAPPER, CPU_COMPILED_WRAPPER] {
                self.push(
                    spec.kind,
                    GenerationTask::single(
                        spec.path,
                        output_filename(spec.pattern, &d.name, ""),
                        bindings.clone(),
                    ),
                )?;
            }
        }
        Ok(())
    }

    fn optimizer_bindings(&self, d: &OptimizerDescriptor, backend: Backend) -> Bindings {
        d.bindings(backend)
            .with("offloaded_tensors", self.offloaded_tensors.to_vec())
    }

    fn storage_bindings(&self, d: &OptimizerDescriptor, backend: Backend, offloaded: bool) -> Bindings {
        self.optimizer_bindings(d, backend)
            .with("offloaded_storage", offloaded)
            .with("storage_descriptor", storage_descriptor(offloaded))
            .with("storage_suffix", storage_suffix(offloaded))
    }

    fn schema_bindings(
        &self,
        d: &OptimizerDescriptor,
        backend: Backend,
        offloaded: bool,
        schema: &AuxArgSchema,
    ) -> Bindings {
        let mut bindings = self.storage_bindings(d, backend, offloaded);
        bindings.extend(&schema.bindings());
        bindings
    }

    fn push_optimizer_tasks(
        &mut self,
        kind: ArtifactKind,
        tasks: Vec<GenerationTask>,
    ) -> Result<(), CodegenError> {
        let extra = Bindings::new().with("offloaded_tensors", self.offloaded_tensors.to_vec());
        for mut task in tasks {
            task.bindings.extend(&extra);
            self.push(kind, task)?;
        }
        Ok(())
    }

    fn push_all(&mut self, kind: ArtifactKind, tasks: Vec<GenerationTask>) -> Result<(), CodegenError> {
        for task in tasks {
            self.push(kind, task)?;
        }
        Ok(())
    }

    fn push(&mut self, kind: ArtifactKind, task: GenerationTask) -> Result<(), CodegenError> {
        if !self.outputs.insert(task.output.clone()) {
            return Err(CodegenError::DuplicateOutput(task.output));
        }
        self.artifacts.push(PlannedArtifact { kind, task });
        Ok(())
    }
}

impl RunPlan {
    /// Render every planned task in memory.
    ///
    /// Each template is loaded once.
    ///
    /// # Errors
    ///
    /// Returns the first template-resolution, malformed-template or
    /// undefined-binding error.
    pub fn render(&self, templates: &impl TemplateSource) -> Result<Vec<RenderedFile>, CodegenError> {
        let mut loaded: BTreeMap<&str, Template> = BTreeMap::new();
        let mut files = Vec::with_capacity(self.artifacts.len());

        for artifact in &self.artifacts {
            let path = artifact.task.template.as_str();
            if !loaded.contains_key(path) {
                loaded.insert(path, templates.load(path)?);
            }
            let template = &loaded[path];
            let contents = template.render(&artifact.task.bindings)?;
            debug!(output = %artifact.task.output, template = template.id(), "rendered");
            files.push(RenderedFile {
                relative_path: PathBuf::from(&artifact.task.output),
                kind: artifact.kind,
                contents,
            });
        }

        Ok(files)
    }

    pub fn count(&self, kind: ArtifactKind) -> usize {
        self.artifacts.iter().filter(|a| a.kind == kind).count()
    }
}

/// Build both schema forms, validate the catalogue, and plan the run.
///
/// Nothing is rendered or written.
///
/// # Errors
///
/// Returns a schema-consistency error, [`CodegenError::InvalidCatalogue`]
/// if validation reports errors, or [`CodegenError::DuplicateOutput`].
pub fn plan_run(catalogue: &Catalogue) -> Result<RunPlan, CodegenError> {
    let schemas = AuxArgSchemas::new(&catalogue.aux_args)?;

    let violations = validate_catalogue(catalogue);
    let mut errors = 0;
    for v in &violations {
        match v.severity {
            Severity::Error => {
                error!("{v}");
                errors += 1;
            }
            Severity::Warning => warn!("{v}"),
            Severity::Info => debug!("{v}"),
        }
    }
    if errors > 0 {
        return Err(CodegenError::InvalidCatalogue { errors });
    }

    let mut orchestrator = Orchestrator::new(&schemas, &catalogue.offloaded_tensors);
    for descriptor in &catalogue.optimizers {
        orchestrator.optimizer(descriptor)?;
    }
    orchestrator.backend_passes()?;
    orchestrator.finish()
}

/// Write rendered files under `output_dir`, creating it if needed.
///
/// Files are first written to a staging directory next to `output_dir` and
/// then renamed into place. If any write or rename fails, files already
/// moved are removed again, so `output_dir` never holds a partial set.
///
/// # Errors
///
/// Returns `CodegenError::Io` if staging, directory creation, a file write
/// or a rename fails.
pub fn write_rendered(
    files: &[RenderedFile],
    output_dir: &Path,
    registry: RegistrySnapshot,
) -> Result<GeneratedFiles, CodegenError> {
    let parent = match output_dir.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;
    let staging = tempfile::Builder::new()
        .prefix(".tbe-codegen-staging-")
        .tempdir_in(parent)?;

    for file in files {
        std::fs::write(staging.path().join(&file.relative_path), &file.contents)?;
    }
    debug!(staged = files.len(), staging = %staging.path().display(), "staged");

    let created = !output_dir.exists();
    std::fs::create_dir_all(output_dir)?;

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let absolute_path = output_dir.join(&file.relative_path);
        if let Err(e) = std::fs::rename(staging.path().join(&file.relative_path), &absolute_path) {
            warn!(
                output = %absolute_path.display(),
                moved = written.len(),
                "commit failed, removing moved files"
            );
            roll_back(&written, output_dir, created);
            return Err(e.into());
        }
        written.push(GeneratedFile {
            relative_path: file.relative_path.clone(),
            absolute_path,
            kind: file.kind,
            bytes: file.contents.len(),
        });
    }

    Ok(GeneratedFiles {
        files: written,
        registry,
    })
}

/// Best effort: the original error is what the caller reports.
fn roll_back(moved: &[GeneratedFile], output_dir: &Path, created: bool) {
    for file in moved {
        if let Err(e) = std::fs::remove_file(&file.absolute_path) {
            warn!(output = %file.absolute_path.display(), error = %e, "rollback failed");
        }
    }
    if created {
        let _ = std::fs::remove_dir(output_dir);
    }
}

/// Plan, render and write a full run.
///
/// Files are written only after every task rendered, and committed
/// through [`write_rendered`], so an error leaves no generated file in
/// `output_dir`.
///
/// # Errors
///
/// Any error from [`plan_run`], [`RunPlan::render`] or [`write_rendered`].
pub fn generate_all(
    catalogue: &Catalogue,
    templates: &impl TemplateSource,
    output_dir: &Path,
) -> Result<GeneratedFiles, CodegenError> {
    let run = plan_run(catalogue)?;
    let rendered = run.render(templates)?;
    let generated = write_rendered(&rendered, output_dir, run.registry)?;
    info!(
        files = generated.files.len(),
        output = %output_dir.display(),
        "generation complete"
    );
    Ok(generated)
}
