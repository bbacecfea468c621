//! Planning scenarios and invariants that hold for every catalogue.

use proptest::prelude::*;

use tbe_codegen::aux_args::{AuxArgSchemas, BucketKind};
use tbe_codegen::catalogue::{Catalogue, OptimizerDescriptor, parse_catalogue_str};
use tbe_codegen::generate::{ArtifactKind, PlannedArtifact, plan_run};
use tbe_codegen::options::{OptionSpace, PassKind, is_valid};
use tbe_codegen::planner::plan;
use tbe_codegen::template::Value;

const AUX_ARGS: &str = r#"
version: "1.0.0"
aux_args:
  bucket_order: [aux_tensor, aux_int, aux_float, aux_bool]
  buckets:
    - name: aux_tensor
      args: [B_offsets, lxu_cache_locations]
    - name: aux_int
      args: [iter]
    - name: aux_float
      args: [gwd_lower_bound]
    - name: aux_bool
      args: [is_experimental_tbe, mixed_D]
  offloaded_bool_extras: [enable_optimizer_offloading]
offloaded_tensors: [row_addrs]
"#;

fn catalogue(optimizers: &str) -> Catalogue {
    parse_catalogue_str(&format!("{AUX_ARGS}optimizers:\n{optimizers}")).unwrap()
}

fn for_optimizer<'p>(artifacts: &'p [PlannedArtifact], name: &str) -> Vec<&'p PlannedArtifact> {
    artifacts
        .iter()
        .filter(|a| a.task.bindings.get("optimizer") == Some(&Value::Str(name.to_string())))
        .collect()
}

fn kinds(artifacts: &[&PlannedArtifact], kind: ArtifactKind) -> Vec<String> {
    artifacts
        .iter()
        .filter(|a| a.kind == kind)
        .map(|a| a.task.output.clone())
        .collect()
}

#[test]
fn gpu_only_optimizer_without_vbe_or_ssd() {
    let c = catalogue(
        "  - name: sgd\n    supports_gpu: true\n    arguments:\n      gpu: [learning_rate]\n",
    );
    let plan = plan_run(&c).unwrap();
    let sgd = for_optimizer(&plan.artifacts, "sgd");

    let kernels = kinds(&sgd, ArtifactKind::GpuKernel);
    assert_eq!(kernels.len(), 12);
    for suffix in ["_cuda.cu", "_meta.cpp", "_kernel_cta.cu", "_kernel_warp.cu"] {
        assert_eq!(kernels.iter().filter(|o| o.ends_with(suffix)).count(), 3);
    }

    assert_eq!(
        kinds(&sgd, ArtifactKind::HostWrapper),
        vec!["gen_embedding_backward_split_sgd.cpp"]
    );
    assert_eq!(
        kinds(&sgd, ArtifactKind::CompiledAutograd),
        vec!["gen_embedding_split_sgd_pt2_autograd.cpp"]
    );
    assert_eq!(
        kinds(&sgd, ArtifactKind::CompiledWrapper),
        vec!["gen_embedding_backward_split_sgd_pt2_cuda_wrapper.cpp"]
    );
    assert_eq!(kinds(&sgd, ArtifactKind::DispatchModule), vec!["lookup_sgd.py"]);
}

#[test]
fn dense_optimizer_has_no_schema_bound_artifacts() {
    let c = catalogue(
        "  - name: dense\n    supports_gpu: true\n    is_dense: true\n    arguments:\n      gpu: [unused]\n",
    );
    let plan = plan_run(&c).unwrap();
    let dense = for_optimizer(&plan.artifacts, "dense");

    assert_eq!(kinds(&dense, ArtifactKind::HostWrapper).len(), 1);
    for kind in [
        ArtifactKind::DispatchModule,
        ArtifactKind::CompiledAutograd,
        ArtifactKind::CompiledWrapper,
        ArtifactKind::CpuHostWrapper,
        ArtifactKind::CpuCompiledWrapper,
    ] {
        assert!(kinds(&dense, kind).is_empty(), "{kind} planned for dense");
    }
    assert!(dense.iter().all(|a| a.task.bindings.get("aux_bool").is_none()));
    assert!(plan.registry.all_optimizers.is_empty());
}

#[test]
fn index_weight_pass_yields_three_descriptors() {
    let c = catalogue("  - name: sgd\n    supports_gpu: true\n    arguments:\n      gpu: [lr]\n");
    let plan = plan_run(&c).unwrap();
    let outputs: Vec<&str> = plan
        .artifacts
        .iter()
        .filter(|a| a.kind == ArtifactKind::IndexWeights)
        .map(|a| a.task.output.as_str())
        .collect();
    assert_eq!(
        outputs,
        vec![
            "gen_embedding_backward_dense_indice_weights_codegen_cuda.cu",
            "gen_embedding_backward_ssd_indice_weights_codegen_cuda.cu",
            "gen_embedding_backward_split_indice_weights_codegen_cuda.cu",
        ]
    );
}

#[test]
fn every_schema_bound_task_matches_its_storage() {
    let c = catalogue(
        "  - name: adam\n    supports_gpu: true\n    supports_cpu: true\n    supports_offloaded_storage: true\n    arguments:\n      gpu: [m]\n      cpu: [m]\n",
    );
    let schemas = AuxArgSchemas::new(&c.aux_args).unwrap();
    let plan = plan_run(&c).unwrap();

    for a in &plan.artifacts {
        let Some(Value::List(aux_bool)) = a.task.bindings.get("aux_bool") else {
            continue;
        };
        let offloaded = a.task.bindings.get("aux_suffix") == Some(&Value::Str("_ssd".to_string()));
        let expected = schemas.for_storage(offloaded).bucket(BucketKind::Bool);
        assert_eq!(aux_bool.as_slice(), expected, "{}", a.task.output);
        if let Some(Value::Bool(storage)) = a.task.bindings.get("offloaded_storage") {
            assert_eq!(*storage, offloaded, "{}", a.task.output);
        }
    }
}

#[test]
fn cpu_artifacts_use_base_schema() {
    let c = catalogue(
        "  - name: adam\n    supports_gpu: true\n    supports_cpu: true\n    supports_offloaded_storage: true\n    arguments:\n      gpu: [m]\n      cpu: [m]\n",
    );
    let plan = plan_run(&c).unwrap();
    for a in plan.artifacts.iter().filter(|a| {
        matches!(
            a.kind,
            ArtifactKind::CpuHostWrapper | ArtifactKind::CpuCompiledWrapper
        )
    }) {
        assert_eq!(a.task.bindings.get("aux_suffix"), Some(&Value::Str(String::new())));
    }
}

#[test]
fn offloaded_tensors_reach_per_optimizer_tasks() {
    let c = catalogue(
        "  - name: sgd\n    supports_gpu: true\n    supports_offloaded_storage: true\n    arguments:\n      gpu: [lr]\n",
    );
    let plan = plan_run(&c).unwrap();
    let sgd = for_optimizer(&plan.artifacts, "sgd");
    assert!(!sgd.is_empty());
    for a in sgd {
        assert_eq!(
            a.task.bindings.get("offloaded_tensors"),
            Some(&Value::List(vec!["row_addrs".to_string()]))
        );
    }
}

fn descriptor(
    gpu: bool,
    vbe: bool,
    ssd: bool,
    gwd: bool,
    dense: bool,
) -> OptimizerDescriptor {
    let mut d = OptimizerDescriptor::device_catalogue(vbe, ssd);
    d.name = "opt".to_string();
    d.supports_gpu = gpu;
    d.supports_global_decay = gwd;
    d.is_dense = dense;
    d
}

proptest! {
    #[test]
    fn planned_variants_are_always_valid(
        gpu in any::<bool>(),
        vbe in any::<bool>(),
        ssd in any::<bool>(),
        gwd in any::<bool>(),
        dense in any::<bool>(),
    ) {
        let d = descriptor(gpu, vbe, ssd, gwd, dense);
        for pass in [PassKind::Regular, PassKind::GlobalDecay] {
            let tasks = plan("t", "{optimizer}_{desc}", &d, pass);
            let space = OptionSpace::new(&d, pass);
            prop_assert!(tasks.len() <= space.cardinality());
            if !gpu {
                prop_assert!(tasks.is_empty());
            }
            let mut seen = std::collections::HashSet::new();
            for t in &tasks {
                let flags = t.flags.unwrap();
                prop_assert!(is_valid(&flags, dense));
                prop_assert_eq!(flags.global_decay, pass.is_global_decay());
                prop_assert!(vbe || !flags.variable_batch);
                prop_assert!(ssd || !flags.offloaded_storage);
                prop_assert!(seen.insert(t.output.clone()));
            }
        }
    }

    #[test]
    fn planning_is_deterministic(
        vbe in any::<bool>(),
        ssd in any::<bool>(),
        dense in any::<bool>(),
    ) {
        let d = descriptor(true, vbe, ssd, false, dense);
        let a = plan("t", "{optimizer}_{desc}", &d, PassKind::Regular);
        let b = plan("t", "{optimizer}_{desc}", &d, PassKind::Regular);
        prop_assert_eq!(a, b);
    }
}
