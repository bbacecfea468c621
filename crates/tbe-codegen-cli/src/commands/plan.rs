use std::path::Path;

use tbe_codegen::catalogue::parse_catalogue;
use tbe_codegen::generate::plan_run;
use tracing::debug;

pub fn run(catalogue: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let c = parse_catalogue(catalogue)?;
    let plan = plan_run(&c)?;
    debug!(planned = plan.artifacts.len(), format, "plan ready");

    match format {
        "json" => {
            let artifacts: Vec<_> = plan
                .artifacts
                .iter()
                .map(|a| {
                    serde_json::json!({
                        "output": a.task.output,
                        "template": a.task.template,
                        "kind": a.kind.to_string(),
                    })
                })
                .collect();
            let report = serde_json::json!({
                "artifacts": artifacts,
                "all_optimizers": plan.registry.all_optimizers,
                "offloaded_optimizers": plan.registry.offloaded_optimizers,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "text" => {
            for a in &plan.artifacts {
                println!("{:<22} {}  <- {}", a.kind.to_string(), a.task.output, a.task.template);
            }
            println!("\n{} planned file(s)", plan.artifacts.len());
        }
        other => return Err(format!("unknown format '{other}' (expected text or json)").into()),
    }

    Ok(())
}
