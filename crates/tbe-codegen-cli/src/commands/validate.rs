use std::path::Path;

use tbe_codegen::aux_args::AuxArgSchemas;
use tbe_codegen::catalogue::{parse_catalogue, validate_catalogue};
use tbe_codegen::error::Severity;

pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let catalogue = parse_catalogue(path)?;
    let violations = validate_catalogue(&catalogue);

    let errors = violations
        .iter()
        .filter(|v| v.severity == Severity::Error)
        .count();
    let warnings = violations
        .iter()
        .filter(|v| v.severity == Severity::Warning)
        .count();

    for v in &violations {
        println!("{v}");
    }

    println!("\n{errors} error(s), {warnings} warning(s)");

    if errors > 0 {
        return Err(format!("Catalogue has {errors} validation error(s)").into());
    }

    // Schema consistency is checked the same way a run checks it.
    AuxArgSchemas::new(&catalogue.aux_args)?;
    println!(
        "Catalogue is valid ({} optimizers).",
        catalogue.optimizers.len()
    );
    Ok(())
}
