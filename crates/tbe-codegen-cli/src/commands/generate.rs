use std::path::Path;

use tbe_codegen::catalogue::parse_catalogue;
use tbe_codegen::generate::generate_all;
use tbe_codegen::template::FsTemplates;
use tracing::info;

pub fn run(
    catalogue: &Path,
    templates: &Path,
    output_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = FsTemplates::new(templates);
    info!(catalogue = %catalogue.display(), templates = %source.root().display(), "loading catalogue");
    let c = parse_catalogue(catalogue)?;
    let result = generate_all(&c, &source, output_dir)?;

    println!(
        "Generated {} files in {}:",
        result.files.len(),
        output_dir.display()
    );
    for f in &result.files {
        println!(
            "  {} ({}, {} bytes)",
            f.relative_path.display(),
            f.kind,
            f.bytes
        );
    }
    println!(
        "\n{} optimizer(s), {} with offloaded storage",
        result.registry.all_optimizers.len(),
        result.registry.offloaded_optimizers.len()
    );

    Ok(())
}
