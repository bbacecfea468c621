use std::path::Path;

use tbe_codegen::aux_args::{AuxArgSchema, AuxArgSchemas};
use tbe_codegen::catalogue::parse_catalogue;

fn print_form(schema: &AuxArgSchema) {
    let title = if schema.is_offloaded() {
        "Offloaded-storage form"
    } else {
        "Base form"
    };
    println!("{title}");
    println!("{}", "=".repeat(title.len()));
    let sizes: Vec<String> = schema
        .bucket_kinds()
        .map(|kind| format!("{kind}: {}", schema.bucket(kind).len()))
        .collect();
    println!("{}", sizes.join(", "));
    print!("{}", schema.positional_catalogue());
    println!();
}

pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let catalogue = parse_catalogue(path)?;
    let schemas = AuxArgSchemas::new(&catalogue.aux_args)?;

    print_form(schemas.base());
    print_form(schemas.offloaded());

    Ok(())
}
