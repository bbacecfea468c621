pub mod generate;
pub mod plan;
pub mod schema;
pub mod validate;
