mod parser;
mod types;
mod validator;

pub use parser::{parse_catalogue, parse_catalogue_str};
pub use types::*;
pub use validator::validate_catalogue;
