//! Parameter document loading and validation.

pub mod parser;
pub mod validator;

pub use parser::{parse_parameters, parse_parameters_str, substitute_env_vars};
pub use validator::{validate_core, validate_document};
