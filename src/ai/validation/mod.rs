//! Model output validation

mod json_repair;

pub use json_repair::{parse_string_array, strip_code_fences};
