pub mod caller;
pub mod json;
