pub mod decoder;
pub mod types;
