pub mod common;
pub mod loose;
