pub mod enricher;
pub mod types;
