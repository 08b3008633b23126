pub mod timestamp;
pub mod types;

pub use types::*;
