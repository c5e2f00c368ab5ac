pub mod plan;
pub mod scenario;
pub mod types;

pub use plan::*;
pub use scenario::*;
pub use types::*;
