pub use coverage::*;
pub use detector::*;
pub use error::*;
pub use generator::*;
pub use machine::*;
pub use money::*;
pub use orchestrator::*;
pub use surface::*;
pub use symbol::*;
pub use timeline::*;
pub use types::*;

mod coverage;
mod detector;
mod error;
mod generator;
mod machine;
mod money;
mod orchestrator;
mod surface;
mod symbol;
mod timeline;
mod types;
