pub mod complexity;
pub mod engine;
pub mod techniques;

pub use engine::{enhance, rerun, EnhanceMetadata, EnhanceOutcome, EnhanceRequest, EnhanceResult};
