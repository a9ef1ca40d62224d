//! Typed HTTP clients for the three stateless collaborators the gateway
//! fronts — classifier, selector, generator — each wrapped in the same
//! retry/circuit-breaker/metrics envelope (§4.4, the "collaborator
//! envelope" from the glossary).

mod client;
mod envelope;

pub mod classifier;
pub mod generator;
pub mod selector;

pub use classifier::{ClassifierClient, ClassifierLike, ClassifyRequest, ClassifyResponse};
pub use client::CollaboratorError;
pub use envelope::{CircuitBreakerConfig, RetryableError};
pub use generator::{GenerateRequest, GenerateResponse, GeneratorClient, GeneratorLike};
pub use selector::{SelectRequest, SelectResponse, SelectorClient, SelectorLike};
