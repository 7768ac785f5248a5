pub mod agents;
pub mod error;
pub mod executor;
pub mod memory;
pub mod model;
pub mod pipeline;
pub mod protocol;
pub mod reflect;
pub mod tracer;

// Re-export key types
pub use agents::AgentRegistry;
pub use error::Error;
pub use executor::Executor;
pub use model::{ChatMessage, GenerationParams, ModelClient, ModelReply, Usage};
pub use pipeline::Pipelines;
pub use protocol::{Exchange, Message, Role};
pub use reflect::Reflector;
pub use tracer::Tracer;
