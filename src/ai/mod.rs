//! Completion and Retrieval Layer
//!
//! Both services are external. This layer defines the traits the crate
//! consumes, the client holder, and the page regenerator built on them.

pub mod backend;
pub mod prompt;
pub mod regenerator;
pub mod retrieval;
pub mod stream;
pub mod timeout;

pub use backend::{BackendSlot, ChunkStream, CompletionBackend, CompletionRequest, SharedBackend};
pub use prompt::PromptBuilder;
pub use regenerator::{PageRegenerator, RegenerationOutcome, RegeneratorOptions};
pub use retrieval::{Document, DocumentIndex, DocumentIndexer, KeywordIndexer, RetrievedDocument};
pub use stream::{CancelFlag, collect_stream};
pub use timeout::with_timeout;
