//! Completion Backend Abstraction
//!
//! The text-completion service is an external collaborator. This module
//! only defines how the crate talks to it and how the process holds on to
//! a client.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::types::Result;

/// Chunks of a streamed completion, pulled by the consumer
pub type ChunkStream = BoxStream<'static, Result<String>>;

/// One completion call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub model: String,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
        }
    }
}

/// Given a prompt and model id, produce text
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Whole completion in one piece
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Completion as a pull-based chunk stream.
    ///
    /// Backends without native streaming yield the full completion as a
    /// single chunk.
    async fn stream(&self, request: &CompletionRequest) -> Result<ChunkStream> {
        let text = self.complete(request).await?;
        Ok(stream::once(async move { Ok(text) }).boxed())
    }

    /// Backend name for logging
    fn name(&self) -> &str;
}

pub type SharedBackend = Arc<dyn CompletionBackend>;

/// Lazily created backend owned by the composition root.
///
/// `get_or_init` runs the factory at most once; concurrent callers wait for
/// the first one and all receive the same client. A failed factory leaves
/// the slot empty so a later call can try again.
#[derive(Default)]
pub struct BackendSlot {
    cell: OnceCell<SharedBackend>,
}

impl BackendSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_init<F, Fut>(&self, factory: F) -> Result<SharedBackend>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SharedBackend>>,
    {
        let backend = self.cell.get_or_try_init(factory).await?;
        debug!("Using completion backend '{}'", backend.name());
        Ok(Arc::clone(backend))
    }

    pub fn get(&self) -> Option<SharedBackend> {
        self.cell.get().cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

impl std::fmt::Debug for BackendSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSlot")
            .field("backend", &self.cell.get().map(|b| b.name().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WikiError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo;

    #[async_trait]
    impl CompletionBackend for Echo {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            Ok(format!("{}:{}", request.model, request.prompt))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_default_stream_is_single_chunk() {
        let chunks: Vec<String> = Echo
            .stream(&CompletionRequest::new("hi", "m"))
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["m:hi".to_string()]);
    }

    #[tokio::test]
    async fn test_slot_initializes_once() {
        let slot = BackendSlot::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            slot.get_or_init(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(Echo) as SharedBackend)
            })
            .await
            .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(slot.is_initialized());
    }

    #[tokio::test]
    async fn test_slot_retries_after_failed_factory() {
        let slot = BackendSlot::new();
        let err = slot
            .get_or_init(|| async { Err(WikiError::Completion("no credentials".into())) })
            .await;
        assert!(err.is_err());
        assert!(slot.get().is_none());

        let backend = slot
            .get_or_init(|| async { Ok(Arc::new(Echo) as SharedBackend) })
            .await
            .unwrap();
        assert_eq!(backend.name(), "echo");
    }
}
