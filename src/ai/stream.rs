//! Stream accumulation with cooperative cancellation

use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::backend::ChunkStream;
use crate::types::{Result, WikiError};

/// Shared cancel signal, checked between chunks
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pull every chunk and join them.
///
/// On cancellation or a failed chunk the partial text is dropped and an
/// error returned; callers only ever see complete output.
pub async fn collect_stream(mut stream: ChunkStream, cancel: &CancelFlag, label: &str) -> Result<String> {
    let mut text = String::new();
    loop {
        if cancel.is_cancelled() {
            return Err(WikiError::Cancelled(format!(
                "{} after {} bytes",
                label,
                text.len()
            )));
        }
        match stream.next().await {
            Some(Ok(chunk)) => text.push_str(&chunk),
            Some(Err(e)) => return Err(e),
            None => return Ok(text),
        }
    }
}
