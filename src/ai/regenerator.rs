//! Page Regenerator
//!
//! Rewrites the pages a [`RegenerationPlan`] selects by streaming one
//! completion per page. A page is returned only once its stream finished;
//! cancelled or failed streams leave no trace in the result.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::backend::{CompletionRequest, SharedBackend};
use super::prompt::PromptBuilder;
use super::retrieval::DocumentIndex;
use super::stream::{CancelFlag, collect_stream};
use super::timeout::with_timeout;
use crate::constants::cache::DEFAULT_LANGUAGE;
use crate::constants::regen::{DEFAULT_TOP_K, MAX_DOCUMENT_CHARS, PAGE_TIMEOUT_SECS};
use crate::snapshot::RepoSnapshot;
use crate::types::{Result, WikiError, redact_secrets};
use crate::wiki::{RegenerationPlan, WikiCacheData, WikiPage};

#[derive(Debug, Clone)]
pub struct RegeneratorOptions {
    pub model: String,
    pub language: String,
    pub top_k: usize,
    pub page_timeout: Duration,
}

impl Default for RegeneratorOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            top_k: DEFAULT_TOP_K,
            page_timeout: Duration::from_secs(PAGE_TIMEOUT_SECS),
        }
    }
}

/// Pages produced by one run
#[derive(Debug, Default)]
pub struct RegenerationOutcome {
    /// Fully generated pages
    pub pages: Vec<WikiPage>,
    /// `(page id, redacted error)` for pages that failed
    pub failed: Vec<(String, String)>,
    pub cancelled: bool,
}

impl RegenerationOutcome {
    /// Every requested page was produced
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failed.is_empty()
    }
}

pub struct PageRegenerator {
    backend: SharedBackend,
    index: Option<Arc<dyn DocumentIndex>>,
    options: RegeneratorOptions,
    cancel: CancelFlag,
}

impl PageRegenerator {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            index: None,
            options: RegeneratorOptions::default(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_index(mut self, index: Arc<dyn DocumentIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_options(mut self, options: RegeneratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Handle for stopping the run from elsewhere
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    async fn build_prompt(&self, data: &WikiCacheData, page: &WikiPage) -> Result<String> {
        let mut files = page
            .file_paths
            .iter()
            .map(|p| format!("- {}", p))
            .collect::<Vec<_>>()
            .join("\n");
        if files.is_empty() {
            files = "(none declared)".to_string();
        }

        let related = data
            .structure
            .index()
            .related(&page.id)
            .iter()
            .map(|p| format!("- {} ({})", p.title, p.id))
            .collect::<Vec<_>>()
            .join("\n");

        let mut builder = PromptBuilder::new()
            .role(
                "technical writer documenting a code repository",
                &format!(
                    "write the wiki page \"{}\" of \"{}\" in markdown",
                    page.title, data.structure.title
                ),
            )
            .section("Source files", &files);
        if !related.is_empty() {
            builder = builder.section("Related pages", &related);
        }

        if let Some(index) = &self.index {
            let query = format!("{} {}", page.title, page.file_paths.join(" "));
            for hit in index.query(&query, self.options.top_k).await? {
                let excerpt: String = hit.document.content.chars().take(MAX_DOCUMENT_CHARS).collect();
                builder = builder.code(&hit.document.path, &excerpt);
            }
        }

        Ok(builder
            .text(&format!(
                "Write only the page body. Language: {}. Describe only what the sources show.",
                self.options.language
            ))
            .build())
    }

    /// Generate one page. Nothing is returned unless the stream completed.
    pub async fn regenerate_page(&self, data: &WikiCacheData, page: &WikiPage) -> Result<WikiPage> {
        let prompt = self.build_prompt(data, page).await?;
        let request = CompletionRequest::new(prompt, self.options.model.clone());
        let label = format!("page '{}'", page.id);

        let text = with_timeout(
            self.options.page_timeout,
            async {
                let stream = self.backend.stream(&request).await?;
                collect_stream(stream, &self.cancel, &label).await
            },
            &label,
        )
        .await?;

        let content = text.trim();
        if content.is_empty() {
            return Err(WikiError::Completion(format!("{} came back empty", label)));
        }

        let mut generated = page.clone();
        generated.content = format!("{}\n", content);
        Ok(generated)
    }

    /// Generate `page_ids` one after another.
    ///
    /// A failing page is recorded and skipped; cancellation stops the run.
    pub async fn regenerate(
        &self,
        data: &WikiCacheData,
        page_ids: &BTreeSet<String>,
    ) -> RegenerationOutcome {
        let mut outcome = RegenerationOutcome::default();

        for id in page_ids {
            if self.cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }
            let Some(page) = data.structure.page(id) else {
                warn!("Page '{}' is not in the structure; skipping", id);
                continue;
            };

            match self.regenerate_page(data, page).await {
                Ok(page) => {
                    debug!("Regenerated '{}' ({} bytes)", page.id, page.content.len());
                    outcome.pages.push(page);
                }
                Err(WikiError::Cancelled(reason)) => {
                    info!("Regeneration cancelled: {}", reason);
                    outcome.cancelled = true;
                    break;
                }
                Err(e) => {
                    let message = redact_secrets(&e.to_string());
                    warn!("Page '{}' failed via {}: {}", id, self.backend.name(), message);
                    outcome.failed.push((id.clone(), message));
                }
            }
        }

        info!(
            "Regenerated {}/{} pages{}",
            outcome.pages.len(),
            page_ids.len(),
            if outcome.cancelled { " (cancelled)" } else { "" }
        );
        outcome
    }

    /// Run `plan` against `data` and merge the results.
    ///
    /// The new snapshot is recorded only when every planned page was
    /// produced (trivially so for an incremental plan with no affected
    /// pages); otherwise the pages that did finish are stored and the old
    /// baseline stays, so the next plan picks the rest up again.
    pub async fn apply_plan(
        &self,
        data: &mut WikiCacheData,
        plan: &RegenerationPlan,
        snapshot: RepoSnapshot,
    ) -> RegenerationOutcome {
        let targets = plan.pages_to_regenerate(&data.structure);
        if targets.is_empty() {
            // Changes that touch no page still move the baseline forward
            if matches!(plan, RegenerationPlan::Incremental { .. }) {
                debug!("No page depends on the changed files; recording snapshot");
                data.apply_regenerated(std::iter::empty(), snapshot);
            }
            return RegenerationOutcome::default();
        }

        let outcome = self.regenerate(data, &targets).await;
        if outcome.is_complete() {
            data.apply_regenerated(outcome.pages.iter().cloned(), snapshot);
        } else {
            for page in &outcome.pages {
                data.upsert_page(page.clone());
            }
        }
        outcome
    }
}
