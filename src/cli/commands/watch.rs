//! Watch Command
//!
//! Keep an exported workspace synced until Ctrl-C.

use std::path::Path;
use std::time::Duration;

use tokio::runtime::Runtime;
use tracing::info;

use super::sync::report;
use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, manifest_path};
use crate::types::Result;
use crate::wiki::WorkspaceWatcher;

pub fn run(ctx: &CommandContext, target: &Path, debounce_ms: Option<u64>) -> Result<()> {
    let debounce = debounce_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| ctx.config.debounce());
    let manifest = manifest_path(target);

    let handle = WorkspaceWatcher::new(manifest.clone())
        .with_debounce(debounce)
        .with_retry(ctx.config.retry_policy())
        .spawn(|summary| {
            if summary.updated > 0 {
                report(summary);
            }
        })?;

    Output::new().info(&format!(
        "Watching {} (debounce {:?}); press Ctrl-C to stop",
        manifest.display(),
        debounce
    ));

    let rt = Runtime::new()?;
    rt.block_on(async {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut ticker = tokio::time::interval(Duration::from_millis(200));
        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Interrupted; stopping watcher");
                    break;
                }
                _ = ticker.tick() => {
                    if !handle.is_running() {
                        break;
                    }
                }
            }
        }
    });

    // Joins the thread; a sync already running finishes first
    handle.stop()
}
