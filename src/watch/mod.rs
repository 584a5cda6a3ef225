//! Watch loop.
//!
//! ```text
//! notify --[Event]--> filter --> batch --> WatchRules --> spawn_blocking(run_task)
//!                                                    \--> ReloadHub::reload
//! ```
//!
//! Each wake-up drains every queued event into one batch, so a burst of
//! saves triggers each task once. Runs are never cancelled; when two runs
//! of the same task overlap the last write wins.

mod rules;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

use crate::core::Task;
use crate::task::{TaskContext, run_task};
use crate::{debug, log, logger};

use rules::{Action, WatchRules};

/// Start watching the source and output trees on a background thread.
pub fn spawn(ctx: TaskContext) -> Result<()> {
    let rules = WatchRules::new(&ctx.config)?;

    let (tx, rx) = unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let _ = tx.send(event);
        }
        Err(e) => log!("watch"; "notify error: {}", e),
    })?;

    for dir in [ctx.config.source_dir(), ctx.config.output_dir()] {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        watcher
            .watch(dir, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
    }

    std::thread::Builder::new()
        .name("watch".into())
        .spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build();
            match runtime {
                Ok(runtime) => runtime.block_on(watch_loop(watcher, rx, rules, ctx)),
                Err(e) => log!("watch"; "failed to start runtime: {}", e),
            }
        })
        .context("Failed to spawn watch thread")?;
    Ok(())
}

async fn watch_loop(
    _watcher: RecommendedWatcher,
    mut rx: UnboundedReceiver<Event>,
    rules: WatchRules,
    ctx: TaskContext,
) {
    let styles_delay = ctx.config.watch.styles_delay();

    while let Some(first) = rx.recv().await {
        let mut batch = FxHashSet::default();
        batch.extend(changed_paths(&first));
        while let Ok(event) = rx.try_recv() {
            batch.extend(changed_paths(&event));
        }

        for action in rules.actions(batch.iter().map(PathBuf::as_path)) {
            match action {
                Action::Reload => {
                    debug!("watch"; "output html changed");
                    if let Some(hub) = ctx.hub() {
                        hub.reload();
                    }
                }
                Action::Run(task) => {
                    let delay = if task == Task::Styles {
                        styles_delay
                    } else {
                        Duration::ZERO
                    };
                    tokio::spawn(run_in_background(task, delay, ctx.clone()));
                }
            }
        }
    }
}

async fn run_in_background(task: Task, delay: Duration, ctx: TaskContext) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    match tokio::task::spawn_blocking(move || run_task(task, &ctx)).await {
        Ok(Ok(report)) if report.notices.is_empty() => {
            logger::status_success(&format!("{task}: {}", report.summary()));
        }
        // Notices were already shown by the task run.
        Ok(Ok(_)) => {}
        Ok(Err(err)) => {
            logger::status_error(task.name(), &err.to_string());
            logger::status_detach();
        }
        Err(err) => log!("watch"; "{} run aborted: {}", task, err),
    }
}

/// Paths of a content change, skipping metadata-only events and editor
/// temp files.
fn changed_paths(event: &Event) -> impl Iterator<Item = PathBuf> + '_ {
    let relevant = match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(modify) => !matches!(modify, notify::event::ModifyKind::Metadata(_)),
        _ => false,
    };
    event
        .paths
        .iter()
        .filter(move |path| relevant && !is_temp_file(path))
        .cloned()
}

fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "swx" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
        || name.starts_with('#')
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, ModifyKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_content_changes_kept() {
        let modify = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            "/site/app/pages/a.pug",
        );
        assert_eq!(changed_paths(&modify).count(), 1);

        let create = event(EventKind::Create(CreateKind::File), "/site/app/pages/b.pug");
        assert_eq!(changed_paths(&create).count(), 1);
    }

    #[test]
    fn test_metadata_changes_ignored() {
        let chmod = event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            "/site/app/pages/a.pug",
        );
        assert_eq!(changed_paths(&chmod).count(), 0);
        assert_eq!(changed_paths(&event(EventKind::Any, "/site/a.pug")).count(), 0);
    }

    #[test]
    fn test_temp_files_ignored() {
        assert!(is_temp_file(Path::new("app/pages/.index.pug.swp")));
        assert!(is_temp_file(Path::new("app/pages/index.pug~")));
        assert!(is_temp_file(Path::new("app/sass/#main.sass#")));
        assert!(is_temp_file(Path::new("app/sass/main.sass.tmp")));
        assert!(!is_temp_file(Path::new("app/sass/main.sass")));
    }
}
