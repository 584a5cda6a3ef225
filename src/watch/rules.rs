//! Mapping from changed paths to watch actions.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::PipelineConfig;
use crate::core::Task;
use crate::utils::glob::{FileSet, relative_slash};

/// What a change triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Run(Task),
    /// Full browser reload without running a task.
    Reload,
}

/// Glob rules relative to the source and output roots.
#[derive(Debug)]
pub struct WatchRules {
    source: PathBuf,
    output: PathBuf,
    source_rules: Vec<(FileSet, Action)>,
    output_rules: Vec<(FileSet, Action)>,
}

impl WatchRules {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            source: config.source_dir().to_path_buf(),
            output: config.output_dir().to_path_buf(),
            source_rules: vec![
                (FileSet::new(&["**/*.pug"], &[])?, Action::Run(Task::Pages)),
                (
                    FileSet::new(&["**/*.sass", "**/*.scss"], &[])?,
                    Action::Run(Task::Styles),
                ),
                (
                    FileSet::new(&["scripts/*.js"], &["scripts/*.min.js"])?,
                    Action::Run(Task::Scripts),
                ),
            ],
            output_rules: vec![(FileSet::new(&["*.html"], &[])?, Action::Reload)],
        })
    }

    /// Action for one changed path, if any rule matches.
    pub fn classify(&self, path: &Path) -> Option<Action> {
        // Output first: it may live inside the source tree.
        if let Some(rel) = relative_slash(path, &self.output) {
            return first_match(&self.output_rules, &rel);
        }
        let rel = relative_slash(path, &self.source)?;
        first_match(&self.source_rules, &rel)
    }

    /// Actions for a batch of changes, de-duplicated in first-seen order.
    pub fn actions<'a>(&self, paths: impl IntoIterator<Item = &'a Path>) -> Vec<Action> {
        let mut actions = Vec::new();
        for action in paths.into_iter().filter_map(|path| self.classify(path)) {
            if !actions.contains(&action) {
                actions.push(action);
            }
        }
        actions
    }
}

fn first_match(rules: &[(FileSet, Action)], rel: &str) -> Option<Action> {
    rules
        .iter()
        .find(|(set, _)| set.matches(rel))
        .map(|(_, action)| *action)
}
