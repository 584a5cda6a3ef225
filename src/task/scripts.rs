//! `scripts`: minify each top-level script.

use std::fs;
use std::sync::LazyLock;

use super::{TaskError, TaskReport, io_error};
use crate::asset::script::minify_script;
use crate::config::PipelineConfig;
use crate::core::Task;
use crate::debug;
use crate::utils::fs::{min_output, write_file};
use crate::utils::glob::FileSet;

const SCRIPTS_DIR: &str = "scripts";

static SCRIPTS: LazyLock<FileSet> =
    LazyLock::new(|| FileSet::new(&["*.js"], &["*.min.js"]).expect("valid scripts glob"));

/// Stops at the first script that fails to parse.
pub(super) fn run(config: &PipelineConfig) -> Result<TaskReport, TaskError> {
    let mut report = TaskReport::new(Task::Scripts);
    let out_dir = config.output_join(SCRIPTS_DIR);

    let scripts_dir = config.source_join(SCRIPTS_DIR);
    for script in SCRIPTS.collect(&scripts_dir).map_err(io_error(&scripts_dir))? {
        let source = fs::read_to_string(&script).map_err(io_error(&script))?;
        let code = minify_script(&source).map_err(|source| TaskError::Script {
            path: script.clone(),
            source,
        })?;

        let output = min_output(&script, &out_dir, "js");
        write_file(&output, code).map_err(io_error(&output))?;
        debug!("scripts"; "{}", config.display_path(&output));
        report.written.push(output);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(files: &[(&str, &str)]) -> (TempDir, PipelineConfig) {
        let dir = TempDir::new().unwrap();
        let scripts = dir.path().join("app/scripts");
        fs::create_dir_all(&scripts).unwrap();
        for (name, contents) in files {
            fs::write(scripts.join(name), contents).unwrap();
        }
        let config = PipelineConfig::for_root(dir.path());
        (dir, config)
    }

    #[test]
    fn test_minifies_and_skips_min_files() {
        let (dir, config) = setup(&[
            ("app.js", "// greeting\nfunction greet(name) {\n  return 'hi ' + name;\n}\n"),
            ("vendor.min.js", "var x=1;"),
        ]);

        let report = run(&config).unwrap();
        assert_eq!(report.written, vec![dir.path().join("dist/scripts/app.min.js")]);

        let code = fs::read_to_string(&report.written[0]).unwrap();
        assert!(code.contains("greet"), "{code}");
        assert!(!code.contains("greeting"), "{code}");
        assert!(!dir.path().join("dist/scripts/vendor.min.min.js").exists());
    }

    #[test]
    fn test_syntax_error_stops_run() {
        let (dir, config) = setup(&[("a.js", "function (\n"), ("b.js", "var b = 1;")]);

        let err = run(&config).unwrap_err();
        match err {
            TaskError::Script { path, .. } => assert!(path.ends_with("a.js")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.path().join("dist/scripts/b.min.js").exists());
    }
}
