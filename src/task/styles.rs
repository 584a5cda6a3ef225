//! `styles`: compile the entry stylesheet into a minified, prefixed file.

use super::{TaskError, TaskReport, io_error};
use crate::asset::style::{compile_sass, finish_css};
use crate::config::PipelineConfig;
use crate::core::Task;
use crate::debug;
use crate::utils::fs::{min_output, write_file};

const CSS_DIR: &str = "css";

pub(super) fn run(config: &PipelineConfig) -> Result<TaskReport, TaskError> {
    let mut report = TaskReport::new(Task::Styles);
    let entry = config.source_join(&config.styles.entry);

    if !entry.is_file() {
        report.notice(format!(
            "entry stylesheet {} not found",
            config.display_path(&entry)
        ));
        return Ok(report);
    }

    let css = match compile_sass(&entry).and_then(|css| finish_css(&css, &config.styles.browsers))
    {
        Ok(css) => css,
        Err(diagnostic) => {
            report.notice(format!("{}: {diagnostic}", config.display_path(&entry)));
            return Ok(report);
        }
    };

    let output = min_output(&entry, &config.output_join(CSS_DIR), "css");
    write_file(&output, css).map_err(io_error(&output))?;
    debug!("styles"; "{}", config.display_path(&output));
    report.written.push(output);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup(entry: &str, source: &str) -> (TempDir, PipelineConfig) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app").join(entry);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, source).unwrap();
        let config = PipelineConfig::for_root(dir.path());
        (dir, config)
    }

    #[test]
    fn test_writes_minified_output() {
        let (dir, config) = setup(
            "sass/main.sass",
            "@media (max-width: 600px)\n  .a\n    color: red\n.b\n  user-select: none\n@media (max-width: 600px)\n  .c\n    color: blue\n",
        );

        let report = run(&config).unwrap();
        assert!(report.notices.is_empty(), "{:?}", report.notices);

        let css = fs::read_to_string(dir.path().join("dist/css/main.min.css")).unwrap();
        assert_eq!(css.matches("@media").count(), 1, "{css}");
        assert!(css.contains("-webkit-user-select"), "{css}");
        assert!(!css.contains('\n'), "{css}");
    }

    #[test]
    fn test_missing_entry_is_notice() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::for_root(dir.path());
        let report = run(&config).unwrap();
        assert_eq!(report.notices.len(), 1);
        assert!(report.notices[0].message.contains("app/sass/main.sass"));
        assert!(report.written.is_empty());
    }

    #[test]
    fn test_scss_entry_from_config() {
        let (dir, mut config) = setup("styles/site.scss", "$w: 10px;\n.a { width: $w * 2; }\n");
        config.styles.entry = "styles/site.scss".into();

        let report = run(&config).unwrap();
        assert_eq!(report.written, vec![dir.path().join("dist/css/site.min.css")]);
        let css = fs::read_to_string(&report.written[0]).unwrap();
        assert!(css.contains("20px"), "{css}");
    }
}
