//! External command execution.
//!
//! Builder-based API for running optimizer binaries and turning a failed
//! exit status into a readable error.
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! Cmd::new(&tool_path)
//!     .args(["-copy", "none", "-optimize", "-outfile"])
//!     .arg(&output)
//!     .arg(&input)
//!     .run()?;
//! ```

use crate::debug;
use anyhow::{Context, Result};
use regex::Regex;
use std::{
    ffi::{OsStr, OsString},
    path::Path,
    process::{Command, Output},
    sync::LazyLock,
};

/// Command builder for external process execution.
#[derive(Debug, Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
}

impl Cmd {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Add a single argument. Empty arguments are skipped.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    /// Add multiple arguments. Empty arguments are skipped.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    fn program_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .unwrap_or(&self.program)
            .to_string_lossy()
            .into_owned()
    }

    /// Run to completion, failing on a non-zero exit status.
    pub fn run(self) -> Result<Output> {
        let name = self.program_name();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        let output = cmd
            .output()
            .with_context(|| format!("Failed to execute `{name}`"))?;

        if !output.status.success() {
            anyhow::bail!(format_error(&name, &output));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = strip_ansi(stderr.trim());
        if !stderr.is_empty() {
            debug!(name.as_str(); "{}", stderr);
        }
        Ok(output)
    }
}

/// Strip ANSI escape codes from string.
fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid ansi regex"));
    RE.replace_all(s, "")
}

/// Format error message for a failed command.
fn format_error(name: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let mut msg = format!("Command `{name}` failed with {}", output.status);
    let stderr = strip_ansi(stderr.trim());
    if !stderr.is_empty() {
        msg.push('\n');
        msg.push_str(&stderr);
    }

    let stdout = stdout.trim();
    if !stdout.is_empty() {
        msg.push_str("\nStdout:\n");
        msg.push_str(stdout);
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_builder() {
        let cmd = Cmd::new("optipng")
            .arg("-strip")
            .args(["all", "-o3"]);

        assert_eq!(cmd.program, OsString::from("optipng"));
        assert_eq!(cmd.args.len(), 3);
    }

    #[test]
    fn test_empty_args_filtered() {
        let cmd = Cmd::new("echo").arg("").args(["a", "", "b"]);
        assert_eq!(cmd.args.len(), 2);
    }

    #[test]
    fn test_program_name_is_file_name() {
        assert_eq!(Cmd::new("/usr/bin/gifsicle").program_name(), "gifsicle");
        assert_eq!(Cmd::new("jpegtran").program_name(), "jpegtran");
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_ansi("Plain text"), "Plain text");
    }

    #[cfg(unix)]
    #[test]
    fn test_simple_command() {
        let output = Cmd::new("echo").arg("hello").run().unwrap();
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_is_error() {
        let err = Cmd::new("false").run().unwrap_err();
        assert!(err.to_string().contains("`false` failed"));
    }
}
