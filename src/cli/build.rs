//! Build orchestration.
//!
//! The five build tasks start together on the rayon pool; there is no
//! ordering between them and one failing does not stop the others.

use anyhow::{Result, bail};
use rayon::prelude::*;

use crate::core::Task;
use crate::log;
use crate::task::{TaskContext, TaskError, TaskReport, run_task};

/// Run every build task once, returning the outcomes in start order.
pub fn run_build_tasks(ctx: &TaskContext) -> Vec<(Task, Result<TaskReport, TaskError>)> {
    Task::BUILD
        .par_iter()
        .map(|&task| (task, run_task(task, ctx)))
        .collect()
}

/// Log each outcome; returns the number of failed tasks.
pub fn log_outcomes(outcomes: &[(Task, Result<TaskReport, TaskError>)]) -> usize {
    let mut failed = 0;
    for (task, outcome) in outcomes {
        match outcome {
            Ok(report) => log!(task.name(); "{}", report.summary()),
            Err(err) => {
                failed += 1;
                log!("error"; "{task}: {err}");
            }
        }
    }
    failed
}

/// `sitepipe build`: run every build task and fail if any task failed.
pub fn build_all(ctx: &TaskContext) -> Result<()> {
    let failed = log_outcomes(&run_build_tasks(ctx));
    if failed > 0 {
        bail!("{failed} of {} build tasks failed", Task::BUILD.len());
    }
    Ok(())
}

/// Run a single task command.
pub fn run_single(task: Task, ctx: &TaskContext) -> Result<()> {
    let report = run_task(task, ctx)?;
    log!(task.name(); "{}", report.summary());
    Ok(())
}
