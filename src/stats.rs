use crate::models::{PartialTaskStats, Task, TaskStats, TaskStatus};

pub fn count_status(tasks: &[Task], status: &TaskStatus) -> usize {
    tasks.iter().filter(|task| &task.status == status).count()
}

pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (completed as f64 / total as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Counts every field from the raw list. Used by the tasks fetcher to supply
/// its stats alongside the rows.
pub fn compute(tasks: &[Task]) -> PartialTaskStats {
    let total = tasks.len();
    let completed = count_status(tasks, &TaskStatus::Done);
    PartialTaskStats {
        total: Some(total),
        completed: Some(completed),
        in_progress: Some(count_status(tasks, &TaskStatus::InProgress)),
        todo: Some(count_status(tasks, &TaskStatus::Todo)),
        progress_percent: Some(progress_percent(completed, total)),
    }
}

/// Trusts each supplied field and recomputes only the missing ones from
/// `tasks`.
pub fn derive(supplied: &PartialTaskStats, tasks: &[Task]) -> TaskStats {
    let total = supplied.total.unwrap_or(tasks.len());
    let completed = supplied
        .completed
        .unwrap_or_else(|| count_status(tasks, &TaskStatus::Done));
    let in_progress = supplied
        .in_progress
        .unwrap_or_else(|| count_status(tasks, &TaskStatus::InProgress));
    let todo = supplied
        .todo
        .unwrap_or_else(|| count_status(tasks, &TaskStatus::Todo));
    let progress_percent = supplied
        .progress_percent
        .unwrap_or_else(|| progress_percent(completed, total));

    TaskStats {
        total,
        completed,
        in_progress,
        todo,
        progress_percent,
    }
}
