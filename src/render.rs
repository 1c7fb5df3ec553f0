use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::aggregate::{Dashboard, DashboardView};
use crate::models::Project;

pub fn render_markdown(view: &DashboardView) -> String {
    match view {
        DashboardView::Loading => "# Student Dashboard\nLoading your dashboard...\n".to_string(),
        DashboardView::AuthenticationRequired => {
            "# Student Dashboard\nAuthentication required: sign in to view your dashboard.\n"
                .to_string()
        }
        DashboardView::ProfileNotFound => {
            "# Student Dashboard\nProfile not found: no student profile is linked to this account.\n"
                .to_string()
        }
        DashboardView::Ready(dashboard) => render_dashboard(dashboard),
    }
}

fn render_dashboard(dashboard: &Dashboard) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Student Dashboard");
    let _ = writeln!(
        output,
        "Welcome back, {} ({})",
        dashboard.profile.name, dashboard.profile.role
    );
    if !dashboard.pending.is_empty() {
        let _ = writeln!(output, "_Refreshing: {}_", dashboard.pending.join(", "));
    }
    for error in &dashboard.errors {
        let _ = writeln!(output, "> {} unavailable: {}", error.resource, error.message);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Project");
    match &dashboard.project {
        Some(project) => render_project(&mut output, project, dashboard.project_is_fallback),
        None => {
            let _ = writeln!(output, "No active project.");
        }
    }

    let stats = &dashboard.stats;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Tasks");
    let _ = writeln!(
        output,
        "- Progress: {}% ({} of {} done)",
        stats.progress_percent, stats.completed, stats.total
    );
    let _ = writeln!(output, "- In progress: {}", stats.in_progress);
    let _ = writeln!(output, "- To do: {}", stats.todo);
    for task in dashboard.tasks.iter().take(5) {
        let _ = writeln!(
            output,
            "  - [{}] {}",
            task.status.as_str(),
            task.title.as_deref().unwrap_or("Untitled task")
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Upcoming Meetings");
    if dashboard.meetings.is_empty() {
        let _ = writeln!(output, "No upcoming meetings.");
    } else {
        for meeting in &dashboard.meetings {
            let _ = writeln!(
                output,
                "- {} on {}{}",
                meeting.title,
                short_date(&meeting.scheduled_at),
                meeting
                    .time
                    .as_deref()
                    .map(|time| format!(" at {time}"))
                    .unwrap_or_default()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Reports");
    if dashboard.reports.is_empty() {
        let _ = writeln!(output, "No reports submitted yet.");
    } else {
        for report in &dashboard.reports {
            let _ = writeln!(
                output,
                "- {} ({}) submitted {}",
                report.title.as_deref().unwrap_or("Progress report"),
                report.status.as_deref().unwrap_or("submitted"),
                short_date(&report.created_at)
            );
        }
    }

    output
}

fn render_project(output: &mut String, project: &Project, is_fallback: bool) {
    let label = if is_fallback { " (demo)" } else { "" };
    let _ = writeln!(output, "### {}{}", project.title, label);
    if let Some(description) = &project.description {
        let _ = writeln!(output, "{description}");
    }
    let _ = writeln!(
        output,
        "- Status: {} ({}% complete)",
        project.status.as_deref().unwrap_or("unknown"),
        project.progress
    );
    if let (Some(start), Some(end)) = (project.start_date, project.end_date) {
        let _ = writeln!(output, "- Timeline: {start} to {end}");
    }
    if let Some(deadline) = project.upcoming_deadline {
        let _ = writeln!(output, "- Next deadline: {deadline}");
    }
    if !project.team_members.is_empty() {
        let _ = writeln!(output, "- Team: {}", project.team_members.join(", "));
    }
    for milestone in &project.milestones {
        let mark = if milestone.completed { "x" } else { " " };
        let _ = writeln!(output, "  - [{mark}] {}", milestone.title);
    }
}

fn short_date(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}
