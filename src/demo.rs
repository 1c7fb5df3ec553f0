//! Stand-in project and tasks shown in demo mode when the backend has
//! nothing for the student. Never used unless demo mode is switched on.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::models::{Milestone, Project, Task, TaskStatus};

#[derive(Debug, Clone, Default)]
pub struct Fallbacks {
    pub project: Option<Project>,
    pub tasks: Option<Vec<Task>>,
}

impl Fallbacks {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn demo(student_id: Uuid) -> Self {
        Self {
            project: Some(demo_project()),
            tasks: Some(demo_tasks(student_id)),
        }
    }
}

fn demo_project() -> Project {
    let today = Utc::now().date_naive();
    Project {
        id: Uuid::nil(),
        title: "Smart Campus Navigation".to_string(),
        description: Some(
            "Indoor wayfinding app for the engineering building using BLE beacons".to_string(),
        ),
        status: Some("In Progress".to_string()),
        progress: 60,
        start_date: Some(today - Duration::days(45)),
        end_date: Some(today + Duration::days(75)),
        mentor_id: None,
        team_members: vec!["You".to_string(), "Kiara Patel".to_string(), "Sam Okafor".to_string()],
        milestones: vec![
            Milestone {
                title: "Requirements sign-off".to_string(),
                due_date: Some(today - Duration::days(30)),
                completed: true,
            },
            Milestone {
                title: "Beacon field test".to_string(),
                due_date: Some(today + Duration::days(10)),
                completed: false,
            },
        ],
        upcoming_deadline: Some(today + Duration::days(10)),
    }
}

fn demo_tasks(student_id: Uuid) -> Vec<Task> {
    let tasks = vec![
        ("Survey existing campus maps", TaskStatus::Done, 40),
        ("Pick beacon hardware", TaskStatus::Done, 32),
        ("Indoor positioning prototype", TaskStatus::InProgress, 12),
        ("Accessibility review", TaskStatus::Todo, 3),
    ];

    tasks
        .into_iter()
        .map(|(title, status, days_ago)| Task {
            id: Uuid::new_v4(),
            assigned_to: student_id,
            title: Some(title.to_string()),
            status,
            created_at: Utc::now() - Duration::days(days_ago),
        })
        .collect()
}
