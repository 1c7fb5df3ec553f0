//! Dashboard view-model: a pure function of the current fetcher snapshots.

use serde::Serialize;

use crate::backend::Session;
use crate::demo::Fallbacks;
use crate::fetcher::FetchState;
use crate::models::{
    Meeting, PartialTaskStats, Profile, Project, Report, Task, TaskList, TaskStats,
};
use crate::stats;

#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub loading: bool,
    pub session: Option<Session>,
}

impl AuthState {
    pub fn pending() -> Self {
        Self {
            loading: true,
            session: None,
        }
    }

    pub fn resolved(session: Option<Session>) -> Self {
        Self {
            loading: false,
            session,
        }
    }
}

pub struct Inputs<'a> {
    pub auth: &'a AuthState,
    pub profile: &'a FetchState<Option<Profile>>,
    pub project: &'a FetchState<Option<Project>>,
    pub tasks: &'a FetchState<Option<TaskList>>,
    pub meetings: &'a FetchState<Vec<Meeting>>,
    pub reports: &'a FetchState<Vec<Report>>,
    pub fallbacks: &'a Fallbacks,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceError {
    pub resource: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub profile: Profile,
    pub project: Option<Project>,
    pub project_is_fallback: bool,
    pub tasks: Vec<Task>,
    pub stats: TaskStats,
    pub meetings: Vec<Meeting>,
    pub reports: Vec<Report>,
    /// Secondary resources still loading. Drives the refresh indicator only.
    pub pending: Vec<&'static str>,
    pub errors: Vec<ResourceError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "dashboard", rename_all = "snake_case")]
pub enum DashboardView {
    Loading,
    AuthenticationRequired,
    ProfileNotFound,
    Ready(Box<Dashboard>),
}

pub fn build(inputs: &Inputs<'_>) -> DashboardView {
    if inputs.auth.loading || inputs.profile.loading {
        return DashboardView::Loading;
    }
    if inputs.auth.session.is_none() {
        return DashboardView::AuthenticationRequired;
    }
    let Some(profile) = inputs.profile.data.clone() else {
        return DashboardView::ProfileNotFound;
    };

    let project_is_fallback = inputs.project.data.is_none() && inputs.fallbacks.project.is_some();
    let project = inputs
        .project
        .data
        .clone()
        .or_else(|| inputs.fallbacks.project.clone());

    let (tasks, supplied) = match (&inputs.tasks.data, &inputs.fallbacks.tasks) {
        (Some(remote), _) => (remote.tasks.clone(), remote.stats),
        (None, Some(fallback)) => (fallback.clone(), PartialTaskStats::default()),
        (None, None) => (Vec::new(), PartialTaskStats::default()),
    };
    let stats = stats::derive(&supplied, &tasks);

    DashboardView::Ready(Box::new(Dashboard {
        profile,
        project,
        project_is_fallback,
        tasks,
        stats,
        meetings: inputs.meetings.data.clone(),
        reports: inputs.reports.data.clone(),
        pending: pending(inputs),
        errors: errors(inputs),
    }))
}

fn pending(inputs: &Inputs<'_>) -> Vec<&'static str> {
    [
        ("project", inputs.project.loading),
        ("tasks", inputs.tasks.loading),
        ("meetings", inputs.meetings.loading),
        ("reports", inputs.reports.loading),
    ]
    .into_iter()
    .filter_map(|(name, loading)| loading.then_some(name))
    .collect()
}

fn errors(inputs: &Inputs<'_>) -> Vec<ResourceError> {
    [
        ("project", &inputs.project.error),
        ("tasks", &inputs.tasks.error),
        ("meetings", &inputs.meetings.error),
        ("reports", &inputs.reports.error),
    ]
    .into_iter()
    .filter_map(|(resource, error)| {
        error.as_ref().map(|message| ResourceError {
            resource,
            message: message.clone(),
        })
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::TaskStatus;

    struct Fixture {
        auth: AuthState,
        profile: FetchState<Option<Profile>>,
        project: FetchState<Option<Project>>,
        tasks: FetchState<Option<TaskList>>,
        meetings: FetchState<Vec<Meeting>>,
        reports: FetchState<Vec<Report>>,
        fallbacks: Fallbacks,
    }

    impl Fixture {
        fn signed_in() -> Self {
            let user_id = Uuid::new_v4();
            Self {
                auth: AuthState::resolved(Some(Session {
                    user_id,
                    email: Some("avery.lee@example.edu".to_string()),
                })),
                profile: FetchState {
                    data: Some(Profile {
                        id: user_id,
                        name: "Avery Lee".to_string(),
                        email: "avery.lee@example.edu".to_string(),
                        role: "student".to_string(),
                    }),
                    ..FetchState::default()
                },
                project: FetchState::default(),
                tasks: FetchState::default(),
                meetings: FetchState::default(),
                reports: FetchState::default(),
                fallbacks: Fallbacks::none(),
            }
        }

        fn view(&self) -> DashboardView {
            build(&Inputs {
                auth: &self.auth,
                profile: &self.profile,
                project: &self.project,
                tasks: &self.tasks,
                meetings: &self.meetings,
                reports: &self.reports,
                fallbacks: &self.fallbacks,
            })
        }

        fn dashboard(&self) -> Dashboard {
            match self.view() {
                DashboardView::Ready(dashboard) => *dashboard,
                other => panic!("expected dashboard, got {other:?}"),
            }
        }
    }

    fn task(status: TaskStatus) -> Task {
        Task {
            id: Uuid::new_v4(),
            assigned_to: Uuid::new_v4(),
            title: None,
            status,
            created_at: Utc::now(),
        }
    }

    fn named_project(title: &str) -> Project {
        Project {
            id: Uuid::new_v4(),
            title: title.to_string(),
            ..Project::default()
        }
    }

    #[test]
    fn auth_loading_wins_over_everything() {
        let mut fixture = Fixture::signed_in();
        fixture.auth.loading = true;
        fixture.project.data = Some(named_project("Capstone"));
        assert_eq!(fixture.view(), DashboardView::Loading);

        fixture.auth = AuthState::pending();
        fixture.profile.data = None;
        assert_eq!(fixture.view(), DashboardView::Loading);
    }

    #[test]
    fn profile_bootstrap_gates_loading() {
        let mut fixture = Fixture::signed_in();
        fixture.profile.loading = true;
        assert_eq!(fixture.view(), DashboardView::Loading);
    }

    #[test]
    fn missing_user_requires_authentication() {
        let mut fixture = Fixture::signed_in();
        fixture.auth = AuthState::resolved(None);
        fixture.project.data = Some(named_project("Capstone"));
        assert_eq!(fixture.view(), DashboardView::AuthenticationRequired);

        fixture.profile.data = None;
        assert_eq!(fixture.view(), DashboardView::AuthenticationRequired);
    }

    #[test]
    fn missing_profile_is_reported() {
        let mut fixture = Fixture::signed_in();
        fixture.profile.data = None;
        fixture.profile.error = Some("timeout".to_string());
        assert_eq!(fixture.view(), DashboardView::ProfileNotFound);
    }

    #[test]
    fn secondary_loading_does_not_gate() {
        let mut fixture = Fixture::signed_in();
        fixture.project.loading = true;
        fixture.meetings.loading = true;
        let dashboard = fixture.dashboard();
        assert_eq!(dashboard.pending, vec!["project", "meetings"]);
    }

    #[test]
    fn fallback_project_applies_only_when_remote_is_null() {
        let mut fixture = Fixture::signed_in();
        fixture.fallbacks.project = Some(named_project("Demo project"));

        let dashboard = fixture.dashboard();
        assert_eq!(dashboard.project.unwrap().title, "Demo project");
        assert!(dashboard.project_is_fallback);

        fixture.project.data = Some(Project::default());
        let dashboard = fixture.dashboard();
        assert_eq!(dashboard.project, Some(Project::default()));
        assert!(!dashboard.project_is_fallback);
    }

    #[test]
    fn empty_remote_tasks_beat_fallback_tasks() {
        let mut fixture = Fixture::signed_in();
        fixture.fallbacks.tasks = Some(vec![task(TaskStatus::Done)]);

        assert_eq!(fixture.dashboard().stats.total, 1);

        fixture.tasks.data = Some(TaskList::default());
        let dashboard = fixture.dashboard();
        assert!(dashboard.tasks.is_empty());
        assert_eq!(dashboard.stats.total, 0);
        assert_eq!(dashboard.stats.progress_percent, 0);
    }

    #[test]
    fn stats_prefer_supplied_values() {
        let mut fixture = Fixture::signed_in();
        let tasks = vec![
            task(TaskStatus::Todo),
            task(TaskStatus::InProgress),
            task(TaskStatus::Done),
        ];
        fixture.tasks.data = Some(TaskList {
            tasks,
            stats: PartialTaskStats {
                completed: Some(3),
                ..PartialTaskStats::default()
            },
        });

        let stats = fixture.dashboard().stats;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 3);
        assert_eq!(stats.todo, 1);
        assert_eq!(stats.progress_percent, 100);
    }

    #[test]
    fn resource_errors_are_listed_next_to_partial_data() {
        let mut fixture = Fixture::signed_in();
        fixture.meetings.error = Some("backend returned 503".to_string());
        fixture.project.data = Some(named_project("Capstone"));

        let dashboard = fixture.dashboard();
        assert_eq!(
            dashboard.errors,
            vec![ResourceError {
                resource: "meetings",
                message: "backend returned 503".to_string(),
            }]
        );
        assert_eq!(dashboard.project.unwrap().title, "Capstone");
    }
}
