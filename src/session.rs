use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use crate::aggregate::{self, AuthState, DashboardView, Inputs};
use crate::backend::Backend;
use crate::demo::Fallbacks;
use crate::fetcher::Fetcher;
use crate::resources::{
    MeetingsResource, ProfileResource, ProjectResource, ReportsResource, TasksResource,
};

/// Owns the five fetchers for one signed-in student and wires their keys:
/// profile, project, tasks and reports follow the user id; meetings follow
/// the id of the remote project.
pub struct DashboardSession {
    backend: Arc<dyn Backend>,
    demo_mode: bool,
    auth: watch::Sender<AuthState>,
    profile: Fetcher<ProfileResource>,
    project: Fetcher<ProjectResource>,
    tasks: Fetcher<TasksResource>,
    meetings: Fetcher<MeetingsResource>,
    reports: Fetcher<ReportsResource>,
}

impl DashboardSession {
    pub fn new(backend: Arc<dyn Backend>, demo_mode: bool) -> Self {
        let (auth, _) = watch::channel(AuthState::pending());
        Self {
            profile: Fetcher::new(backend.clone()),
            project: Fetcher::new(backend.clone()),
            tasks: Fetcher::new(backend.clone()),
            meetings: Fetcher::new(backend.clone()),
            reports: Fetcher::new(backend.clone()),
            backend,
            demo_mode,
            auth,
        }
    }

    /// Resolves the session, then loads every resource for that user.
    pub async fn load(&self) {
        self.auth.send_replace(AuthState::pending());
        let session = self.backend.current_session().await;
        let user_id = session.as_ref().map(|s| s.user_id);
        match &session {
            Some(session) => {
                info!(user_id = %session.user_id, "loading dashboard");
                debug!(email = ?session.email, "session email");
            }
            None => info!("no signed-in user"),
        }
        self.auth.send_replace(AuthState::resolved(session));

        self.load_for(user_id).await;
    }

    /// Re-keys every fetcher to `user_id`. Responses still in flight for a
    /// previous user are dropped when they land.
    pub async fn load_for(&self, user_id: Option<Uuid>) {
        tokio::join!(
            self.profile.fetch(user_id),
            self.load_project_and_meetings(user_id),
            self.tasks.fetch(user_id),
            self.reports.fetch(user_id),
        );
    }

    async fn load_project_and_meetings(&self, user_id: Option<Uuid>) {
        // Meetings of the previous user's project must not outlive the switch.
        if self.project.key() != user_id {
            self.meetings.fetch(None).await;
        }
        self.project.fetch(user_id).await;
        let project_id = self.project.snapshot().data.map(|project| project.id);
        self.meetings.fetch(project_id).await;
    }

    pub fn view(&self) -> DashboardView {
        let auth = self.auth.borrow().clone();
        let profile = self.profile.snapshot();
        let project = self.project.snapshot();
        let tasks = self.tasks.snapshot();
        let meetings = self.meetings.snapshot();
        let reports = self.reports.snapshot();

        let fallbacks = match (&auth.session, self.demo_mode) {
            (Some(session), true) => Fallbacks::demo(session.user_id),
            _ => Fallbacks::none(),
        };

        aggregate::build(&Inputs {
            auth: &auth,
            profile: &profile,
            project: &project,
            tasks: &tasks,
            meetings: &meetings,
            reports: &reports,
            fallbacks: &fallbacks,
        })
    }

    pub fn dispose(&self) {
        self.profile.dispose();
        self.project.dispose();
        self.tasks.dispose();
        self.meetings.dispose();
        self.reports.dispose();
    }
}
