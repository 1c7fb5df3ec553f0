use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::error::FetchError;
use crate::fetcher::Resource;
use crate::models::{Meeting, Profile, Project, Report, Task, TaskList};
use crate::query::{Direction, FilterValue, Query};
use crate::stats;

pub const UPCOMING_MEETINGS_LIMIT: usize = 10;
pub const RECENT_REPORTS_LIMIT: usize = 10;

pub struct ProfileResource;
pub struct ProjectResource;
pub struct TasksResource;
pub struct MeetingsResource;
pub struct ReportsResource;

fn decode<T: DeserializeOwned>(resource: &'static str, row: Value) -> Result<T, FetchError> {
    serde_json::from_value(row).map_err(|source| FetchError::Decode { resource, source })
}

fn decode_rows<T: DeserializeOwned>(
    resource: &'static str,
    rows: Vec<Value>,
) -> Result<Vec<T>, FetchError> {
    rows.into_iter().map(|row| decode(resource, row)).collect()
}

impl Resource for ProfileResource {
    type Key = Uuid;
    type Output = Option<Profile>;

    const NAME: &'static str = "profile";

    fn query(user_id: &Uuid, _now: DateTime<Utc>) -> Query {
        Query::from("profiles")
            .select(&["id", "name", "email", "role"])
            .eq("id", FilterValue::Uuid(*user_id))
            .limit(1)
    }

    fn parse(rows: Vec<Value>) -> Result<Option<Profile>, FetchError> {
        rows.into_iter()
            .next()
            .map(|row| decode(Self::NAME, row))
            .transpose()
    }
}

/// A student's project is reached through their membership row, with the
/// project itself embedded.
impl Resource for ProjectResource {
    type Key = Uuid;
    type Output = Option<Project>;

    const NAME: &'static str = "project";

    fn query(student_id: &Uuid, _now: DateTime<Utc>) -> Query {
        Query::from("project_members")
            .select(&["project_id"])
            .embed("projects", "project_id")
            .eq("student_id", FilterValue::Uuid(*student_id))
            .limit(1)
    }

    fn parse(rows: Vec<Value>) -> Result<Option<Project>, FetchError> {
        let Some(mut membership) = rows.into_iter().next() else {
            return Ok(None);
        };
        match membership.get_mut("projects").map(Value::take) {
            Some(Value::Null) | None => Ok(None),
            Some(project) => decode(Self::NAME, project).map(Some),
        }
    }
}

impl Resource for TasksResource {
    type Key = Uuid;
    type Output = Option<TaskList>;

    const NAME: &'static str = "tasks";

    fn query(student_id: &Uuid, _now: DateTime<Utc>) -> Query {
        Query::from("tasks")
            .select(&["id", "assigned_to", "title", "status", "created_at"])
            .eq("assigned_to", FilterValue::Uuid(*student_id))
            .order("created_at", Direction::Descending)
    }

    fn parse(rows: Vec<Value>) -> Result<Option<TaskList>, FetchError> {
        let tasks: Vec<Task> = decode_rows(Self::NAME, rows)?;
        let stats = stats::compute(&tasks);
        Ok(Some(TaskList { tasks, stats }))
    }
}

impl Resource for MeetingsResource {
    type Key = Uuid;
    type Output = Vec<Meeting>;

    const NAME: &'static str = "meetings";

    fn query(project_id: &Uuid, now: DateTime<Utc>) -> Query {
        Query::from("meetings")
            .select(&["id", "project_id", "title", "scheduled_at", "time"])
            .eq("project_id", FilterValue::Uuid(*project_id))
            .gte("scheduled_at", FilterValue::Timestamp(now))
            .order("scheduled_at", Direction::Ascending)
            .limit(UPCOMING_MEETINGS_LIMIT)
    }

    fn parse(rows: Vec<Value>) -> Result<Vec<Meeting>, FetchError> {
        decode_rows(Self::NAME, rows)
    }
}

impl Resource for ReportsResource {
    type Key = Uuid;
    type Output = Vec<Report>;

    const NAME: &'static str = "reports";

    fn query(student_id: &Uuid, _now: DateTime<Utc>) -> Query {
        Query::from("reports")
            .select(&["id", "submitted_by", "title", "status", "created_at"])
            .eq("submitted_by", FilterValue::Uuid(*student_id))
            .order("created_at", Direction::Descending)
            .limit(RECENT_REPORTS_LIMIT)
    }

    fn parse(rows: Vec<Value>) -> Result<Vec<Report>, FetchError> {
        decode_rows(Self::NAME, rows)
    }
}
