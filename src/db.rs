use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use serde_json::Value;
use sqlx::{PgPool, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::{Backend, Session};
use crate::error::RemoteError;
use crate::query::{FilterValue, Query};

/// Direct Postgres access to the same tables the hosted backend exposes.
pub struct PgBackend {
    pool: PgPool,
    user_id: Option<Uuid>,
}

impl PgBackend {
    pub fn new(pool: PgPool, user_id: Option<Uuid>) -> Self {
        Self { pool, user_id }
    }
}

#[async_trait]
impl Backend for PgBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, RemoteError> {
        let (sql, binds) = query.to_sql()?;
        debug!(table = %query.table, %sql, "querying postgres");

        let mut statement = sqlx::query_scalar::<_, Value>(&sql);
        for value in binds {
            statement = match value {
                FilterValue::Uuid(id) => statement.bind(id),
                FilterValue::Timestamp(at) => statement.bind(at),
            };
        }

        Ok(statement.fetch_all(&self.pool).await?)
    }

    async fn current_session(&self) -> Option<Session> {
        let user_id = self.user_id?;
        let email = sqlx::query_scalar::<_, String>("SELECT email FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await;

        match email {
            Ok(email) => Some(Session { user_id, email }),
            Err(error) => {
                warn!(%error, "session check failed");
                None
            }
        }
    }
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let student_id = Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?;
    let mentor_id = Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?;
    let project_id = Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?;

    let profiles = vec![
        (student_id, "Avery Lee", "avery.lee@example.edu", "student"),
        (mentor_id, "Dr. Jules Moreno", "jules.moreno@example.edu", "mentor"),
    ];

    for (id, name, email, role) in profiles {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, name, email, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name, role = EXCLUDED.role
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(role)
        .execute(pool)
        .await?;
    }

    let today = Utc::now().date_naive();
    sqlx::query(
        r#"
        INSERT INTO projects
        (id, title, description, status, progress, start_date, end_date, mentor_id,
         team_members, milestones, upcoming_deadline)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(project_id)
    .bind("Campus Energy Monitor")
    .bind("Sensor network and dashboard for dormitory energy usage")
    .bind("In Progress")
    .bind(45_i32)
    .bind(today - Duration::days(60))
    .bind(today + Duration::days(90))
    .bind(mentor_id)
    .bind(serde_json::json!(["Avery Lee", "Kiara Patel"]))
    .bind(serde_json::json!([
        { "title": "Proposal approved", "due_date": today - Duration::days(40), "completed": true },
        { "title": "Prototype demo", "due_date": today + Duration::days(14), "completed": false }
    ]))
    .bind(today + Duration::days(14))
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO project_members (project_id, student_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(project_id)
    .bind(student_id)
    .execute(pool)
    .await?;

    let tasks = vec![
        ("seed-task-001", "Write literature review", "Done", 30),
        ("seed-task-002", "Order sensor kits", "Done", 25),
        ("seed-task-003", "Calibrate sensors", "In Progress", 10),
        ("seed-task-004", "Build ingestion service", "In Progress", 6),
        ("seed-task-005", "Draft usability survey", "To Do", 2),
    ];

    for (source_key, title, status, days_ago) in tasks {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, assigned_to, title, status, created_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(title)
        .bind(status)
        .bind(Utc::now() - Duration::days(days_ago))
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    let meetings = vec![
        ("seed-meeting-001", "Mentor check-in", 2, "10:00"),
        ("seed-meeting-002", "Prototype review", 9, "14:30"),
    ];

    for (source_key, title, days_ahead, time) in meetings {
        sqlx::query(
            r#"
            INSERT INTO meetings (id, project_id, title, scheduled_at, time, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(title)
        .bind(Utc::now() + Duration::days(days_ahead))
        .bind(time)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    let reports = vec![
        ("seed-report-001", "Week 6 progress report", "reviewed", 14),
        ("seed-report-002", "Week 8 progress report", "submitted", 1),
    ];

    for (source_key, title, status, days_ago) in reports {
        sqlx::query(
            r#"
            INSERT INTO reports (id, submitted_by, title, status, created_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(title)
        .bind(status)
        .bind(Utc::now() - Duration::days(days_ago))
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        email: String,
        title: String,
        status: String,
        created_on: NaiveDate,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let student_id: Uuid = sqlx::query("SELECT id FROM profiles WHERE email = $1")
            .bind(&row.email)
            .fetch_optional(pool)
            .await?
            .with_context(|| format!("no profile with email {}", row.email))?
            .get("id");

        let created_at = row
            .created_on
            .and_hms_opt(0, 0, 0)
            .context("invalid date")?
            .and_utc();
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO tasks (id, assigned_to, title, status, created_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(&row.title)
        .bind(&row.status)
        .bind(created_at)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
