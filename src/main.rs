use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod aggregate;
mod backend;
mod config;
mod db;
mod demo;
mod error;
mod fetcher;
#[cfg(test)]
mod memory;
mod models;
mod query;
mod render;
mod resources;
mod rest;
mod session;
mod stats;

use backend::Backend;
use config::{BackendConfig, Config};
use session::DashboardSession;

#[derive(Parser)]
#[command(name = "student-dashboard")]
#[command(about = "Student project dashboard: tasks, meetings, reports and project status", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the signed-in student's dashboard and render it
    Dashboard {
        /// Student to load (postgres backend only)
        #[arg(long)]
        user: Option<String>,
        /// Fill a missing project or task list with demo data
        #[arg(long)]
        demo: bool,
        /// Emit the view-model as JSON instead of markdown
        #[arg(long)]
        json: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import tasks from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DASHBOARD_LOG")
        .unwrap_or_else(|_| EnvFilter::new("student_dashboard=info,warn"));
    let format = std::env::var("DASHBOARD_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn admin_pool(config: &Config) -> anyhow::Result<PgPool> {
    match &config.backend {
        BackendConfig::Postgres { database_url, .. } => connect(database_url).await,
        BackendConfig::Rest { .. } => {
            bail!("this command needs DASHBOARD_BACKEND=postgres and DATABASE_URL")
        }
    }
}

async fn build_backend(config: Config, user: Option<String>) -> anyhow::Result<Arc<dyn Backend>> {
    let user = user
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| config::parse_user_id("--user", &raw))
        .transpose()?;

    match config.backend {
        BackendConfig::Rest {
            base_url,
            api_key,
            access_token,
        } => {
            if user.is_some() {
                warn!("--user is ignored by the rest backend; the session comes from SUPABASE_ACCESS_TOKEN");
            }
            Ok(Arc::new(rest::RestBackend::new(base_url, api_key, access_token)))
        }
        BackendConfig::Postgres {
            database_url,
            user_id,
        } => {
            let pool = connect(&database_url).await?;
            Ok(Arc::new(db::PgBackend::new(pool, user.or(user_id))))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::from_env().context("configuration is incomplete")?;

    match cli.command {
        Commands::Dashboard {
            user,
            demo,
            json,
            out,
        } => {
            let demo_mode = demo || config.demo_mode;
            let backend = build_backend(config, user).await?;
            let session = DashboardSession::new(backend, demo_mode);
            session.load().await;
            let view = session.view();
            session.dispose();

            let rendered = if json {
                serde_json::to_string_pretty(&view)?
            } else {
                render::render_markdown(&view)
            };

            match out {
                Some(out) => {
                    std::fs::write(&out, rendered)?;
                    println!("Dashboard written to {}.", out.display());
                }
                None => print!("{rendered}"),
            }
        }
        Commands::InitDb => {
            let pool = admin_pool(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = admin_pool(&config).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = admin_pool(&config).await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} tasks from {}.", csv.display());
        }
    }

    Ok(())
}
