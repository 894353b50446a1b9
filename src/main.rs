use anyhow::{anyhow, Context};
use chrono::{Datelike, Duration, Month, Utc};
use dotenv::dotenv;
use std::convert::TryFrom;
use std::env;
use std::sync::Arc;
use tokio::runtime::Builder;
use tokio::sync::watch;
use tracing::{event, warn, Level};
use tracing_subscriber::EnvFilter;

use taskado::calendar::{upcoming_tasks, MonthGrid};
use taskado::config::Config;
use taskado::controller::SessionService;
use taskado::datastore::{Filter, MemoryTaskStorage, TaskDataStore, TaskStore};
use taskado::log;
use taskado::model::{Category, NewTask, OwnerId, Priority};
use taskado::notes::{MemoryNoteStorage, NotesStore};

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = match env::var("TASKADO_CONFIG") {
        Ok(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => Config::default(),
    };
    let env_filter = EnvFilter::try_from_env("TASKADO_LOG");
    log::setup(env_filter, config.log.as_ref())?;

    event!(Level::INFO, "Starting Taskado: {}", env!("FULL_VERSION"));

    let runtime = Builder::new_multi_thread()
        .thread_name("taskado")
        .enable_all()
        .build()?;
    runtime.block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    let tz = config.calendar.timezone()?;
    let owner = OwnerId::from_identity(config.session.owner.as_deref()).unwrap_or_else(|err| {
        warn!(reason = %err, "Configured owner rejected, using the local session.");
        OwnerId::local()
    });

    let storage = Arc::new(MemoryTaskStorage::new());
    let tasks = Arc::new(
        TaskStore::new(storage, owner.clone())
            .with_default_target_pomodoros(config.tasks.default_target_pomodoros),
    );
    let notes = Arc::new(NotesStore::new(Arc::new(MemoryNoteStorage::new()), owner));
    let (identity, identity_rx) = watch::channel(config.session.owner.clone());
    let session = SessionService::new(tasks.clone(), notes.clone(), identity_rx).spawn();

    let now = Utc::now();
    let release = tasks
        .add(
            NewTask::new("Write the release notes")
                .with_category(Category::Main)
                .with_priority(Priority::High),
            None,
        )
        .await?;
    tasks
        .add(
            NewTask::new("Review open pull requests").with_tag("review"),
            Some(now + Duration::days(2)),
        )
        .await?;
    tasks.record_pomodoro(&release.id).await?;
    tasks.mark_complete(&release.id).await?;
    notes
        .update("Ship before the end of the sprint.".to_string())
        .await?;

    // let the session apply the snapshots queued by the writes above
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    println!("Upcoming:");
    for task in upcoming_tasks(&tasks.tasks(), now) {
        println!("  {} ({})", task.title, task.created_at.with_timezone(&tz));
    }
    println!("Completed:");
    for task in tasks.items(&Filter::completed_tasks()) {
        println!(
            "  {} [{}/{} pomodoros]",
            task.title, task.completed_pomodoros, task.target_pomodoros
        );
    }
    let tags: Vec<String> = tasks.tags().into_iter().collect();
    println!("Tags: {}", tags.join(", "));
    println!("Notes: {}", notes.content());

    let today = now.with_timezone(&tz).date_naive();
    let month = Month::try_from(today.month() as u8)
        .map_err(|_| anyhow!("month {} out of range", today.month()))?;
    let grid = MonthGrid::new(today.year(), month, config.calendar.layout)?.populate(
        &tasks.tasks(),
        today,
        &tz,
    );
    println!("\n{}", grid);

    drop(identity);
    session.await?;
    Ok(())
}
