use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mentorship::api::router;
use mentorship::clock::SystemClock;
use mentorship::config::AppConfig;
use mentorship::db;
use mentorship::services::{LessonReminderScheduler, LessonService, TracingNotifier};
use mentorship::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "mentorship=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::new_from_env()?;

    let pool = db::connect(&config.database_url, config.max_connections).await?;
    db::migrate(&pool).await?;

    let lessons = LessonService::new(pool.clone(), Arc::new(SystemClock));

    let reminders = LessonReminderScheduler::new(
        lessons.clone(),
        Arc::new(TracingNotifier),
        config.reminder_interval_secs,
        config.reminder_lookahead_hours,
    );
    tokio::spawn(reminders.start());

    let state = AppState { db: pool, lessons };
    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
