use std::sync::Arc;
use std::time::Duration;

use chat_service::repository::{
    ConnectionRequestRepository, MessageRepository, PgConnectionRequestRepository,
    PgMessageRepository, PgUserRepository, UserRepository,
};
use chat_service::services::{
    DisabledNotificationSender, HttpEmailSender, MessageService, NotificationSender,
};
use chat_service::sse::ConnectionRegistry;
use chat_service::state::AppState;
use chat_service::workflow::{
    ConnectionReminderWorkflow, PgWorkflowStore, WorkflowProcessor, WorkflowScheduler,
    WorkflowStore,
};
use chat_service::{config, db, error, logging, metrics, migrations, routes};

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let pool = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;

    // Embedded migrations are idempotent; a schema drift is fatal
    migrations::run_all(&pool)
        .await
        .map_err(|e| error::AppError::StartServer(format!("database migrations failed: {e}")))?;

    let app_metrics = metrics::Metrics::new("chat-service");
    let registry = ConnectionRegistry::new();

    let message_repo: Arc<dyn MessageRepository> = Arc::new(PgMessageRepository::new(pool.clone()));
    let user_repo: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
    let request_repo: Arc<dyn ConnectionRequestRepository> =
        Arc::new(PgConnectionRequestRepository::new(pool.clone()));

    let notifier: Arc<dyn NotificationSender> = match cfg.email.clone() {
        Some(email) => Arc::new(HttpEmailSender::new(email)),
        None => {
            tracing::warn!("EMAIL_API_URL not set; notification delivery disabled");
            Arc::new(DisabledNotificationSender)
        }
    };

    let store: Arc<dyn WorkflowStore> = Arc::new(PgWorkflowStore::new(pool.clone()));
    let mut scheduler = WorkflowScheduler::new(store, cfg.workflow_max_retries);
    scheduler.register(Arc::new(ConnectionReminderWorkflow::new(
        request_repo,
        user_repo.clone(),
        notifier,
        chrono::Duration::hours(cfg.reminder_delay_hours),
    )));
    let scheduler = Arc::new(scheduler);

    // Re-entry trigger for suspended runs; all of its state is in the store,
    // so a restart picks up exactly where the previous process left off
    let processor = WorkflowProcessor::new(
        scheduler.clone(),
        cfg.workflow_batch_size,
        Duration::from_secs(cfg.workflow_poll_interval_secs),
        Some(app_metrics.clone()),
    );
    tokio::spawn(async move {
        processor.start().await;
    });

    let messages = Arc::new(MessageService::new(
        message_repo,
        user_repo,
        registry.clone(),
    ));

    let state = AppState {
        registry,
        messages,
        scheduler,
        metrics: app_metrics,
        config: cfg.clone(),
    };

    let app = routes::build_router().with_state(state);

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| error::AppError::StartServer(format!("bind {bind_addr}: {e}")))?;
    tracing::info!(%bind_addr, "starting chat-service");

    axum::serve(listener, app)
        .await
        .map_err(|e| error::AppError::StartServer(format!("serve: {e}")))?;

    Ok(())
}
