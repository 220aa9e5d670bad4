use std::sync::Arc;

use crate::config::Config;
use crate::metrics::Metrics;
use crate::services::MessageService;
use crate::sse::ConnectionRegistry;
use crate::workflow::WorkflowScheduler;

#[derive(Clone)]
pub struct AppState {
    pub registry: ConnectionRegistry,
    pub messages: Arc<MessageService>,
    pub scheduler: Arc<WorkflowScheduler>,
    pub metrics: Metrics,
    pub config: Arc<Config>,
}
