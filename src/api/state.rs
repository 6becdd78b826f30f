use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::application::{ChatResponder, ResponderFactory};
use crate::domain::DomainError;
use crate::infrastructure::{AppConfig, InteractionLog};

#[derive(Clone)]
pub struct AppState {
    responder: Arc<OnceCell<Arc<ChatResponder>>>,
    factory: Arc<dyn ResponderFactory>,
    pub monitor: Option<Arc<InteractionLog>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, factory: Arc<dyn ResponderFactory>) -> Self {
        Self {
            responder: Arc::new(OnceCell::new()),
            factory,
            monitor: None,
            config: Arc::new(config),
        }
    }

    /// Starts with a ready responder instead of building one on first use.
    pub fn with_responder(self, responder: Arc<ChatResponder>) -> Self {
        Self {
            responder: Arc::new(OnceCell::new_with(Some(responder))),
            ..self
        }
    }

    pub fn with_monitor(mut self, monitor: Arc<InteractionLog>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// The shared responder, built once. Concurrent first callers wait on the
    /// same construction; a failed one is retried by the next caller.
    pub async fn responder(&self) -> Result<Arc<ChatResponder>, DomainError> {
        self.responder
            .get_or_try_init(|| async {
                tracing::info!("initializing chat responder");
                self.factory.build().await.map(Arc::new)
            })
            .await
            .cloned()
    }

    /// The responder if it has been built; never triggers construction.
    pub fn existing_responder(&self) -> Option<Arc<ChatResponder>> {
        self.responder.get().cloned()
    }
}
