use std::sync::Arc;

use crate::feedback::gate::FeedbackService;
use crate::interview::orchestrator::InterviewService;
use crate::llm_client::router::ProviderRouter;
use crate::llm_client::AiClient;
use crate::sessions::lock::SessionLocks;
use crate::store::{FeedbackStore, MessageStore, SessionStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionStore>,
    pub interviews: InterviewService,
    pub feedback: FeedbackService,
    /// The one router instance; both services route through it.
    pub router: Arc<ProviderRouter>,
}

impl AppState {
    pub fn new<S>(store: Arc<S>, router: Arc<ProviderRouter>) -> Self
    where
        S: SessionStore + MessageStore + FeedbackStore + 'static,
    {
        let ai = AiClient::new(router.clone());
        let locks = Arc::new(SessionLocks::new());

        Self {
            sessions: store.clone(),
            interviews: InterviewService::new(
                store.clone(),
                store.clone(),
                ai.clone(),
                locks.clone(),
            ),
            feedback: FeedbackService::new(store.clone(), store.clone(), store, ai, locks),
            router,
        }
    }
}
