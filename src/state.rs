use std::sync::Arc;

use crate::auth::{SessionError, SessionKeys};
use crate::config::AppConfig;
use crate::database::MealStore;

/// Shared handler state; cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn MealStore>,
    pub sessions: Arc<SessionKeys>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn MealStore>) -> Result<Self, SessionError> {
        let sessions = SessionKeys::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            store,
            sessions: Arc::new(sessions),
        })
    }

    pub fn max_limit(&self) -> i64 {
        self.config.filter.max_limit
    }
}
