//! Generation Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{GenerationSession, SessionManagerPort};
use crate::application::queries::{GetSession, ListProjectSessions};

/// GetSession Handler
pub struct GetSessionHandler {
    session_manager: Arc<dyn SessionManagerPort>,
}

impl GetSessionHandler {
    pub fn new(session_manager: Arc<dyn SessionManagerPort>) -> Self {
        Self { session_manager }
    }

    pub async fn handle(&self, query: GetSession) -> Result<GenerationSession, ApplicationError> {
        Ok(self.session_manager.get(&query.session_id)?)
    }
}

/// ListProjectSessions Handler
pub struct ListProjectSessionsHandler {
    session_manager: Arc<dyn SessionManagerPort>,
}

impl ListProjectSessionsHandler {
    pub fn new(session_manager: Arc<dyn SessionManagerPort>) -> Self {
        Self { session_manager }
    }

    pub async fn handle(
        &self,
        query: ListProjectSessions,
    ) -> Result<Vec<GenerationSession>, ApplicationError> {
        let mut sessions = self.session_manager.list_for_project(query.project_id);
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }
}
