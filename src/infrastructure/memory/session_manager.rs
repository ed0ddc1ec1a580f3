//! In-Memory Session Manager Implementation
//!
//! 生成会话及其取消令牌；`active` 索引保证同一项目至多一个活动会话

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::ports::{
    GenerationSession, SessionError, SessionManagerPort, SessionStatus,
};

struct SessionEntry {
    session: GenerationSession,
    cancel: CancellationToken,
}

/// 内存会话管理器
pub struct InMemorySessionManager {
    sessions: DashMap<String, SessionEntry>,
    /// project_id -> 活动 session_id
    active: DashMap<Uuid, String>,
}

impl InMemorySessionManager {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            active: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 对非终态会话执行修改
    fn update_running<F>(&self, id: &str, f: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut GenerationSession),
    {
        let mut entry = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        if entry.session.status.is_terminal() {
            return Err(SessionError::AlreadyFinished(id.to_string()));
        }
        f(&mut entry.session);
        entry.session.updated_at = Utc::now();
        Ok(())
    }
}

impl Default for InMemorySessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManagerPort for InMemorySessionManager {
    fn begin(&self, session: GenerationSession) -> Result<CancellationToken, SessionError> {
        let session_id = session.id.clone();
        let project_id = session.project_id;

        match self.active.entry(project_id) {
            Entry::Occupied(existing) => Err(SessionError::AlreadyActive {
                project_id,
                session_id: existing.get().clone(),
            }),
            Entry::Vacant(slot) => {
                let cancel = CancellationToken::new();
                self.sessions.insert(
                    session_id.clone(),
                    SessionEntry {
                        session,
                        cancel: cancel.clone(),
                    },
                );
                slot.insert(session_id.clone());
                tracing::info!(session_id = %session_id, project_id = %project_id, "Session created");
                Ok(cancel)
            }
        }
    }

    fn plan(
        &self,
        id: &str,
        start_chapter: u32,
        total_batches: u32,
        completed: &[u32],
    ) -> Result<(), SessionError> {
        self.update_running(id, |s| {
            s.start_chapter = start_chapter;
            s.total_batches = total_batches;
            s.completed_chapter_numbers = completed.iter().copied().collect();
        })
    }

    fn release(&self, id: &str) -> Result<(), SessionError> {
        let (_, entry) = self
            .sessions
            .remove_if(id, |_, e| e.session.status == SessionStatus::Pending)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        let project_id = entry.session.project_id;
        self.active
            .remove_if(&project_id, |_, active_id| active_id.as_str() == id);
        tracing::debug!(session_id = %id, project_id = %project_id, "Session reservation released");
        Ok(())
    }

    fn get(&self, id: &str) -> Result<GenerationSession, SessionError> {
        self.sessions
            .get(id)
            .map(|e| e.session.clone())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    fn active_for_project(&self, project_id: Uuid) -> Option<GenerationSession> {
        let session_id = self.active.get(&project_id).map(|id| id.clone())?;
        self.get(&session_id).ok()
    }

    fn set_status(&self, id: &str, status: SessionStatus) -> Result<(), SessionError> {
        self.update_running(id, |s| s.status = status)?;
        tracing::debug!(session_id = %id, status = status.as_str(), "Session status updated");
        Ok(())
    }

    fn set_batch(&self, id: &str, current_batch: u32) -> Result<(), SessionError> {
        self.update_running(id, |s| s.current_batch = current_batch)
    }

    fn record_completed(&self, id: &str, chapters: &[u32]) -> Result<(), SessionError> {
        self.update_running(id, |s| {
            s.completed_chapter_numbers.extend(chapters.iter().copied())
        })
    }

    fn finish(
        &self,
        id: &str,
        status: SessionStatus,
        error: Option<String>,
    ) -> Result<(), SessionError> {
        let project_id = {
            let mut entry = self
                .sessions
                .get_mut(id)
                .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
            if entry.session.status.is_terminal() {
                return Err(SessionError::AlreadyFinished(id.to_string()));
            }
            entry.session.status = status;
            entry.session.error = error;
            entry.session.updated_at = Utc::now();
            entry.session.project_id
        };

        self.active
            .remove_if(&project_id, |_, active_id| active_id.as_str() == id);

        tracing::info!(session_id = %id, status = status.as_str(), "Session finished");
        Ok(())
    }

    fn cancel(&self, id: &str) -> Result<(), SessionError> {
        let entry = self
            .sessions
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        if entry.session.status.is_terminal() {
            return Err(SessionError::AlreadyFinished(id.to_string()));
        }
        entry.cancel.cancel();
        tracing::info!(session_id = %id, "Session cancel requested");
        Ok(())
    }

    fn clear(&self, id: &str) -> Result<(), SessionError> {
        let terminal = self
            .sessions
            .get(id)
            .map(|e| e.session.status.is_terminal())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        if !terminal {
            return Err(SessionError::NotTerminal(id.to_string()));
        }
        self.sessions.remove(id);
        tracing::debug!(session_id = %id, "Session cleared");
        Ok(())
    }

    fn list_for_project(&self, project_id: Uuid) -> Vec<GenerationSession> {
        self.sessions
            .iter()
            .filter(|e| e.session.project_id == project_id)
            .map(|e| e.session.clone())
            .collect()
    }

    fn list_all(&self) -> Vec<String> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(project_id: Uuid) -> GenerationSession {
        GenerationSession::new(project_id, 1, 2, Vec::new())
    }

    #[test]
    fn test_session_lifecycle() {
        let manager = InMemorySessionManager::new();
        let project_id = Uuid::new_v4();
        let s = session(project_id);
        let id = s.id.clone();

        let token = manager.begin(s).unwrap();
        assert!(!token.is_cancelled());
        assert_eq!(manager.active_for_project(project_id).unwrap().id, id);

        manager.set_status(&id, SessionStatus::Streaming).unwrap();
        manager.set_batch(&id, 1).unwrap();
        manager.record_completed(&id, &[1, 2]).unwrap();
        let snapshot = manager.get(&id).unwrap();
        assert_eq!(snapshot.status, SessionStatus::Streaming);
        assert_eq!(snapshot.current_batch, 1);
        assert_eq!(snapshot.completed_chapter_numbers.len(), 2);

        assert!(matches!(manager.clear(&id), Err(SessionError::NotTerminal(_))));

        manager.finish(&id, SessionStatus::Completed, None).unwrap();
        assert!(manager.active_for_project(project_id).is_none());
        assert!(matches!(
            manager.set_status(&id, SessionStatus::Streaming),
            Err(SessionError::AlreadyFinished(_))
        ));

        manager.clear(&id).unwrap();
        assert!(manager.get(&id).is_err());
    }

    #[test]
    fn test_one_active_session_per_project() {
        let manager = InMemorySessionManager::new();
        let project_id = Uuid::new_v4();
        let first = session(project_id);
        let first_id = first.id.clone();
        manager.begin(first).unwrap();

        let err = manager.begin(session(project_id)).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyActive { .. }));

        // 其他项目不受影响
        assert!(manager.begin(session(Uuid::new_v4())).is_ok());

        manager
            .finish(&first_id, SessionStatus::Failed, Some("boom".to_string()))
            .unwrap();
        assert!(manager.begin(session(project_id)).is_ok());
        assert_eq!(manager.list_for_project(project_id).len(), 2);
    }

    #[test]
    fn test_plan_then_release_reservation() {
        let manager = InMemorySessionManager::new();
        let project_id = Uuid::new_v4();
        let s = GenerationSession::new(project_id, 0, 0, Vec::new());
        let id = s.id.clone();
        manager.begin(s).unwrap();

        manager.plan(&id, 9, 3, &[1, 2, 3, 4]).unwrap();
        let planned = manager.get(&id).unwrap();
        assert_eq!(planned.start_chapter, 9);
        assert_eq!(planned.total_batches, 3);
        assert_eq!(planned.completed_chapter_numbers.len(), 4);

        manager.release(&id).unwrap();
        assert!(manager.get(&id).is_err());
        assert!(manager.active_for_project(project_id).is_none());
        assert!(manager.list_for_project(project_id).is_empty());
        assert!(manager.begin(session(project_id)).is_ok());
    }

    #[test]
    fn test_release_ignores_started_session() {
        let manager = InMemorySessionManager::new();
        let s = session(Uuid::new_v4());
        let id = s.id.clone();
        manager.begin(s).unwrap();
        manager.set_status(&id, SessionStatus::Streaming).unwrap();

        assert!(manager.release(&id).is_err());
        assert!(manager.get(&id).is_ok());
    }

    #[test]
    fn test_cancel_triggers_token() {
        let manager = InMemorySessionManager::new();
        let s = session(Uuid::new_v4());
        let id = s.id.clone();
        let token = manager.begin(s).unwrap();

        manager.cancel(&id).unwrap();
        assert!(token.is_cancelled());

        manager.finish(&id, SessionStatus::Cancelled, None).unwrap();
        assert!(matches!(manager.cancel(&id), Err(SessionError::AlreadyFinished(_))));
    }
}
