use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    agent::Report,
    error::Result,
    runner::{Consultation, RunStatus},
};

/// Browser-side session: the uploaded report and the last displayed result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultSession {
    pub id: String,
    pub report: Option<Report>,
    pub status: RunStatus,
    pub last: Option<Consultation>,
    pub created_at: DateTime<Utc>,
    /// Last time the session was written; idle sessions are purged from this
    pub updated_at: DateTime<Utc>,
}

impl ConsultSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            report: None,
            status: RunStatus::Idle,
            last: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_report(report: Report) -> Self {
        let mut session = Self::new();
        session.report = Some(report);
        session
    }

    /// Replace the report. A previous result belonged to the old report, so it is dropped.
    pub fn set_report(&mut self, report: Report) {
        self.report = Some(report);
        self.last = None;
        self.status = RunStatus::Idle;
    }

    pub fn has_report(&self) -> bool {
        self.report.is_some()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for ConsultSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for storing and retrieving sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: ConsultSession) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<ConsultSession>>;
    async fn delete(&self, id: &str) -> Result<()>;
    /// Remove every session last updated before `cutoff`, returning how many went.
    async fn purge_idle(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// In-memory implementation of SessionStorage
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, ConsultSession>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemorySessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: ConsultSession) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ConsultSession>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn purge_idle(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.updated_at >= cutoff);
        Ok(before.saturating_sub(self.sessions.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;

    #[tokio::test]
    async fn save_get_delete() {
        let storage = InMemorySessionStorage::new();
        let session = ConsultSession::with_report(Report::from("Palpitations"));
        let id = session.id.clone();

        storage.save(session).await.unwrap();
        let loaded = storage.get(&id).await.unwrap().unwrap();
        assert_eq!(loaded.report, Some(Report::from("Palpitations")));
        assert_eq!(loaded.status, RunStatus::Idle);

        storage.delete(&id).await.unwrap();
        assert!(storage.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purge_removes_only_idle_sessions() {
        let storage = InMemorySessionStorage::new();

        let mut stale = ConsultSession::with_report(Report::from("Dizziness"));
        stale.updated_at = Utc::now() - chrono::TimeDelta::hours(2);
        let stale_id = stale.id.clone();
        let fresh = ConsultSession::new();
        let fresh_id = fresh.id.clone();
        storage.save(stale).await.unwrap();
        storage.save(fresh).await.unwrap();

        let removed = storage
            .purge_idle(Utc::now() - chrono::TimeDelta::hours(1))
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(storage.get(&stale_id).await.unwrap().is_none());
        assert!(storage.get(&fresh_id).await.unwrap().is_some());
    }

    #[test]
    fn new_report_clears_previous_result() {
        let mut session = ConsultSession::with_report(Report::from("old"));
        session.status = RunStatus::Done;
        session.last = Some(Consultation {
            role: Role::Cardiologist,
            prompt: "p".to_string(),
            output: "o".to_string(),
            status: RunStatus::Done,
        });

        session.set_report(Report::from("new"));

        assert!(session.last.is_none());
        assert_eq!(session.status, RunStatus::Idle);
        assert_eq!(session.report, Some(Report::from("new")));
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(ConsultSession::new().id, ConsultSession::new().id);
        assert!(!ConsultSession::new().has_report());
    }
}
