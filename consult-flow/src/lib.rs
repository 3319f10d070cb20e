pub mod agent;
pub mod error;
pub mod oracle;
pub mod prompts;
pub mod role;
pub mod runner;
pub mod storage;

// Re-export commonly used types
pub use agent::{Agent, AgentOutput, Report, SpecialistFindings};
pub use error::{ConsultError, Result};
pub use oracle::{
    GenerationConfig, GenerationOracle, PadToken, strip_control_markers, truncate_to_token_budget,
};
pub use role::Role;
pub use runner::{Consultation, Orchestrator, RunStatus};
pub use storage::{ConsultSession, InMemorySessionStorage, SessionStorage};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct EchoOracle;

    #[async_trait]
    impl GenerationOracle for EchoOracle {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, prompt: &str, _config: &GenerationConfig) -> Result<String> {
            Ok(strip_control_markers(&format!("{prompt}<|endoftext|>")))
        }
    }

    #[tokio::test]
    async fn test_session_round_trip_with_consultation() {
        let storage = InMemorySessionStorage::new();
        let orchestrator = Orchestrator::new(Arc::new(EchoOracle));

        let session = ConsultSession::with_report(Report::from("Dizziness on exertion."));
        let session_id = session.id.clone();
        storage.save(session).await.unwrap();

        let mut session = storage.get(&session_id).await.unwrap().unwrap();
        let consultation = orchestrator
            .consult(Role::Psychologist, session.report.as_ref())
            .await
            .unwrap();
        assert_eq!(
            consultation.output,
            "Act like a psychologist. Here is the Patient Report:\nDizziness on exertion.\n"
        );

        session.status = consultation.status.clone();
        session.last = Some(consultation);
        storage.save(session).await.unwrap();

        let stored = storage.get(&session_id).await.unwrap().unwrap();
        assert_eq!(stored.status, RunStatus::Done);
        assert_eq!(stored.last.unwrap().role, Role::Psychologist);
    }
}
