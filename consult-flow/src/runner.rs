//! Orchestrator – builds the agent for a selected role, runs it once, and hands back the
//! result.
//!
//! The orchestrator holds no memory between calls. The only shared state is the generation
//! oracle handle, which is read-only and cheap to clone:
//! ```rust,ignore
//! // At startup
//! let orchestrator = Orchestrator::new(Arc::new(my_oracle));
//!
//! // In request handler
//! let consultation = orchestrator.consult(Role::Cardiologist, Some(&report)).await?;
//! ```
//!
//! For the multidisciplinary team the upstream findings are the fixed
//! [`SpecialistFindings::demo`] texts, not outputs of earlier specialist runs.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    agent::{Agent, Report, SpecialistFindings},
    error::{ConsultError, Result},
    oracle::GenerationOracle,
    role::Role,
};

/// Lifecycle of a single consultation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Done,
    Failed(String),
}

/// Outcome of one orchestrated run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    pub role: Role,
    pub prompt: String,
    pub output: String,
    pub status: RunStatus,
}

impl Consultation {
    pub fn heading(&self) -> &'static str {
        self.role.heading()
    }
}

/// Drives one consultation per call against a shared oracle.
#[derive(Clone)]
pub struct Orchestrator {
    oracle: Arc<dyn GenerationOracle>,
    findings: SpecialistFindings,
}

impl Orchestrator {
    pub fn new(oracle: Arc<dyn GenerationOracle>) -> Self {
        Self {
            oracle,
            findings: SpecialistFindings::demo(),
        }
    }

    /// Build the agent the caller selected without running it.
    pub fn agent_for(&self, role: Role, report: Option<&Report>) -> Result<Agent> {
        match role {
            Role::MultidisciplinaryTeam => Ok(Agent::MultidisciplinaryTeam {
                upstream: self.findings.clone(),
            }),
            specialist => {
                let report = report.ok_or_else(|| {
                    ConsultError::MissingInput(format!(
                        "Upload a medical report before running the {} agent",
                        specialist
                    ))
                })?;
                Agent::specialist(specialist, report.clone())
            }
        }
    }

    /// Run `role` once. Specialists need `report`; the synthesis role ignores it.
    pub async fn consult(&self, role: Role, report: Option<&Report>) -> Result<Consultation> {
        let agent = self.agent_for(role, report)?;

        match agent.run_detailed(self.oracle.as_ref()).await {
            Ok(output) => {
                info!(role = %role, "Consultation completed");
                Ok(Consultation {
                    role: output.role,
                    prompt: output.prompt,
                    output: output.text,
                    status: RunStatus::Done,
                })
            }
            Err(e) => {
                error!(role = %role, error = %e, "Consultation failed");
                Err(e)
            }
        }
    }

    /// Like [`Orchestrator::consult`], for a role name that has not been parsed yet.
    pub async fn consult_named(
        &self,
        role_name: &str,
        report: Option<&Report>,
    ) -> Result<Consultation> {
        let role: Role = role_name.parse()?;
        self.consult(role, report).await
    }
}
