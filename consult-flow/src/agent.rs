use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::{
    error::{ConsultError, Result},
    oracle::{GenerationConfig, GenerationOracle},
    prompts::{
        CARDIOLOGIST_INSTRUCTION, MULTIDISCIPLINARY_DIAGNOSIS, PSYCHOLOGIST_INSTRUCTION,
        PULMONOLOGIST_INSTRUCTION, specialist_prompt,
    },
    role::Role,
};

/// Unstructured report text: an uploaded document or a specialist finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report(String);

impl Report {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for Report {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for Report {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Findings from each specialist, consumed by the multidisciplinary team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialistFindings {
    pub cardiologist: Report,
    pub psychologist: Report,
    pub pulmonologist: Report,
}

impl SpecialistFindings {
    pub fn new(cardiologist: Report, psychologist: Report, pulmonologist: Report) -> Self {
        Self {
            cardiologist,
            psychologist,
            pulmonologist,
        }
    }

    /// Fixed illustrative findings the browser demo feeds the synthesis role.
    pub fn demo() -> Self {
        Self::new(
            "Normal cardiac evaluations, no arrhythmias detected.".into(),
            "History of panic attacks, anxiety during stressful situations.".into(),
            "No signs of COPD; episodes linked to hyperventilation during stress.".into(),
        )
    }

    pub fn get(&self, role: Role) -> Option<&Report> {
        match role {
            Role::Cardiologist => Some(&self.cardiologist),
            Role::Psychologist => Some(&self.psychologist),
            Role::Pulmonologist => Some(&self.pulmonologist),
            Role::MultidisciplinaryTeam => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &Report)> {
        Role::SPECIALISTS
            .into_iter()
            .filter_map(move |role| self.get(role).map(|report| (role, report)))
    }
}

/// One unit of work: a role bound to the report data it needs.
///
/// Built fresh for every request and dropped after a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Agent {
    Cardiologist { report: Report },
    Psychologist { report: Report },
    Pulmonologist { report: Report },
    MultidisciplinaryTeam { upstream: SpecialistFindings },
}

/// Prompt and generated text from a single agent run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub role: Role,
    pub prompt: String,
    pub text: String,
}

impl Agent {
    pub fn cardiologist(report: impl Into<Report>) -> Self {
        Agent::Cardiologist {
            report: report.into(),
        }
    }

    pub fn psychologist(report: impl Into<Report>) -> Self {
        Agent::Psychologist {
            report: report.into(),
        }
    }

    pub fn pulmonologist(report: impl Into<Report>) -> Self {
        Agent::Pulmonologist {
            report: report.into(),
        }
    }

    pub fn multidisciplinary_team(
        cardiologist_report: impl Into<Report>,
        psychologist_report: impl Into<Report>,
        pulmonologist_report: impl Into<Report>,
    ) -> Self {
        Agent::MultidisciplinaryTeam {
            upstream: SpecialistFindings::new(
                cardiologist_report.into(),
                psychologist_report.into(),
                pulmonologist_report.into(),
            ),
        }
    }

    /// Bind a specialist role to its report.
    pub fn specialist(role: Role, report: Report) -> Result<Self> {
        match role {
            Role::Cardiologist => Ok(Agent::Cardiologist { report }),
            Role::Psychologist => Ok(Agent::Psychologist { report }),
            Role::Pulmonologist => Ok(Agent::Pulmonologist { report }),
            Role::MultidisciplinaryTeam => Err(ConsultError::MissingInput(
                "MultidisciplinaryTeam needs specialist findings, not a single report".to_string(),
            )),
        }
    }

    /// Build an agent from an untyped role name.
    ///
    /// Unknown names fail with `InvalidRole` here, before any prompt exists.
    /// Specialists need `primary_report`; the synthesis role needs `upstream`.
    pub fn from_parts(
        role_name: &str,
        primary_report: Option<Report>,
        upstream: Option<SpecialistFindings>,
    ) -> Result<Self> {
        let role: Role = role_name.parse()?;
        match role {
            Role::MultidisciplinaryTeam => upstream
                .map(|upstream| Agent::MultidisciplinaryTeam { upstream })
                .ok_or_else(|| {
                    ConsultError::MissingInput(format!("{} needs specialist findings", role))
                }),
            specialist => {
                let report = primary_report.ok_or_else(|| {
                    ConsultError::MissingInput(format!("{} needs a report", specialist))
                })?;
                Agent::specialist(specialist, report)
            }
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Agent::Cardiologist { .. } => Role::Cardiologist,
            Agent::Psychologist { .. } => Role::Psychologist,
            Agent::Pulmonologist { .. } => Role::Pulmonologist,
            Agent::MultidisciplinaryTeam { .. } => Role::MultidisciplinaryTeam,
        }
    }

    pub fn primary_report(&self) -> Option<&Report> {
        match self {
            Agent::Cardiologist { report }
            | Agent::Psychologist { report }
            | Agent::Pulmonologist { report } => Some(report),
            Agent::MultidisciplinaryTeam { .. } => None,
        }
    }

    pub fn upstream_reports(&self) -> Option<&SpecialistFindings> {
        match self {
            Agent::MultidisciplinaryTeam { upstream } => Some(upstream),
            _ => None,
        }
    }

    /// Compose the prompt for this agent. Pure: same agent, same bytes.
    pub fn create_prompt(&self) -> String {
        match self {
            Agent::Cardiologist { report } => specialist_prompt(CARDIOLOGIST_INSTRUCTION, report),
            Agent::Psychologist { report } => specialist_prompt(PSYCHOLOGIST_INSTRUCTION, report),
            Agent::Pulmonologist { report } => specialist_prompt(PULMONOLOGIST_INSTRUCTION, report),
            Agent::MultidisciplinaryTeam { .. } => MULTIDISCIPLINARY_DIAGNOSIS.to_string(),
        }
    }

    /// Hand `prompt` to the oracle with the fixed decoding configuration.
    pub async fn generate(oracle: &dyn GenerationOracle, prompt: &str) -> Result<String> {
        oracle.generate(prompt, &GenerationConfig::FIXED).await
    }

    /// Compose the prompt, generate, and keep both.
    pub async fn run_detailed(&self, oracle: &dyn GenerationOracle) -> Result<AgentOutput> {
        let role = self.role();
        info!(role = %role, oracle = oracle.name(), "Running {} agent...", role);

        let prompt = self.create_prompt();
        debug!(role = %role, prompt_len = prompt.len(), "Prompt composed");

        let text = Self::generate(oracle, &prompt).await?;
        debug!(role = %role, output_len = text.len(), "Generation finished");

        Ok(AgentOutput { role, prompt, text })
    }

    pub async fn run(&self, oracle: &dyn GenerationOracle) -> Result<String> {
        self.run_detailed(oracle).await.map(|output| output.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const CHEST_PAIN: &str = "Patient presents with chest pain and shortness of breath.";

    #[derive(Default)]
    struct RecordingOracle {
        calls: Mutex<Vec<(String, GenerationConfig)>>,
    }

    #[async_trait]
    impl GenerationOracle for RecordingOracle {
        fn name(&self) -> &str {
            "recording"
        }

        async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), config.clone()));
            Ok(format!("{}The findings are unremarkable.", prompt))
        }
    }

    struct FailingOracle;

    #[async_trait]
    impl GenerationOracle for FailingOracle {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate(&self, _prompt: &str, _config: &GenerationConfig) -> Result<String> {
            Err(ConsultError::OracleError("model not loaded".to_string()))
        }
    }

    #[test]
    fn cardiologist_prompt_is_exact() {
        let agent = Agent::cardiologist(CHEST_PAIN);
        assert_eq!(
            agent.create_prompt(),
            "Act like a cardiologist. Here is the Medical Report:\nPatient presents with chest pain and shortness of breath.\n"
        );
    }

    #[test]
    fn specialist_prompts_embed_report_verbatim() {
        let reports = [
            "",
            "Line one\nLine two\n",
            "Unicode: café – 心电图",
            "{report} and {} braces",
        ];
        let instructions = [
            (Role::Cardiologist, CARDIOLOGIST_INSTRUCTION),
            (Role::Psychologist, PSYCHOLOGIST_INSTRUCTION),
            (Role::Pulmonologist, PULMONOLOGIST_INSTRUCTION),
        ];
        for (role, instruction) in instructions {
            for text in reports {
                let prompt = Agent::specialist(role, Report::new(text))
                    .unwrap()
                    .create_prompt();
                assert_eq!(prompt, format!("{instruction}\n{text}\n"), "{role}");
            }
        }
    }

    #[test]
    fn multidisciplinary_prompt_is_constant() {
        let demo = Agent::MultidisciplinaryTeam {
            upstream: SpecialistFindings::demo(),
        };
        let other = Agent::multidisciplinary_team("a", "b", "c");
        assert_eq!(demo.create_prompt(), other.create_prompt());
        assert_eq!(demo.create_prompt(), demo.create_prompt());

        let prompt = demo.create_prompt();
        for header in [
            "Panic Disorder/Anxiety-Related Episodes",
            "Gastroesophageal Reflux Disease (GERD)",
            "Anxiety-Induced Hyperventilation",
        ] {
            assert!(prompt.contains(header), "missing {header}");
        }
    }

    #[test]
    fn synthesis_role_has_no_primary_report() {
        let agent = Agent::multidisciplinary_team("c", "p", "pu");
        assert_eq!(agent.role(), Role::MultidisciplinaryTeam);
        assert!(agent.primary_report().is_none());
        let upstream = agent.upstream_reports().unwrap();
        assert_eq!(upstream.get(Role::Psychologist), Some(&Report::from("p")));
        assert_eq!(upstream.iter().count(), 3);

        let specialist = Agent::pulmonologist("x");
        assert!(specialist.upstream_reports().is_none());
        assert_eq!(specialist.primary_report(), Some(&Report::from("x")));
    }

    #[test]
    fn from_parts_rejects_unknown_roles() {
        let err = Agent::from_parts("Neurologist", Some(Report::from(CHEST_PAIN)), None).unwrap_err();
        assert_eq!(err, ConsultError::InvalidRole("Neurologist".to_string()));
    }

    #[test]
    fn from_parts_requires_role_payload() {
        assert!(matches!(
            Agent::from_parts("Psychologist", None, None),
            Err(ConsultError::MissingInput(_))
        ));
        assert!(matches!(
            Agent::from_parts("MultidisciplinaryTeam", Some(Report::from("ignored")), None),
            Err(ConsultError::MissingInput(_))
        ));

        let agent = Agent::from_parts(
            "MultidisciplinaryTeam",
            Some(Report::from("ignored")),
            Some(SpecialistFindings::demo()),
        )
        .unwrap();
        assert!(agent.primary_report().is_none());
    }

    #[tokio::test]
    async fn every_role_generates_with_fixed_config() {
        let oracle = RecordingOracle::default();
        let agents = [
            Agent::cardiologist(CHEST_PAIN),
            Agent::psychologist(CHEST_PAIN),
            Agent::pulmonologist(CHEST_PAIN),
            Agent::MultidisciplinaryTeam {
                upstream: SpecialistFindings::demo(),
            },
        ];

        for agent in &agents {
            let text = agent.run(&oracle).await.unwrap();
            assert!(text.starts_with(&agent.create_prompt()));
        }

        let calls = oracle.calls.lock().unwrap();
        assert_eq!(calls.len(), agents.len());
        for (agent, (prompt, config)) in agents.iter().zip(calls.iter()) {
            assert_eq!(prompt, &agent.create_prompt());
            assert_eq!(config, &GenerationConfig::FIXED);
        }
    }

    #[tokio::test]
    async fn oracle_failures_propagate() {
        let err = Agent::cardiologist(CHEST_PAIN)
            .run(&FailingOracle)
            .await
            .unwrap_err();
        assert!(matches!(err, ConsultError::OracleError(_)));
    }
}
