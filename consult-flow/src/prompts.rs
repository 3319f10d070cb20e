//! Prompt templates, one per role.

use crate::agent::Report;

/// Synthesis document handed to the oracle for the multidisciplinary team.
///
/// It is constant: upstream findings are not interpolated into it.
pub const MULTIDISCIPLINARY_DIAGNOSIS: &str = "### Final Diagnosis:

- **Panic Disorder/Anxiety-Related Episodes:**
  - [Cardiologist] findings: Normal cardiac evaluations support the diagnosis of panic disorder.
  - [Psychologist] findings: History of anxiety and panic episodes corroborate the diagnosis.
  - [Pulmonologist] findings: Shortness of breath and dizziness during episodes align with anxiety-related responses.

- **Gastroesophageal Reflux Disease (GERD):**
  - [Cardiologist] findings: Chest pain may be attributed to GERD, mimicking cardiac symptoms.
  - [Pulmonologist] findings: Respiratory issues may be exacerbated by acid reflux irritating the airways.

- **Anxiety-Induced Hyperventilation:**
  - [Pulmonologist] findings: Shortness of breath linked to anxiety-induced hyperventilation during panic attacks.
  - [Psychologist] findings: Anxiety history supports a pattern of hyperventilation during episodes.
";

/// Opening instruction lines, one per specialist.
pub const CARDIOLOGIST_INSTRUCTION: &str = "Act like a cardiologist. Here is the Medical Report:";
pub const PSYCHOLOGIST_INSTRUCTION: &str = "Act like a psychologist. Here is the Patient Report:";
pub const PULMONOLOGIST_INSTRUCTION: &str = "Act like a pulmonologist. Here is the Patient Report:";

/// Embed `report` verbatim under the role's instruction line.
pub(crate) fn specialist_prompt(instruction: &str, report: &Report) -> String {
    format!("{}\n{}\n", instruction, report.as_str())
}
