use chrono::{DateTime, Utc};
use consult_flow::{ConsultSession, Consultation, Role, RunStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadReportRequest {
    pub report: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsultRequest {
    pub role: String,
}

/// Browser form posted by the trigger button
#[derive(Debug, Deserialize)]
pub struct ConsultForm {
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsultResponse {
    pub session_id: String,
    pub role: Role,
    pub heading: String,
    pub prompt: String,
    pub output: String,
    pub status: RunStatus,
}

impl ConsultResponse {
    pub fn new(session_id: &str, consultation: Consultation) -> Self {
        Self {
            session_id: session_id.to_string(),
            role: consultation.role,
            heading: consultation.heading().to_string(),
            prompt: consultation.prompt,
            output: consultation.output,
            status: consultation.status,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub has_report: bool,
    pub status: RunStatus,
    pub last_role: Option<Role>,
    pub heading: Option<String>,
    pub output: Option<String>,
    pub selectable_roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ConsultSession> for SessionResponse {
    fn from(session: &ConsultSession) -> Self {
        Self {
            session_id: session.id.clone(),
            has_report: session.has_report(),
            status: session.status.clone(),
            last_role: session.last.as_ref().map(|c| c.role),
            heading: session.last.as_ref().map(|c| c.heading().to_string()),
            output: session.last.as_ref().map(|c| c.output.clone()),
            selectable_roles: if session.has_report() {
                Role::selectable().to_vec()
            } else {
                Vec::new()
            },
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}
