//! The closed set of consultation roles.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::ConsultError;

/// Identifier selecting which prompt template an agent uses.
///
/// The set is fixed: three specialists and one synthesis role that combines
/// their findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Cardiologist,
    Psychologist,
    Pulmonologist,
    MultidisciplinaryTeam,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Cardiologist,
        Role::Psychologist,
        Role::Pulmonologist,
        Role::MultidisciplinaryTeam,
    ];

    pub const SPECIALISTS: [Role; 3] = [Role::Cardiologist, Role::Psychologist, Role::Pulmonologist];

    /// Roles offered in the browser's agent selection.
    pub fn selectable() -> [Role; 3] {
        [
            Role::Cardiologist,
            Role::Psychologist,
            Role::MultidisciplinaryTeam,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Cardiologist => "Cardiologist",
            Role::Psychologist => "Psychologist",
            Role::Pulmonologist => "Pulmonologist",
            Role::MultidisciplinaryTeam => "MultidisciplinaryTeam",
        }
    }

    /// Heading shown above the generated text.
    pub fn heading(&self) -> &'static str {
        match self {
            Role::Cardiologist => "🫀 Cardiologist Report",
            Role::Psychologist => "🧠 Psychologist Report",
            Role::Pulmonologist => "🫁 Pulmonologist Report",
            Role::MultidisciplinaryTeam => "👨‍⚕️ Multidisciplinary Final Diagnosis",
        }
    }

    /// Label of the button that triggers this role.
    pub fn trigger_label(&self) -> &'static str {
        match self {
            Role::Cardiologist => "Create Cardiologist Report",
            Role::Psychologist => "Create Psychologist Report",
            Role::Pulmonologist => "Create Pulmonologist Report",
            Role::MultidisciplinaryTeam => "Create Multidisciplinary Final Diagnosis",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ConsultError;

    /// Names match exactly, the way the browser form and API send them.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ConsultError::InvalidRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_role_name() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn rejects_unknown_roles() {
        let err = "Dermatologist".parse::<Role>().unwrap_err();
        assert_eq!(err, ConsultError::InvalidRole("Dermatologist".to_string()));
        assert!("cardiologist".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn padded_names_are_rejected_as_sent() {
        let err = " Cardiologist ".parse::<Role>().unwrap_err();
        assert_eq!(err, ConsultError::InvalidRole(" Cardiologist ".to_string()));
    }

    #[test]
    fn pulmonologist_is_not_selectable() {
        assert!(!Role::selectable().contains(&Role::Pulmonologist));
        assert!(Role::selectable().contains(&Role::MultidisciplinaryTeam));
    }
}
