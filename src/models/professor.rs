// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Candidate professors and email drafts (wizard state, never persisted).

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A professor returned by the matching service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Professor {
    pub id: String,
    pub name: String,
    pub department: String,
    pub research_areas: Vec<String>,
    pub email: String,
    /// Free-form context passed back to the drafting service
    pub additional_data: Vec<String>,
}

/// An editable proposed email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
    /// Recipient override; the professor's email when absent
    pub to: Option<String>,
}

impl EmailDraft {
    /// Recipient address, falling back to the professor's email.
    pub fn recipient<'a>(&'a self, professor: &'a Professor) -> &'a str {
        self.to
            .as_deref()
            .filter(|to| !to.trim().is_empty())
            .unwrap_or(&professor.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn professor() -> Professor {
        Professor {
            id: "p1".to_string(),
            name: "Ada Lovelace".to_string(),
            department: "Mathematics".to_string(),
            research_areas: vec!["Analytical engines".to_string()],
            email: "ada@example.edu".to_string(),
            additional_data: vec![],
        }
    }

    #[test]
    fn test_recipient_defaults_to_professor_email() {
        let professor = professor();
        let mut draft = EmailDraft::default();
        assert_eq!(draft.recipient(&professor), "ada@example.edu");

        draft.to = Some("   ".to_string());
        assert_eq!(draft.recipient(&professor), "ada@example.edu");

        draft.to = Some("office@example.edu".to_string());
        assert_eq!(draft.recipient(&professor), "office@example.edu");
    }
}
