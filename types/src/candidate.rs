use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::ids::CandidateId;

/// One selectable option, whether shown in chat or listed by a widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sublabel: Option<String>,
    pub action: Action,
}

impl Candidate {
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>, action: Action) -> Self {
        Self {
            id: CandidateId::new(id),
            label: label.into(),
            sublabel: None,
            action,
        }
    }

    #[must_use]
    pub fn with_sublabel(mut self, sublabel: impl Into<String>) -> Self {
        self.sublabel = Some(sublabel.into());
        self
    }
}

/// Labels of a candidate slice, in order.
#[must_use]
pub fn labels(candidates: &[Candidate]) -> Vec<&str> {
    candidates.iter().map(|c| c.label.as_str()).collect()
}
