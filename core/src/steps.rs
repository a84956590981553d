use serde::{Deserialize, Serialize};

pub const DUPLICATE_CHECK_PATH: &str = "/manage/check-duplicate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignupStep {
    Details,
    Assign,
    Review,
}

impl SignupStep {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "1" | "details" => Some(Self::Details),
            "2" | "assign" => Some(Self::Assign),
            "3" | "review" => Some(Self::Review),
            _ => None,
        }
    }
}

/// Gate between the registrant details step and the later steps of a fresh
/// signup. Manage mode never gates.
#[derive(Debug, Clone, Default)]
pub struct StepGate {
    details_complete: bool,
}

impl StepGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open() -> Self {
        Self {
            details_complete: true,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.details_complete
    }

    pub fn is_visible(&self, step: SignupStep) -> bool {
        match step {
            SignupStep::Details => true,
            SignupStep::Assign | SignupStep::Review => self.details_complete,
        }
    }

    pub fn complete(&mut self) {
        self.details_complete = true;
    }

    /// Returns true when the later steps were visible and must now hide.
    pub fn invalidate(&mut self) -> bool {
        std::mem::replace(&mut self.details_complete, false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheckRequest {
    pub event_id: String,
    pub email: String,
    #[serde(rename = "_csrf")]
    pub csrf: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheckResponse {
    #[serde(default)]
    pub duplicate: bool,
    #[serde(default)]
    pub manage_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateOutcome {
    Clear,
    Existing { manage_url: Option<String> },
}

impl DuplicateOutcome {
    /// Any failure to ask or to understand the answer counts as no duplicate so
    /// a flaky network never blocks a legitimate signup.
    pub fn from_result<E>(result: Result<DuplicateCheckResponse, E>) -> Self {
        match result {
            Ok(response) if response.duplicate => Self::Existing {
                manage_url: response.manage_url.filter(|url| !url.trim().is_empty()),
            },
            _ => Self::Clear,
        }
    }

    pub fn message(&self) -> Option<&'static str> {
        match self {
            Self::Clear => None,
            Self::Existing { .. } => Some(
                "You are already registered for this event with that email. Use the link from your confirmation email to update your registration.",
            ),
        }
    }
}
