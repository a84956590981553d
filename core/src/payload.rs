use serde::{Deserialize, Deserializer, Serialize};

use crate::assignment::AssignmentBook;
use crate::participant::ParticipantKey;
use crate::slot::SlotKind;

pub const PAYLOAD_FIELD_NAME: &str = "registration-payload";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registrant {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleAssignmentEntry {
    pub block_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PotluckAssignmentEntry {
    pub block_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dish_name: Option<String>,
}

/// The single JSON document written into the hidden payload input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPayload {
    #[serde(flatten)]
    pub registrant: Registrant,
    pub party_size: usize,
    pub participants: Vec<ParticipantEntry>,
    pub schedule_assignments: Vec<ScheduleAssignmentEntry>,
    pub potluck_assignments: Vec<PotluckAssignmentEntry>,
}

impl RegistrationPayload {
    pub fn build(registrant: &Registrant, book: &AssignmentBook) -> Self {
        let participants = book
            .participants()
            .iter()
            .map(|participant| ParticipantEntry {
                id: participant.key.id().map(str::to_string),
                name: participant.name.trim().to_string(),
            })
            .collect::<Vec<_>>();
        let mut schedule_assignments = Vec::new();
        let mut potluck_assignments = Vec::new();
        for assignment in book.assignments() {
            let (participant_index, participant_id) = participant_ref(&assignment.participant_key);
            match assignment.kind {
                SlotKind::TimeBlock => schedule_assignments.push(ScheduleAssignmentEntry {
                    block_id: assignment.block_id.clone(),
                    participant_index,
                    participant_id,
                }),
                SlotKind::Potluck => potluck_assignments.push(PotluckAssignmentEntry {
                    block_id: assignment.block_id.clone(),
                    participant_index,
                    participant_id,
                    dish_name: assignment.dish_name.clone(),
                }),
            }
        }
        Self {
            registrant: Registrant {
                first_name: registrant.first_name.trim().to_string(),
                last_name: registrant.last_name.trim().to_string(),
                email: registrant.email.trim().to_string(),
                phone: registrant.phone.trim().to_string(),
            },
            party_size: participants.len(),
            participants,
            schedule_assignments,
            potluck_assignments,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn participant_ref(key: &ParticipantKey) -> (Option<usize>, Option<String>) {
    match key {
        ParticipantKey::Index(index) => (Some(*index), None),
        ParticipantKey::Id(id) => (None, Some(id.clone())),
    }
}

/// Assignment the server rendered into the page for the registration being
/// edited. Ids may arrive as JSON numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedAssignment {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub block_id: String,
    #[serde(default, deserialize_with = "optional_id_from_string_or_number")]
    pub participant_id: Option<String>,
    #[serde(default)]
    pub participant_index: Option<usize>,
    #[serde(default)]
    pub dish_name: Option<String>,
}

impl SeedAssignment {
    pub fn participant_key(&self) -> Option<ParticipantKey> {
        if let Some(id) = self.participant_id.as_ref().filter(|id| !id.is_empty()) {
            return Some(ParticipantKey::Id(id.clone()));
        }
        self.participant_index.map(ParticipantKey::Index)
    }
}

pub fn parse_seed_assignments(raw: &str) -> Result<Vec<SeedAssignment>, serde_json::Error> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Int(i64),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            Self::String(value) => value,
            Self::Int(value) => value.to_string(),
        }
    }
}

fn id_from_string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(deserializer).map(StringOrNumber::into_string)
}

fn optional_id_from_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<StringOrNumber>::deserialize(deserializer)
        .map(|value| value.map(StringOrNumber::into_string))
}
