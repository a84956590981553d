use crate::assignment::{AssignmentBook, SlotStatus};
use crate::participant::ParticipantKey;

/// What the user has done with one slot's participant picker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PickerChoice {
    #[default]
    Untouched,
    Placeholder,
    Chosen(ParticipantKey),
}

/// Last participant explicitly picked anywhere on the page, used as the
/// default for pickers the user has not touched yet.
#[derive(Debug, Clone, Default)]
pub struct PickerMemory {
    last_chosen: Option<ParticipantKey>,
}

impl PickerMemory {
    pub fn remember(&mut self, key: ParticipantKey) {
        self.last_chosen = Some(key);
    }

    pub fn last(&self) -> Option<&ParticipantKey> {
        self.last_chosen.as_ref()
    }

    pub fn forget(&mut self, key: &ParticipantKey) {
        if self.last_chosen.as_ref() == Some(key) {
            self.last_chosen = None;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAction {
    Assign,
    Remove,
    Full,
    Conflict,
    Unavailable,
}

impl SlotAction {
    pub fn label(&self, assign_label: &str) -> String {
        match self {
            Self::Assign => assign_label.to_string(),
            Self::Remove => "Remove".to_string(),
            Self::Full => "Full".to_string(),
            Self::Conflict => "Time conflict".to_string(),
            Self::Unavailable => "Unavailable".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerOption {
    pub key: ParticipantKey,
    pub label: String,
    pub assigned: bool,
    pub conflicted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerView {
    pub options: Vec<PickerOption>,
    pub selected: Option<ParticipantKey>,
    pub locked: bool,
    pub show_placeholder: bool,
    pub action: SlotAction,
    pub enabled: bool,
    pub status: SlotStatus,
    pub remaining: Option<u32>,
}

pub fn picker_view(
    book: &AssignmentBook,
    block_id: &str,
    choice: &PickerChoice,
    memory: &PickerMemory,
) -> Option<PickerView> {
    book.slot(block_id)?;
    let participants = book.participants();
    let options: Vec<PickerOption> = participants
        .iter()
        .enumerate()
        .map(|(position, participant)| PickerOption {
            key: participant.key.clone(),
            label: participant.display_name(position),
            assigned: book.is_assigned(block_id, &participant.key),
            conflicted: book.find_conflict(&participant.key, block_id).is_some(),
        })
        .collect();
    let known = |key: &ParticipantKey| options.iter().any(|option| &option.key == key);
    let locked = options.len() == 1;
    let selected = if locked {
        options.first().map(|option| option.key.clone())
    } else {
        match choice {
            PickerChoice::Chosen(key) if known(key) => Some(key.clone()),
            PickerChoice::Untouched => memory.last().filter(|key| known(*key)).cloned(),
            _ => None,
        }
    };
    let picked = selected
        .as_ref()
        .and_then(|key| options.iter().find(|option| &option.key == key));
    let action = match picked {
        Some(option) if option.assigned => SlotAction::Remove,
        _ if book.is_full(block_id) => SlotAction::Full,
        _ if !book.has_conflict_free_participant(block_id) => SlotAction::Unavailable,
        Some(option) if option.conflicted => SlotAction::Conflict,
        _ => SlotAction::Assign,
    };
    Some(PickerView {
        show_placeholder: !locked,
        locked,
        selected,
        enabled: matches!(action, SlotAction::Assign | SlotAction::Remove),
        action,
        status: book.slot_status(block_id),
        remaining: book.remaining(block_id),
        options,
    })
}
