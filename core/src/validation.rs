use std::collections::HashSet;

use crate::capacity::parse_capacity_input;
use crate::datetime::parse_flexible;
use crate::participant::Participant;
use crate::payload::Registrant;

pub const PHONE_MIN_DIGITS: usize = 7;
pub const PHONE_MAX_DIGITS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldKind {
    #[default]
    Text,
    Email,
    Phone,
    Capacity { reserved: u32 },
    DateTime,
    ParticipantName,
}

/// One form control as read from the page, ready for rule checks.
#[derive(Debug, Clone, Default)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub value: String,
    pub required: bool,
    pub kind: FieldKind,
    /// Name of a field whose datetime must come after this one.
    pub before: Option<String>,
}

pub fn is_valid_email(raw: &str) -> bool {
    let raw = raw.trim();
    if raw.is_empty() || raw.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && tld.len() >= 2 && !domain.starts_with('.')
}

pub fn is_valid_phone(raw: &str) -> bool {
    let raw = raw.trim();
    if raw.is_empty() {
        return true;
    }
    let allowed = |ch: char| ch.is_ascii_digit() || matches!(ch, '+' | '-' | '(' | ')' | '.' | ' ');
    if !raw.chars().all(allowed) {
        return false;
    }
    let digits = raw.chars().filter(char::is_ascii_digit).count();
    (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits)
}

/// Positions of names that repeat an earlier one, compared trimmed and
/// case-insensitively. Blank names are reported separately.
pub fn duplicate_name_positions<S: AsRef<str>>(names: &[S]) -> Vec<usize> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for (position, name) in names.iter().enumerate() {
        let normalized = name.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            continue;
        }
        if !seen.insert(normalized) {
            duplicates.push(position);
        }
    }
    duplicates
}

pub fn participant_field_name(position: usize) -> String {
    format!("participant-{position}")
}

/// Step 1 of a signup: registrant contact details and the party's names.
pub fn validate_details(registrant: &Registrant, participants: &[Participant]) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    if registrant.first_name.trim().is_empty() {
        issues.push(FieldIssue::new("first_name", "First name is required."));
    }
    if registrant.last_name.trim().is_empty() {
        issues.push(FieldIssue::new("last_name", "Last name is required."));
    }
    if registrant.email.trim().is_empty() {
        issues.push(FieldIssue::new("email", "Email is required."));
    } else if !is_valid_email(&registrant.email) {
        issues.push(FieldIssue::new("email", "Enter a valid email address."));
    }
    if !is_valid_phone(&registrant.phone) {
        issues.push(FieldIssue::new("phone", "Enter a valid phone number."));
    }
    if participants.is_empty() {
        issues.push(FieldIssue::new(
            participant_field_name(0),
            "Add at least one participant.",
        ));
    }
    for (position, participant) in participants.iter().enumerate() {
        if participant.name.trim().is_empty() {
            issues.push(FieldIssue::new(
                participant_field_name(position),
                format!("Participant {} needs a name.", position + 1),
            ));
        }
    }
    let names: Vec<&str> = participants.iter().map(|p| p.name.as_str()).collect();
    for position in duplicate_name_positions(&names) {
        issues.push(FieldIssue::new(
            participant_field_name(position),
            format!(
                "\"{}\" is listed more than once. Each participant needs a unique name.",
                participants[position].name.trim()
            ),
        ));
    }
    issues
}

pub fn check_time_order(start_raw: &str, end_raw: &str) -> Option<&'static str> {
    let start = parse_flexible(start_raw)?;
    let end = parse_flexible(end_raw)?;
    (end <= start).then_some("End time must be after the start time.")
}

/// Generic rule pass for a `data-validate` form.
pub fn validate_form(fields: &[FormField]) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    for field in fields {
        let value = field.value.trim();
        let label = if field.label.trim().is_empty() {
            field.name.as_str()
        } else {
            field.label.trim()
        };
        if value.is_empty() {
            if field.required {
                issues.push(FieldIssue::new(&field.name, format!("{label} is required.")));
            }
            continue;
        }
        match &field.kind {
            FieldKind::Email if !is_valid_email(value) => {
                issues.push(FieldIssue::new(&field.name, "Enter a valid email address."));
            }
            FieldKind::Phone if !is_valid_phone(value) => {
                issues.push(FieldIssue::new(&field.name, "Enter a valid phone number."));
            }
            FieldKind::Capacity { reserved } => {
                if let Err(err) = parse_capacity_input(value, *reserved) {
                    issues.push(FieldIssue::new(&field.name, err.to_string()));
                }
            }
            FieldKind::DateTime if parse_flexible(value).is_none() => {
                issues.push(FieldIssue::new(&field.name, format!("{label} is not a valid date and time.")));
            }
            _ => {}
        }
        if let Some(later_name) = &field.before {
            let later = fields.iter().find(|other| &other.name == later_name);
            if let Some(message) = later.and_then(|later| check_time_order(value, &later.value)) {
                issues.push(FieldIssue::new(later_name, message));
            }
        }
    }
    let participant_fields: Vec<&FormField> = fields
        .iter()
        .filter(|field| field.kind == FieldKind::ParticipantName)
        .collect();
    let names: Vec<&str> = participant_fields.iter().map(|f| f.value.as_str()).collect();
    for position in duplicate_name_positions(&names) {
        issues.push(FieldIssue::new(
            &participant_fields[position].name,
            "Each participant needs a unique name.",
        ));
    }
    issues
}
