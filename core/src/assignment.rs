use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::participant::{Participant, ParticipantKey};
use crate::slot::{Slot, SlotKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationMode {
    #[default]
    Signup,
    Manage,
}

impl RegistrationMode {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("manage") {
            Self::Manage
        } else {
            Self::Signup
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub slot_id: String,
    pub block_id: String,
    pub participant_key: ParticipantKey,
    pub participant_name: String,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub station_name: String,
    pub kind: SlotKind,
    pub item_title: Option<String>,
    pub dish_name: Option<String>,
}

impl Assignment {
    pub fn slot_id_for(block_id: &str, key: &ParticipantKey) -> String {
        format!("{block_id}:{key}")
    }

    fn overlaps(&self, other: &Assignment) -> bool {
        match (&self.start, &self.end, &other.start, &other.end) {
            (Some(a_start), Some(a_end), Some(b_start), Some(b_end)) => {
                crate::datetime::intervals_overlap(a_start, a_end, b_start, b_end)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Open,
    PartiallyAssigned,
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignError {
    #[error("That slot is no longer available.")]
    UnknownSlot { block_id: String },
    #[error("Choose a participant first.")]
    UnknownParticipant { key: ParticipantKey },
    #[error("{station} is already full.")]
    CapacityReached { block_id: String, station: String },
    #[error("{station} has more sign-ups than open spots.")]
    CapacityExceeded { block_id: String, station: String },
    #[error("{participant} is already assigned to {station}.")]
    AlreadyAssigned { participant: String, station: String },
    #[error("{participant} is already signed up for {other_station} at an overlapping time.")]
    Conflict {
        participant: String,
        other_station: String,
        other_block_id: String,
    },
    #[error("Enter a dish name for {item}.")]
    DishRequired { item: String },
}

/// Client-side mirror of who is signed up for what, owned by a single
/// controller. The server re-validates everything on submit.
#[derive(Debug, Clone, Default)]
pub struct AssignmentBook {
    mode: RegistrationMode,
    slots: Vec<Slot>,
    participants: Vec<Participant>,
    assignments: Vec<Assignment>,
    /// Seeded assignments per block; the server already counts them in
    /// `reserved`.
    seeded: HashMap<String, u32>,
}

impl AssignmentBook {
    pub fn new(mode: RegistrationMode, slots: Vec<Slot>, participants: Vec<Participant>) -> Self {
        Self {
            mode,
            slots,
            participants,
            assignments: Vec::new(),
            seeded: HashMap::new(),
        }
    }

    pub fn mode(&self) -> RegistrationMode {
        self.mode
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn slot(&self, block_id: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.block_id == block_id)
    }

    pub fn participant_position(&self, key: &ParticipantKey) -> Option<usize> {
        self.participants.iter().position(|p| &p.key == key)
    }

    pub fn participant_name(&self, key: &ParticipantKey) -> String {
        match self.participant_position(key) {
            Some(position) => self.participants[position].display_name(position),
            None => key.to_string(),
        }
    }

    pub fn assignments_for_slot<'a>(
        &'a self,
        block_id: &'a str,
    ) -> impl Iterator<Item = &'a Assignment> + 'a {
        self.assignments
            .iter()
            .filter(move |assignment| assignment.block_id == block_id)
    }

    pub fn assigned_count(&self, block_id: &str) -> u32 {
        self.assignments_for_slot(block_id).count() as u32
    }

    pub fn is_assigned(&self, block_id: &str, key: &ParticipantKey) -> bool {
        self.assignments
            .iter()
            .any(|a| a.block_id == block_id && &a.participant_key == key)
    }

    fn seeded_count(&self, block_id: &str) -> u32 {
        self.seeded.get(block_id).copied().unwrap_or(0)
    }

    /// Server reservations plus local picks, without counting this
    /// registration's seeded entries twice.
    fn taken(&self, slot: &Slot) -> u32 {
        slot.reserved
            .saturating_sub(self.seeded_count(&slot.block_id))
            .saturating_add(self.assigned_count(&slot.block_id))
    }

    /// Open spots left once server reservations and local picks are counted.
    /// `None` for unlimited slots.
    pub fn remaining(&self, block_id: &str) -> Option<u32> {
        let slot = self.slot(block_id)?;
        let limit = slot.capacity_limit()?;
        Some(limit.saturating_sub(self.taken(slot)))
    }

    pub fn is_full(&self, block_id: &str) -> bool {
        self.remaining(block_id) == Some(0)
    }

    pub fn slot_status(&self, block_id: &str) -> SlotStatus {
        if self.is_full(block_id) {
            SlotStatus::Full
        } else if self.assigned_count(block_id) > 0 {
            SlotStatus::PartiallyAssigned
        } else {
            SlotStatus::Open
        }
    }

    /// First assignment of `key` elsewhere whose interval overlaps the slot.
    pub fn find_conflict(&self, key: &ParticipantKey, block_id: &str) -> Option<&Assignment> {
        let slot = self.slot(block_id)?;
        self.assignments
            .iter()
            .filter(|assignment| &assignment.participant_key == key)
            .filter(|assignment| assignment.block_id != block_id)
            .find(|assignment| slot.overlaps(assignment.start.as_ref(), assignment.end.as_ref()))
    }

    pub fn has_conflict_free_participant(&self, block_id: &str) -> bool {
        self.participants
            .iter()
            .any(|participant| self.find_conflict(&participant.key, block_id).is_none())
    }

    pub fn check_add(
        &self,
        block_id: &str,
        key: &ParticipantKey,
        dish_name: Option<&str>,
    ) -> Result<(), AssignError> {
        let slot = self.slot(block_id).ok_or_else(|| AssignError::UnknownSlot {
            block_id: block_id.to_string(),
        })?;
        if self.participant_position(key).is_none() {
            return Err(AssignError::UnknownParticipant { key: key.clone() });
        }
        let participant = self.participant_name(key);
        if self.is_assigned(block_id, key) {
            return Err(AssignError::AlreadyAssigned {
                participant,
                station: slot.label(),
            });
        }
        if self.is_full(block_id) {
            return Err(AssignError::CapacityReached {
                block_id: block_id.to_string(),
                station: slot.label(),
            });
        }
        if let Some(other) = self.find_conflict(key, block_id) {
            return Err(AssignError::Conflict {
                participant,
                other_station: other.station_name.clone(),
                other_block_id: other.block_id.clone(),
            });
        }
        let dish_missing = dish_name.map(str::trim).unwrap_or("").is_empty();
        if slot.is_potluck() && slot.dish_required && dish_missing {
            return Err(AssignError::DishRequired {
                item: slot.item_title.clone().unwrap_or_else(|| slot.station_name.clone()),
            });
        }
        Ok(())
    }

    pub fn add(
        &mut self,
        block_id: &str,
        key: &ParticipantKey,
        dish_name: Option<&str>,
    ) -> Result<&Assignment, AssignError> {
        self.check_add(block_id, key, dish_name)?;
        self.insert_unchecked(block_id, key, dish_name);
        self.sort();
        self.assignments
            .iter()
            .find(|a| a.block_id == block_id && &a.participant_key == key)
            .ok_or_else(|| AssignError::UnknownSlot {
                block_id: block_id.to_string(),
            })
    }

    /// Loads assignments the server rendered into the page. Those are already
    /// persisted, so only unknown slots and participants are skipped.
    pub fn seed<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (&'a str, ParticipantKey, Option<&'a str>)>,
    {
        for (block_id, key, dish_name) in entries {
            if self.slot(block_id).is_none()
                || self.participant_position(&key).is_none()
                || self.is_assigned(block_id, &key)
            {
                continue;
            }
            self.insert_unchecked(block_id, &key, dish_name);
            *self.seeded.entry(block_id.to_string()).or_insert(0) += 1;
        }
        self.sort();
    }

    pub fn remove(&mut self, block_id: &str, key: &ParticipantKey) -> Option<Assignment> {
        let position = self
            .assignments
            .iter()
            .position(|a| a.block_id == block_id && &a.participant_key == key)?;
        Some(self.assignments.remove(position))
    }

    pub fn rename_participant(&mut self, key: &ParticipantKey, name: &str) {
        let Some(position) = self.participant_position(key) else {
            return;
        };
        self.participants[position].name = name.to_string();
        let display = self.participants[position].display_name(position);
        for assignment in self
            .assignments
            .iter_mut()
            .filter(|assignment| &assignment.participant_key == key)
        {
            assignment.participant_name = display.clone();
        }
        self.sort();
    }

    /// Replaces the party list, dropping assignments of participants that are
    /// gone and refreshing names on the rest.
    pub fn set_participants(&mut self, participants: Vec<Participant>) {
        self.participants = participants;
        let participants = &self.participants;
        self.assignments.retain(|assignment| {
            participants
                .iter()
                .any(|participant| participant.key == assignment.participant_key)
        });
        for assignment in &mut self.assignments {
            if let Some(position) = participants
                .iter()
                .position(|participant| participant.key == assignment.participant_key)
            {
                assignment.participant_name = participants[position].display_name(position);
            }
        }
        self.sort();
    }

    /// Appends an unsaved participant keyed by its position.
    pub fn add_participant(&mut self, name: &str) -> ParticipantKey {
        let key = ParticipantKey::Index(self.participants.len());
        self.participants.push(Participant::new(key.clone(), name));
        key
    }

    /// Removes a participant and their assignments. Index keys always match
    /// list positions, so later unsaved participants shift down by one.
    pub fn remove_participant(&mut self, key: &ParticipantKey) -> bool {
        let Some(removed_at) = self.participant_position(key) else {
            return false;
        };
        self.participants.remove(removed_at);
        self.assignments
            .retain(|assignment| &assignment.participant_key != key);
        let shift = |key: &mut ParticipantKey| {
            if let ParticipantKey::Index(index) = key {
                if *index > removed_at {
                    *index -= 1;
                }
            }
        };
        for participant in &mut self.participants {
            shift(&mut participant.key);
        }
        for assignment in &mut self.assignments {
            shift(&mut assignment.participant_key);
            assignment.slot_id = Assignment::slot_id_for(&assignment.block_id, &assignment.participant_key);
        }
        let participants = &self.participants;
        for assignment in &mut self.assignments {
            if let Some(position) = participants
                .iter()
                .position(|participant| participant.key == assignment.participant_key)
            {
                assignment.participant_name = participants[position].display_name(position);
            }
        }
        self.sort();
        true
    }

    pub fn set_dish_name(&mut self, block_id: &str, key: &ParticipantKey, dish_name: &str) {
        let trimmed = dish_name.trim();
        if let Some(assignment) = self
            .assignments
            .iter_mut()
            .find(|a| a.block_id == block_id && &a.participant_key == key)
        {
            assignment.dish_name = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
    }

    /// Submit-time re-check of both invariants over the whole book.
    pub fn validate(&self) -> Vec<AssignError> {
        let mut issues = Vec::new();
        for (idx, a) in self.assignments.iter().enumerate() {
            for b in self.assignments.iter().skip(idx + 1) {
                if a.participant_key == b.participant_key && a.overlaps(b) {
                    issues.push(AssignError::Conflict {
                        participant: a.participant_name.clone(),
                        other_station: b.station_name.clone(),
                        other_block_id: b.block_id.clone(),
                    });
                }
            }
        }
        for slot in &self.slots {
            let Some(limit) = slot.capacity_limit() else {
                continue;
            };
            // an overbooked slot is only ours to fix if we added to it
            let added = self.assigned_count(&slot.block_id) > self.seeded_count(&slot.block_id);
            if added && self.taken(slot) > limit {
                issues.push(AssignError::CapacityExceeded {
                    block_id: slot.block_id.clone(),
                    station: slot.label(),
                });
            }
        }
        for assignment in &self.assignments {
            let Some(slot) = self.slot(&assignment.block_id) else {
                continue;
            };
            if slot.is_potluck() && slot.dish_required && assignment.dish_name.is_none() {
                issues.push(AssignError::DishRequired {
                    item: slot.item_title.clone().unwrap_or_else(|| slot.station_name.clone()),
                });
            }
        }
        issues
    }

    fn insert_unchecked(&mut self, block_id: &str, key: &ParticipantKey, dish_name: Option<&str>) {
        let Some(slot) = self.slot(block_id) else {
            return;
        };
        let dish_name = dish_name
            .map(str::trim)
            .filter(|dish| !dish.is_empty())
            .map(str::to_string);
        let assignment = Assignment {
            slot_id: Assignment::slot_id_for(block_id, key),
            block_id: block_id.to_string(),
            participant_key: key.clone(),
            participant_name: self.participant_name(key),
            start: slot.start,
            end: slot.end,
            station_name: slot.station_name.clone(),
            kind: slot.kind,
            item_title: slot.item_title.clone(),
            dish_name: if slot.is_potluck() { dish_name } else { None },
        };
        self.assignments.push(assignment);
    }

    fn sort(&mut self) {
        self.assignments.sort_by(compare_assignments);
    }
}

fn compare_optional_times(a: &Option<NaiveDateTime>, b: &Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_assignments(a: &Assignment, b: &Assignment) -> Ordering {
    compare_optional_times(&a.start, &b.start)
        .then_with(|| compare_optional_times(&a.end, &b.end))
        .then_with(|| {
            a.station_name
                .to_lowercase()
                .cmp(&b.station_name.to_lowercase())
        })
        .then_with(|| {
            a.participant_name
                .to_lowercase()
                .cmp(&b.participant_name.to_lowercase())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::parse_flexible;

    fn at(raw: &str) -> NaiveDateTime {
        parse_flexible(raw).expect("valid datetime")
    }

    fn book() -> AssignmentBook {
        let slots = vec![
            Slot::time_block("b2", "Gate").with_times(at("2025-06-01 11:00"), at("2025-06-01 12:00")),
            Slot::time_block("b1", "Kitchen")
                .with_times(at("2025-06-01 09:00"), at("2025-06-01 10:00")),
            Slot::time_block("b3", "Bar").with_times(at("2025-06-01 09:00"), at("2025-06-01 10:00")),
        ];
        let participants = vec![
            Participant::new(ParticipantKey::Index(0), "Zoe"),
            Participant::new(ParticipantKey::Index(1), "adam"),
        ];
        AssignmentBook::new(RegistrationMode::Signup, slots, participants)
    }

    #[test]
    fn assignments_sort_by_time_then_station_then_name() {
        let mut book = book();
        let zoe = ParticipantKey::Index(0);
        let adam = ParticipantKey::Index(1);
        book.add("b2", &zoe, None).expect("b2");
        book.add("b1", &zoe, None).expect("b1");
        book.add("b1", &adam, None).expect("b1 adam");
        let order: Vec<(&str, &str)> = book
            .assignments()
            .iter()
            .map(|a| (a.block_id.as_str(), a.participant_name.as_str()))
            .collect();
        assert_eq!(order, vec![("b1", "adam"), ("b1", "Zoe"), ("b2", "Zoe")]);
    }

    #[test]
    fn slot_id_combines_block_and_participant_key() {
        let mut book = book();
        let assignment = book.add("b1", &ParticipantKey::Index(1), None).expect("add");
        assert_eq!(assignment.slot_id, "b1:idx:1");
    }

    #[test]
    fn duplicate_pair_is_rejected() {
        let mut book = book();
        let zoe = ParticipantKey::Index(0);
        book.add("b1", &zoe, None).expect("first");
        assert!(matches!(
            book.add("b1", &zoe, None),
            Err(AssignError::AlreadyAssigned { .. })
        ));
        assert_eq!(book.assigned_count("b1"), 1);
    }

    #[test]
    fn same_time_other_station_conflicts() {
        let mut book = book();
        let zoe = ParticipantKey::Index(0);
        book.add("b1", &zoe, None).expect("first");
        let err = book.add("b3", &zoe, None).expect_err("conflict");
        assert_eq!(
            err.to_string(),
            "Zoe is already signed up for Kitchen at an overlapping time."
        );
        assert!(book.find_conflict(&ParticipantKey::Index(1), "b3").is_none());
    }

    #[test]
    fn rename_updates_existing_assignments() {
        let mut book = book();
        let zoe = ParticipantKey::Index(0);
        book.add("b1", &zoe, None).expect("add");
        book.rename_participant(&zoe, "Zoë");
        assert_eq!(book.assignments()[0].participant_name, "Zoë");
    }

    #[test]
    fn dropping_a_participant_drops_their_assignments() {
        let mut book = book();
        book.add("b1", &ParticipantKey::Index(0), None).expect("zoe");
        book.add("b1", &ParticipantKey::Index(1), None).expect("adam");
        book.set_participants(vec![Participant::new(ParticipantKey::Index(0), "Zoe")]);
        assert_eq!(book.assignments().len(), 1);
        assert_eq!(book.assignments()[0].participant_key, ParticipantKey::Index(0));
    }

    #[test]
    fn removing_a_participant_rekeys_later_rows() {
        let mut book = book();
        let third = book.add_participant("Cy");
        assert_eq!(third, ParticipantKey::Index(2));
        book.add("b1", &ParticipantKey::Index(0), None).expect("zoe");
        book.add("b2", &third, None).expect("cy");
        assert!(book.remove_participant(&ParticipantKey::Index(0)));
        assert_eq!(book.participants().len(), 2);
        assert_eq!(book.participants()[1].key, ParticipantKey::Index(1));
        assert_eq!(book.assignments().len(), 1);
        let cy = &book.assignments()[0];
        assert_eq!(cy.participant_key, ParticipantKey::Index(1));
        assert_eq!(cy.slot_id, "b2:idx:1");
        assert_eq!(cy.participant_name, "Cy");
    }

    #[test]
    fn seed_skips_unknown_entries() {
        let mut book = book();
        book.seed(vec![
            ("b1", ParticipantKey::Index(0), None),
            ("missing", ParticipantKey::Index(0), None),
            ("b2", ParticipantKey::Index(9), None),
        ]);
        assert_eq!(book.assignments().len(), 1);
    }

    #[test]
    fn required_dish_name_blocks_potluck_assignment() {
        let mut potluck = Slot::time_block("p1", "Potluck");
        potluck.kind = SlotKind::Potluck;
        potluck.item_title = Some("Dessert".into());
        potluck.dish_required = true;
        let mut book = AssignmentBook::new(
            RegistrationMode::Manage,
            vec![potluck],
            vec![Participant::new(ParticipantKey::Id("7".into()), "Lee")],
        );
        let lee = ParticipantKey::Id("7".into());
        assert_eq!(
            book.add("p1", &lee, Some("  ")).map(|_| ()),
            Err(AssignError::DishRequired {
                item: "Dessert".into()
            })
        );
        let added = book.add("p1", &lee, Some("Brownies")).expect("add");
        assert_eq!(added.dish_name.as_deref(), Some("Brownies"));
    }

    fn kitchen(capacity: i64, reserved: u32) -> Slot {
        Slot::time_block("1", "Kitchen")
            .with_times(at("2025-06-01 09:00"), at("2025-06-01 10:00"))
            .with_capacity(capacity, reserved)
    }

    #[test]
    fn conflict_outlives_the_lookup_key() {
        let mut book = book();
        book.add("b1", &ParticipantKey::Index(0), None).expect("b1");
        let conflict = {
            let zoe = ParticipantKey::Index(0);
            book.find_conflict(&zoe, "b3")
        };
        assert_eq!(conflict.map(|a| a.block_id.as_str()), Some("b1"));
    }

    #[test]
    fn untouched_overbooked_slot_does_not_block_submit() {
        let book = AssignmentBook::new(
            RegistrationMode::Signup,
            vec![kitchen(1, 2)],
            vec![Participant::new(ParticipantKey::Index(0), "Ann")],
        );
        assert!(book.validate().is_empty());
        assert!(book.is_full("1"));
    }

    #[test]
    fn seeded_entries_are_not_counted_twice() {
        let lee = ParticipantKey::Id("7".into());
        let mut book = AssignmentBook::new(
            RegistrationMode::Manage,
            vec![kitchen(2, 2)],
            vec![Participant::new(lee.clone(), "Lee")],
        );
        book.seed(vec![("1", lee.clone(), None)]);
        assert!(book.validate().is_empty());
        assert_eq!(book.remaining("1"), Some(0));

        book.remove("1", &lee).expect("seeded entry");
        assert_eq!(book.remaining("1"), Some(1));
        book.add("1", &lee, None).expect("re-add after removing");
        assert!(book.validate().is_empty());
    }
}
