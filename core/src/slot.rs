use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::datetime::{format_time_range, intervals_overlap, parse_flexible};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    #[default]
    TimeBlock,
    Potluck,
}

impl SlotKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "potluck" | "item" => Self::Potluck,
            _ => Self::TimeBlock,
        }
    }
}

/// A schedulable unit as rendered by the server: a volunteer shift or a
/// potluck item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub block_id: String,
    pub station_name: String,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub capacity: Option<i64>,
    pub reserved: u32,
    pub item_title: Option<String>,
    pub kind: SlotKind,
    pub dish_required: bool,
}

/// Raw attribute values read off one slot element, before interpretation.
#[derive(Debug, Clone, Default)]
pub struct SlotAttributes {
    pub block_id: String,
    pub station_name: String,
    pub start: String,
    pub end: String,
    pub capacity: String,
    pub reserved: String,
    pub item_title: String,
    pub kind: String,
    pub dish_required: String,
}

impl Slot {
    pub fn time_block(block_id: impl Into<String>, station_name: impl Into<String>) -> Self {
        Self {
            block_id: block_id.into(),
            station_name: station_name.into(),
            start: None,
            end: None,
            capacity: None,
            reserved: 0,
            item_title: None,
            kind: SlotKind::TimeBlock,
            dish_required: false,
        }
    }

    pub fn from_attributes(attrs: &SlotAttributes) -> Option<Self> {
        let block_id = attrs.block_id.trim();
        if block_id.is_empty() {
            return None;
        }
        let item_title = attrs.item_title.trim();
        Some(Self {
            block_id: block_id.to_string(),
            station_name: attrs.station_name.trim().to_string(),
            start: parse_flexible(&attrs.start),
            end: parse_flexible(&attrs.end),
            capacity: attrs.capacity.trim().parse::<i64>().ok(),
            reserved: attrs.reserved.trim().parse::<u32>().unwrap_or(0),
            item_title: (!item_title.is_empty()).then(|| item_title.to_string()),
            kind: SlotKind::parse(&attrs.kind),
            dish_required: matches!(
                attrs.dish_required.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "required"
            ),
        })
    }

    pub fn with_times(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn with_capacity(mut self, capacity: i64, reserved: u32) -> Self {
        self.capacity = Some(capacity);
        self.reserved = reserved;
        self
    }

    /// `None` means unlimited; zero and negative capacities are unlimited too.
    pub fn capacity_limit(&self) -> Option<u32> {
        match self.capacity {
            Some(capacity) if capacity > 0 => Some(u32::try_from(capacity).unwrap_or(u32::MAX)),
            _ => None,
        }
    }

    pub fn is_potluck(&self) -> bool {
        self.kind == SlotKind::Potluck
    }

    pub fn overlaps(&self, start: Option<&NaiveDateTime>, end: Option<&NaiveDateTime>) -> bool {
        match (self.start.as_ref(), self.end.as_ref(), start, end) {
            (Some(a_start), Some(a_end), Some(b_start), Some(b_end)) => {
                intervals_overlap(a_start, a_end, b_start, b_end)
            }
            _ => false,
        }
    }

    pub fn label(&self) -> String {
        let title = match (&self.kind, &self.item_title) {
            (SlotKind::Potluck, Some(title)) => title.clone(),
            _ => self.station_name.clone(),
        };
        let range = format_time_range(self.start.as_ref(), self.end.as_ref());
        if range.is_empty() {
            title
        } else {
            format!("{title} · {range}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_attributes_parses_typed_fields() {
        let attrs = SlotAttributes {
            block_id: "17".into(),
            station_name: " Kitchen ".into(),
            start: "2025-06-01 09:00".into(),
            end: "2025-06-01T10:00".into(),
            capacity: "3".into(),
            reserved: "1".into(),
            ..SlotAttributes::default()
        };
        let slot = Slot::from_attributes(&attrs).expect("slot");
        assert_eq!(slot.block_id, "17");
        assert_eq!(slot.station_name, "Kitchen");
        assert_eq!(slot.capacity_limit(), Some(3));
        assert_eq!(slot.reserved, 1);
        assert!(slot.start.is_some() && slot.end.is_some());
        assert_eq!(slot.kind, SlotKind::TimeBlock);
    }

    #[test]
    fn missing_block_id_is_skipped() {
        assert!(Slot::from_attributes(&SlotAttributes::default()).is_none());
    }

    #[test]
    fn non_positive_capacity_is_unlimited() {
        let slot = Slot::time_block("1", "Gate").with_capacity(0, 4);
        assert_eq!(slot.capacity_limit(), None);
        let slot = Slot::time_block("1", "Gate").with_capacity(-2, 0);
        assert_eq!(slot.capacity_limit(), None);
    }

    #[test]
    fn potluck_flags_are_read() {
        let attrs = SlotAttributes {
            block_id: "p1".into(),
            station_name: "Potluck".into(),
            item_title: "Salad".into(),
            kind: "potluck".into(),
            dish_required: "true".into(),
            ..SlotAttributes::default()
        };
        let slot = Slot::from_attributes(&attrs).expect("slot");
        assert!(slot.is_potluck());
        assert!(slot.dish_required);
        assert_eq!(slot.label(), "Salad");
    }
}
