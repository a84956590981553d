use std::cmp::Ordering;

use chrono::NaiveDateTime;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderKind {
    Stations,
    Blocks,
}

impl ReorderKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "stations" | "station" => Some(Self::Stations),
            "blocks" | "block" => Some(Self::Blocks),
            _ => None,
        }
    }

    fn fields(&self) -> (&'static str, &'static str) {
        match self {
            Self::Stations => ("station_id", "station_order"),
            Self::Blocks => ("block_id", "item_order"),
        }
    }

    /// Endpoint for the parent resource (event for stations, station for
    /// blocks).
    pub fn endpoint(&self, parent_id: &str) -> String {
        match self {
            Self::Stations => format!("/admin/event/{parent_id}/stations/reorder"),
            Self::Blocks => format!("/admin/station/{parent_id}/blocks/reorder"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPlacement {
    Before,
    After,
}

/// Upper half of the hovered item inserts before it, lower half after.
pub fn placement_for(cursor_y: f64, item_top: f64, item_height: f64) -> DropPlacement {
    if cursor_y < item_top + item_height / 2.0 {
        DropPlacement::Before
    } else {
        DropPlacement::After
    }
}

/// Moves `dragged` next to `target` in `order`. Returns false when nothing
/// changed.
pub fn move_item(order: &mut Vec<String>, dragged: &str, target: &str, placement: DropPlacement) -> bool {
    if dragged == target {
        return false;
    }
    let Some(from) = order.iter().position(|id| id == dragged) else {
        return false;
    };
    if !order.iter().any(|id| id == target) {
        return false;
    }
    let before = order.clone();
    let item = order.remove(from);
    let Some(target_index) = order.iter().position(|id| id == target) else {
        order.insert(from, item);
        return false;
    };
    let insert_at = match placement {
        DropPlacement::Before => target_index,
        DropPlacement::After => target_index + 1,
    };
    order.insert(insert_at, item);
    *order != before
}

fn id_value(id: &str) -> Value {
    match id.trim().parse::<i64>() {
        Ok(number) => json!(number),
        Err(_) => json!(id),
    }
}

pub fn reorder_body(kind: ReorderKind, ids: &[String]) -> Value {
    let (id_field, order_field) = kind.fields();
    let order: Vec<Value> = ids
        .iter()
        .enumerate()
        .map(|(index, id)| {
            let mut entry = serde_json::Map::new();
            entry.insert(id_field.to_string(), id_value(id));
            entry.insert(order_field.to_string(), json!(index));
            Value::Object(entry)
        })
        .collect();
    json!({ "order": order })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedItem {
    pub id: String,
    pub start: Option<NaiveDateTime>,
    pub name: String,
}

/// Stable sort: earliest start first, undated items last, then name without
/// regard to case.
pub fn sort_by_time(items: &[TimedItem]) -> Vec<String> {
    let mut sorted: Vec<&TimedItem> = items.iter().collect();
    sorted.sort_by(|a, b| {
        let by_start = match (&a.start, &b.start) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_start.then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    sorted.into_iter().map(|item| item.id.clone()).collect()
}
