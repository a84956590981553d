pub const MIN_QUERY_CHARS: usize = 3;
pub const SHORT_QUERY_HINT: &str = "Type at least 3 characters to search.";

pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockEntry {
    pub text: String,
    pub reservations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationEntry {
    pub text: String,
    pub blocks: Vec<BlockEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPlan {
    pub visible: bool,
    pub expand: bool,
    pub reservations: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationPlan {
    pub visible: bool,
    pub expand: bool,
    /// The station itself matched, so nothing inside it is filtered.
    pub whole: bool,
    pub blocks: Vec<BlockPlan>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPlan {
    pub query: String,
    pub stations: Vec<StationPlan>,
    pub matches: usize,
}

impl SearchPlan {
    pub fn status(&self) -> String {
        match self.matches {
            0 => format!("No matches for \"{}\".", self.query),
            1 => format!("1 match for \"{}\".", self.query),
            n => format!("{n} matches for \"{}\".", self.query),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchMode {
    Inactive { hint: Option<&'static str> },
    Active(SearchPlan),
}

pub fn plan_search(raw_query: &str, stations: &[StationEntry]) -> SearchMode {
    let query = normalize_text(raw_query);
    if query.is_empty() {
        return SearchMode::Inactive { hint: None };
    }
    if query.chars().count() < MIN_QUERY_CHARS {
        return SearchMode::Inactive {
            hint: Some(SHORT_QUERY_HINT),
        };
    }
    let hit = |text: &str| normalize_text(text).contains(&query);
    let mut matches = 0;
    let stations = stations
        .iter()
        .map(|station| {
            if hit(&station.text) {
                matches += 1;
                return StationPlan {
                    visible: true,
                    expand: true,
                    whole: true,
                    blocks: station
                        .blocks
                        .iter()
                        .map(|block| BlockPlan {
                            visible: true,
                            expand: true,
                            reservations: vec![true; block.reservations.len()],
                        })
                        .collect(),
                };
            }
            let blocks: Vec<BlockPlan> = station
                .blocks
                .iter()
                .map(|block| {
                    if hit(&block.text) {
                        matches += 1;
                        return BlockPlan {
                            visible: true,
                            expand: false,
                            reservations: vec![true; block.reservations.len()],
                        };
                    }
                    let reservations: Vec<bool> =
                        block.reservations.iter().map(|text| hit(text)).collect();
                    let found = reservations.iter().filter(|shown| **shown).count();
                    matches += found;
                    BlockPlan {
                        visible: found > 0,
                        expand: found > 0,
                        reservations,
                    }
                })
                .collect();
            let visible = blocks.iter().any(|block| block.visible);
            StationPlan {
                visible,
                expand: visible,
                whole: false,
                blocks,
            }
        })
        .collect();
    SearchMode::Active(SearchPlan {
        query,
        stations,
        matches,
    })
}

/// Open/closed state of panels the filter expanded, captured the first time
/// each one is forced open and handed back once when the filter clears.
#[derive(Debug, Clone, Default)]
pub struct PanelMemory {
    saved: Vec<(String, bool)>,
}

impl PanelMemory {
    pub fn capture(&mut self, panel_id: &str, was_open: bool) -> bool {
        if self.is_captured(panel_id) {
            return false;
        }
        self.saved.push((panel_id.to_string(), was_open));
        true
    }

    pub fn is_captured(&self, panel_id: &str) -> bool {
        self.saved.iter().any(|(id, _)| id == panel_id)
    }

    pub fn take_restore(&mut self) -> Vec<(String, bool)> {
        std::mem::take(&mut self.saved)
    }
}
