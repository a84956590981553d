use std::cell::RefCell;
use std::rc::Rc;

use gloo::events::EventListener;
use gloo::timers::callback::Timeout;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, HtmlDetailsElement, HtmlInputElement, KeyboardEvent};

use eventdesk_core::search::BlockEntry;
use eventdesk_core::{plan_search, PanelMemory, SearchMode, SearchPlan, StationEntry};

use crate::app_runtime;
use crate::diag;
use crate::dom;
use crate::panels::{self, SEARCH_HELD_ATTR};
use crate::web_store;

struct BlockDom {
    element: Element,
    panel: Option<HtmlDetailsElement>,
    reservations: Vec<Element>,
}

struct StationDom {
    element: Element,
    blocks: Vec<BlockDom>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PanelRef {
    Station(usize),
    Block(usize, usize),
}

impl PanelRef {
    fn key(self) -> String {
        match self {
            Self::Station(station) => format!("station:{station}"),
            Self::Block(station, block) => format!("block:{station}:{block}"),
        }
    }

    fn parse(key: &str) -> Option<Self> {
        let mut parts = key.split(':');
        match (parts.next()?, parts.next(), parts.next()) {
            ("station", Some(station), None) => Some(Self::Station(station.parse().ok()?)),
            ("block", Some(station), Some(block)) => {
                Some(Self::Block(station.parse().ok()?, block.parse().ok()?))
            }
            _ => None,
        }
    }
}

fn label_text(element: &Element, fallback_attr: &str) -> String {
    if let Some(text) = dom::data(element, "search-text") {
        return text;
    }
    if let Some(label) = dom::query_in(element, "[data-search-label]") {
        return dom::text(&label);
    }
    dom::data(element, fallback_attr).unwrap_or_default()
}

fn block_panel(block: &Element) -> Option<HtmlDetailsElement> {
    if let Some(details) = block.dyn_ref::<HtmlDetailsElement>() {
        return Some(details.clone());
    }
    dom::query_in(block, "details")?.dyn_into::<HtmlDetailsElement>().ok()
}

fn index_page(root: &Element) -> (Vec<StationDom>, Vec<StationEntry>) {
    let mut stations = Vec::new();
    let mut entries = Vec::new();
    for station in dom::query_all_in(root, "[data-search-station]") {
        let mut blocks = Vec::new();
        let mut block_entries = Vec::new();
        for block in dom::query_all_in(&station, "[data-search-block]") {
            let reservations = dom::query_all_in(&block, "[data-search-reservation]");
            block_entries.push(BlockEntry {
                text: label_text(&block, "block-label"),
                reservations: reservations.iter().map(dom::text).collect(),
            });
            blocks.push(BlockDom {
                panel: block_panel(&block),
                element: block,
                reservations,
            });
        }
        entries.push(StationEntry {
            text: label_text(&station, "station-name"),
            blocks: block_entries,
        });
        stations.push(StationDom {
            element: station,
            blocks,
        });
    }
    (stations, entries)
}

struct SearchController {
    input: HtmlInputElement,
    status: Option<Element>,
    stations: Vec<StationDom>,
    entries: Vec<StationEntry>,
    memory: RefCell<PanelMemory>,
    storage_scope: String,
}

impl SearchController {
    fn expand_station(&self, index: usize, station: &StationDom) {
        let was_open = !panels::is_station_collapsed(&station.element);
        self.memory
            .borrow_mut()
            .capture(&PanelRef::Station(index).key(), was_open);
        panels::show_station_collapsed(&station.element, false);
    }

    fn open_panel(&self, at: PanelRef, panel: &HtmlDetailsElement) {
        self.memory.borrow_mut().capture(&at.key(), panel.open());
        let _ = panel.set_attribute(SEARCH_HELD_ATTR, "");
        panel.set_open(true);
    }

    fn show_everything(&self) {
        for station in &self.stations {
            dom::set_hidden(&station.element, false);
            for block in &station.blocks {
                dom::set_hidden(&block.element, false);
                for reservation in &block.reservations {
                    dom::set_hidden(reservation, false);
                }
            }
        }
    }

    /// Puts every panel the filter opened back the way the user left it.
    fn restore_panels(&self) {
        let saved = self.memory.borrow_mut().take_restore();
        for (key, was_open) in saved {
            match PanelRef::parse(&key) {
                Some(PanelRef::Station(index)) => {
                    if let Some(station) = self.stations.get(index) {
                        panels::show_station_collapsed(&station.element, !was_open);
                    }
                }
                Some(PanelRef::Block(station, block)) => {
                    let panel = self
                        .stations
                        .get(station)
                        .and_then(|station| station.blocks.get(block))
                        .and_then(|block| block.panel.clone());
                    if let Some(panel) = panel {
                        panel.set_open(was_open);
                        // the toggle event fires as a task; release the hold after it
                        Timeout::new(0, move || {
                            let _ = panel.remove_attribute(SEARCH_HELD_ATTR);
                        })
                        .forget();
                    }
                }
                None => diag::warn("search", format!("unknown panel key {key}")),
            }
        }
    }

    fn apply_plan(&self, plan: &SearchPlan) {
        for (index, (station, station_plan)) in self.stations.iter().zip(&plan.stations).enumerate() {
            dom::set_hidden(&station.element, !station_plan.visible);
            if station_plan.expand {
                self.expand_station(index, station);
            }
            for (block_index, (block, block_plan)) in
                station.blocks.iter().zip(&station_plan.blocks).enumerate()
            {
                dom::set_hidden(&block.element, !block_plan.visible);
                if block_plan.expand {
                    if let Some(panel) = &block.panel {
                        self.open_panel(PanelRef::Block(index, block_index), panel);
                    }
                }
                for (reservation, shown) in block.reservations.iter().zip(&block_plan.reservations) {
                    dom::set_hidden(reservation, !shown);
                }
            }
        }
    }

    fn set_status(&self, text: &str) {
        if let Some(status) = &self.status {
            dom::set_text(status, text);
            dom::set_hidden(status, text.is_empty());
        }
    }

    fn run(&self, query: &str) {
        match plan_search(query, &self.entries) {
            SearchMode::Inactive { hint } => {
                self.show_everything();
                self.restore_panels();
                self.set_status(hint.unwrap_or(""));
            }
            SearchMode::Active(plan) => {
                self.apply_plan(&plan);
                self.set_status(&plan.status());
                diag::debug("search", plan.status());
            }
        }
    }

    fn run_current(&self) {
        let query = self.input.value();
        web_store::report(
            "search",
            web_store::session_store().set_search_query(&self.storage_scope, &query),
        );
        self.run(&query);
    }

    fn clear(&self) {
        self.input.set_value("");
        self.run_current();
    }
}

thread_local! {
    static SEARCH: RefCell<Option<Rc<SearchController>>> = RefCell::new(None);
}

fn build(root: &Element, input: HtmlInputElement) -> SearchController {
    let (stations, entries) = index_page(root);
    let config = app_runtime::page_config();
    SearchController {
        status: dom::query_in(root, "[data-search-status]").or_else(|| dom::query("[data-search-status]")),
        input,
        stations,
        entries,
        memory: RefCell::new(PanelMemory::default()),
        storage_scope: config.event_id.unwrap_or(config.path),
    }
}

pub(crate) fn install() {
    let Some(input) = dom::query("input[data-search-input]")
        .and_then(|element| element.dyn_into::<HtmlInputElement>().ok())
    else {
        return;
    };
    let root = dom::data(&input, "search-input")
        .and_then(|id| dom::by_id(&id))
        .or_else(|| dom::document().and_then(|document| document.document_element()));
    let Some(root) = root else {
        return;
    };
    let controller = Rc::new(build(&root, input.clone()));

    let handle = controller.clone();
    EventListener::new(&input, "input", move |_| handle.run_current()).forget();
    let handle = controller.clone();
    EventListener::new(&input, "keydown", move |event: &Event| {
        let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
            return;
        };
        if event.key() == "Escape" {
            handle.clear();
        }
    })
    .forget();
    for button in dom::query_all("[data-search-clear]") {
        let handle = controller.clone();
        EventListener::new(&button, "click", move |_| handle.clear()).forget();
    }

    if let Some(saved) = web_store::session_store().search_query(&controller.storage_scope) {
        controller.input.set_value(&saved);
        controller.run(&saved);
    }
    SEARCH.with(|slot| *slot.borrow_mut() = Some(controller));
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn fixture() -> (Element, SearchController) {
        let root = dom::create("div").expect("root");
        root.set_inner_html(
            r#"<input data-search-input>
               <p data-search-status hidden></p>
               <section data-search-station data-station-id="s1-t" data-station-name="Kitchen">
                 <div data-station-body>
                   <details data-search-block data-block-label="Sat 9:00 AM">
                     <summary>Sat 9:00 AM</summary>
                     <span data-search-reservation>Ann Lee</span>
                   </details>
                 </div>
               </section>
               <section data-search-station data-station-id="s2-t" data-station-name="Parking"
                        class="is-collapsed">
                 <div data-station-body hidden>
                   <details data-search-block data-block-label="Sat 9:00 AM">
                     <summary>Sat 9:00 AM</summary>
                     <span data-search-reservation>Cy Park</span>
                     <span data-search-reservation>Dee Ray</span>
                   </details>
                 </div>
               </section>"#,
        );
        dom::body().expect("body").append_child(&root).expect("append");
        let input = dom::query_in(&root, "input")
            .expect("input")
            .dyn_into::<HtmlInputElement>()
            .expect("html input");
        let controller = build(&root, input);
        (root, controller)
    }

    #[wasm_bindgen_test]
    fn panel_keys_parse_back() {
        for at in [PanelRef::Station(3), PanelRef::Block(1, 4)] {
            assert_eq!(PanelRef::parse(&at.key()), Some(at));
        }
        assert_eq!(PanelRef::parse("block:1"), None);
    }

    #[wasm_bindgen_test]
    fn reservation_match_expands_then_clearing_restores() {
        let (root, controller) = fixture();
        controller.run("cy park");
        let kitchen = &controller.stations[0];
        let parking = &controller.stations[1];
        assert!(dom::is_hidden(&kitchen.element));
        assert!(!dom::is_hidden(&parking.element));
        assert!(!panels::is_station_collapsed(&parking.element));
        let panel = parking.blocks[0].panel.as_ref().expect("details");
        assert!(panel.open());
        assert!(!dom::is_hidden(&parking.blocks[0].reservations[0]));
        assert!(dom::is_hidden(&parking.blocks[0].reservations[1]));
        let status = controller.status.as_ref().expect("status");
        assert_eq!(dom::text(status), "1 match for \"cy park\".");

        controller.run("");
        assert!(!dom::is_hidden(&kitchen.element));
        assert!(panels::is_station_collapsed(&parking.element));
        assert!(!panel.open());
        assert!(dom::is_hidden(status));
        root.remove();
    }

    #[wasm_bindgen_test]
    fn station_match_opens_its_blocks_until_cleared() {
        let (root, controller) = fixture();
        controller.run("parking");
        let parking = &controller.stations[1];
        let panel = parking.blocks[0].panel.as_ref().expect("details");
        assert!(!panels::is_station_collapsed(&parking.element));
        assert!(panel.open());
        assert_eq!(parking.blocks[0].reservations.iter().filter(|r| dom::is_hidden(r)).count(), 0);

        controller.run("");
        assert!(panels::is_station_collapsed(&parking.element));
        assert!(!panel.open());
        root.remove();
    }

    #[wasm_bindgen_test]
    fn short_query_shows_hint_and_filters_nothing() {
        let (root, controller) = fixture();
        controller.run("ki");
        assert!(controller
            .stations
            .iter()
            .all(|station| !dom::is_hidden(&station.element)));
        let status = controller.status.as_ref().expect("status");
        assert_eq!(dom::text(status), "Type at least 3 characters to search.");
        root.remove();
    }
}
