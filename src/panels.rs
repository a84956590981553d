use gloo::events::{EventListener, EventListenerOptions};
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, HtmlDetailsElement};

use crate::dom;
use crate::web_store;

const COLLAPSED_CLASS: &str = "is-collapsed";
/// Set while the search filter holds a panel open, so the resulting toggle
/// event is not saved as a preference.
pub(crate) const SEARCH_HELD_ATTR: &str = "data-search-held";

pub(crate) fn station_element(station_id: &str) -> Option<Element> {
    dom::query(&format!("[data-station-id=\"{station_id}\"]"))
}

pub(crate) fn is_station_collapsed(station: &Element) -> bool {
    station.class_list().contains(COLLAPSED_CLASS)
}

/// Collapses or expands a station on screen without touching the saved
/// preference.
pub(crate) fn show_station_collapsed(station: &Element, collapsed: bool) {
    dom::set_class(station, COLLAPSED_CLASS, collapsed);
    for body in dom::query_all_in(station, "[data-station-body]") {
        dom::set_hidden(&body, collapsed);
    }
    if let Some(id) = dom::data(station, "station-id") {
        for toggle in dom::query_all(&format!("[data-collapse-station=\"{id}\"]")) {
            dom::set_bool_attr(&toggle, "aria-expanded", !collapsed);
        }
    }
}

fn toggle_station(toggle: &Element) {
    let Some(station_id) = dom::data(toggle, "collapse-station") else {
        return;
    };
    let Some(station) = station_element(&station_id) else {
        return;
    };
    let collapsed = !is_station_collapsed(&station);
    show_station_collapsed(&station, collapsed);
    web_store::report(
        "panels",
        web_store::preference_store().set_station_collapsed(&station_id, collapsed),
    );
}

pub(crate) fn panel_id(panel: &Element) -> Option<String> {
    dom::data(panel, "reservation-panel").or_else(|| {
        let id = panel.id();
        (!id.is_empty()).then_some(id)
    })
}

pub(crate) fn install() {
    let prefs = web_store::preference_store();
    let collapsed = prefs.collapsed_stations();
    for station in dom::query_all("[data-station-id]") {
        let is_collapsed = dom::data(&station, "station-id")
            .map(|id| collapsed.contains(&id))
            .unwrap_or(false);
        show_station_collapsed(&station, is_collapsed);
    }
    for toggle in dom::query_all("[data-collapse-station]") {
        let target = toggle.clone();
        EventListener::new_with_options(
            &toggle,
            "click",
            EventListenerOptions::enable_prevent_default(),
            move |event: &Event| {
                event.prevent_default();
                toggle_station(&target);
            },
        )
        .forget();
    }

    let open_panels = prefs.open_reservation_panels();
    for element in dom::query_all("details[data-reservation-panel]") {
        let Ok(panel) = element.dyn_into::<HtmlDetailsElement>() else {
            continue;
        };
        let Some(id) = panel_id(&panel) else {
            continue;
        };
        if open_panels.contains(&id) {
            panel.set_open(true);
        }
        let target = panel.clone();
        EventListener::new(&panel, "toggle", move |_| {
            if target.has_attribute(SEARCH_HELD_ATTR) {
                return;
            }
            web_store::report(
                "panels",
                web_store::preference_store().set_reservation_panel_open(&id, target.open()),
            );
        })
        .forget();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn toggling_a_station_hides_its_body_and_saves() {
        let section = dom::create("section").expect("section");
        section.set_inner_html(
            r#"<button data-collapse-station="st-t" aria-expanded="true">Kitchen</button>
               <div data-station-id="st-t"><div data-station-body>Blocks</div></div>"#,
        );
        dom::body().expect("body").append_child(&section).expect("append");
        let toggle = dom::query_in(&section, "[data-collapse-station]").expect("toggle");
        toggle_station(&toggle);

        let station = station_element("st-t").expect("station");
        assert!(is_station_collapsed(&station));
        let body = dom::query_in(&station, "[data-station-body]").expect("body");
        assert!(dom::is_hidden(&body));
        assert_eq!(toggle.get_attribute("aria-expanded").as_deref(), Some("false"));
        assert!(web_store::preference_store().collapsed_stations().contains("st-t"));

        toggle_station(&toggle);
        assert!(!is_station_collapsed(&station));
        assert!(!web_store::preference_store().collapsed_stations().contains("st-t"));
        section.remove();
    }
}
