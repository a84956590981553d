use gloo::events::{EventListener, EventListenerOptions};
use js_sys::{Function, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, Event, HtmlInputElement};

use chrono::NaiveDateTime;
use eventdesk_core::datetime::{
    default_end, end_needs_advance, format_canonical, format_local_input, parse_flexible,
};

use crate::diag;
use crate::dom;

const LOCAL_INPUT_SELECTOR: &str = "input[data-datetime-local]";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FieldRole {
    Start,
    End,
    Other,
}

impl FieldRole {
    fn of(input: &Element) -> Self {
        match dom::data(input, "datetime-role").as_deref() {
            Some("start") => Self::Start,
            Some("end") => Self::End,
            _ => Self::Other,
        }
    }
}

fn read_datetime(raw: &str) -> Option<NaiveDateTime> {
    parse_flexible(raw)
        .or_else(|| parse_with_js_date(raw).and_then(|fallback| parse_flexible(&fallback)))
}

/// Reads whatever the browser put in the visible input into the canonical
/// `YYYY-MM-DD HH:MM` form the server stores.
pub(crate) fn canonical_value(raw: &str) -> Option<String> {
    read_datetime(raw).map(|value| format_canonical(&value))
}

/// The `datetime-local` form of a stored value.
fn local_value(raw: &str) -> Option<String> {
    read_datetime(raw).map(|value| format_local_input(&value))
}

// js Date understands a few more human forms (e.g. "June 1, 2025 9:00")
fn parse_with_js_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let date = js_sys::Date::new(&JsValue::from_str(raw));
    if date.get_time().is_nan() {
        return None;
    }
    Some(format!(
        "{:04}-{:02}-{:02} {:02}:{:02}",
        date.get_full_year(),
        date.get_month() + 1,
        date.get_date(),
        date.get_hours(),
        date.get_minutes()
    ))
}

fn canonical_target(input: &Element) -> Option<HtmlInputElement> {
    let target = dom::data(input, "canonical-target")?;
    let element = dom::by_id(&target).or_else(|| {
        let form = dom::closest(input, "form")?;
        dom::query_in(&form, &format!("input[name=\"{target}\"]"))
    })?;
    element.dyn_into::<HtmlInputElement>().ok()
}

/// Copies the visible value into its hidden canonical twin. Unreadable input
/// clears the hidden field so the server sees a missing value, not a stale one.
fn sync_canonical(input: &HtmlInputElement) {
    let Some(hidden) = canonical_target(input) else {
        return;
    };
    let canonical = canonical_value(&input.value()).unwrap_or_default();
    hidden.set_value(&canonical);
}

fn paired_end(start: &Element) -> Option<HtmlInputElement> {
    let scope = dom::closest(start, "[data-datetime-pair], form")?;
    dom::query_in(
        &scope,
        "input[data-datetime-local][data-datetime-role=\"end\"]",
    )?
    .dyn_into::<HtmlInputElement>()
    .ok()
}

/// Keeps a block's end after its start: empty or earlier ends move to the
/// default block length after the new start.
fn advance_end(start: &HtmlInputElement) {
    let Some(start_value) = parse_flexible(&start.value()) else {
        return;
    };
    let Some(end) = paired_end(start) else {
        return;
    };
    if !end_needs_advance(&start_value, &end.value()) {
        return;
    }
    let next = default_end(&start_value);
    end.set_value(&format_local_input(&next));
    sync_canonical(&end);
    diag::debug("datetime", format!("end moved to {}", format_canonical(&next)));
}

fn seed_visible(input: &HtmlInputElement) {
    let Some(hidden) = canonical_target(input) else {
        return;
    };
    let canonical = hidden.value();
    if let Some(local) = local_value(&canonical) {
        input.set_value(&local);
    } else if !input.value().trim().is_empty() {
        sync_canonical(input);
    }
}

fn bind(input: HtmlInputElement) {
    seed_visible(&input);
    let role = FieldRole::of(&input);
    for event_name in ["input", "change", "blur"] {
        let field = input.clone();
        EventListener::new(&input, event_name, move |_| {
            sync_canonical(&field);
            if role == FieldRole::Start {
                advance_end(&field);
            }
        })
        .forget();
    }
}

/// Opens the native picker where `showPicker` exists, otherwise focuses the
/// input so the platform control takes over.
pub(crate) fn show_picker(input: &HtmlInputElement) {
    let method = Reflect::get(input.as_ref(), &JsValue::from_str("showPicker"))
        .ok()
        .and_then(|value| value.dyn_into::<Function>().ok());
    if let Some(method) = method {
        if let Err(err) = method.call0(input.as_ref()) {
            diag::debug("datetime", format!("showPicker refused: {}", diag::js_err(err)));
            let _ = input.focus();
        }
        return;
    }
    let _ = input.focus();
}

fn picker_input(button: &Element) -> Option<HtmlInputElement> {
    let target = dom::data(button, "datetime-picker")
        .and_then(|id| dom::by_id(&id))
        .or_else(|| {
            let scope = button.parent_element()?;
            dom::query_in(&scope, LOCAL_INPUT_SELECTOR)
        })?;
    target.dyn_into::<HtmlInputElement>().ok()
}

pub(crate) fn install() {
    let inputs: Vec<HtmlInputElement> = dom::query_all(LOCAL_INPUT_SELECTOR)
        .into_iter()
        .filter_map(|element| element.dyn_into::<HtmlInputElement>().ok())
        .collect();
    let mut forms: Vec<Element> = Vec::new();
    for input in inputs {
        if let Some(form) = dom::closest(&input, "form") {
            if !forms.contains(&form) {
                forms.push(form);
            }
        }
        bind(input);
    }
    // capture phase so the hidden fields are current before other submit handlers read them
    for form in forms {
        let scope = form.clone();
        EventListener::new_with_options(
            &form,
            "submit",
            EventListenerOptions::run_in_capture_phase(),
            move |_: &Event| {
                for element in dom::query_all_in(&scope, LOCAL_INPUT_SELECTOR) {
                    if let Ok(input) = element.dyn_into::<HtmlInputElement>() {
                        sync_canonical(&input);
                    }
                }
            },
        )
        .forget();
    }
    for button in dom::query_all("[data-datetime-picker]") {
        let trigger = button.clone();
        EventListener::new(&button, "click", move |_| {
            if let Some(input) = picker_input(&trigger) {
                show_picker(&input);
            }
        })
        .forget();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn fixture() -> Element {
        let form = dom::create("form").expect("form");
        form.set_inner_html(
            r#"<input type="datetime-local" id="start-t" data-datetime-local
                      data-datetime-role="start" data-canonical-target="start_time-t">
               <input type="hidden" id="start_time-t" name="start_time" value="2025-06-01 09:00">
               <input type="datetime-local" id="end-t" data-datetime-local
                      data-datetime-role="end" data-canonical-target="end_time-t">
               <input type="hidden" id="end_time-t" name="end_time" value="">"#,
        );
        dom::body().expect("body").append_child(&form).expect("append");
        form
    }

    fn input(id: &str) -> HtmlInputElement {
        dom::by_id(id)
            .expect("input")
            .dyn_into::<HtmlInputElement>()
            .expect("html input")
    }

    #[wasm_bindgen_test]
    fn js_date_fallback_reads_long_forms() {
        assert_eq!(
            canonical_value("2025-06-01T09:30").as_deref(),
            Some("2025-06-01 09:30")
        );
        assert_eq!(
            canonical_value("June 1, 2025 09:30").as_deref(),
            Some("2025-06-01 09:30")
        );
        assert_eq!(canonical_value("not a date"), None);
    }

    #[wasm_bindgen_test]
    fn seeding_and_start_change_keep_fields_in_step() {
        let form = fixture();
        let start = input("start-t");
        seed_visible(&start);
        assert_eq!(start.value(), "2025-06-01T09:00");

        start.set_value("2025-06-01T14:15");
        sync_canonical(&start);
        advance_end(&start);
        assert_eq!(input("start_time-t").value(), "2025-06-01 14:15");
        assert_eq!(input("end-t").value(), "2025-06-01T15:15");
        assert_eq!(input("end_time-t").value(), "2025-06-01 15:15");
        form.remove();
    }

    #[wasm_bindgen_test]
    fn seeding_reads_long_server_forms() {
        let form = fixture();
        input("start_time-t").set_value("June 1, 2025 09:30");
        let start = input("start-t");
        seed_visible(&start);
        assert_eq!(start.value(), "2025-06-01T09:30");
        form.remove();
    }

    #[wasm_bindgen_test]
    fn later_end_is_left_alone() {
        let form = fixture();
        let start = input("start-t");
        let end = input("end-t");
        end.set_value("2025-06-01T18:00");
        start.set_value("2025-06-01T10:00");
        advance_end(&start);
        assert_eq!(end.value(), "2025-06-01T18:00");
        form.remove();
    }
}
