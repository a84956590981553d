use gloo::events::{EventListener, EventListenerOptions};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, Event, HtmlFormElement};

use eventdesk_core::capacity::{
    interpret_capacity_response, parse_capacity_input, CAPACITY_UPDATE_FAILED,
};
use eventdesk_core::{Capacity, CapacityUpdate, FieldIssue};

use crate::diag;
use crate::dom;
use crate::form_validation;
use crate::net;
use crate::toast;

const CAPACITY_FIELD: &str = "capacity";

fn capacity_input(form: &Element) -> Option<Element> {
    dom::query_in(form, &format!("input[name=\"{CAPACITY_FIELD}\"]"))
}

fn reserved(form: &Element) -> u32 {
    dom::data(form, "reserved")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0)
}

/// Display next to the form that mirrors the saved capacity.
fn capacity_display(form: &Element) -> Option<Element> {
    if let Some(id) = dom::data(form, "capacity-display") {
        return dom::by_id(&id);
    }
    let row = dom::closest(form, "[data-capacity-row]")?;
    dom::query_in(&row, "[data-capacity-value]")
}

fn apply(form: &Element, capacity: Capacity) {
    if let Some(input) = capacity_input(form) {
        dom::set_field_value(&input, &capacity.input_value());
    }
    if let Some(display) = capacity_display(form) {
        dom::set_text(&display, &capacity.to_string());
    }
    form_validation::clear_errors(form);
}

fn submit(form: Element) {
    let Some(input) = capacity_input(&form) else {
        return;
    };
    let raw = dom::field_value(&input).unwrap_or_default();
    let capacity = match parse_capacity_input(&raw, reserved(&form)) {
        Ok(capacity) => capacity,
        Err(err) => {
            form_validation::render_errors(&form, &[FieldIssue::new(CAPACITY_FIELD, err.to_string())]);
            return;
        }
    };
    let action = form
        .dyn_ref::<HtmlFormElement>()
        .map(HtmlFormElement::action)
        .unwrap_or_default();
    if action.is_empty() {
        diag::warn("capacity", "form has no action");
        return;
    }
    let body = match net::encode_form(&form) {
        Ok(body) => body,
        Err(err) => {
            diag::warn("capacity", err);
            return;
        }
    };
    dom::set_disabled(&input, true);
    spawn_local(async move {
        let result = net::post_form(&action, body).await;
        dom::set_disabled(&input, false);
        match result {
            Ok((status, text)) if (200..300).contains(&status) => {
                match interpret_capacity_response(&text, capacity) {
                    CapacityUpdate::Applied(saved) => {
                        apply(&form, saved);
                        toast::success(&format!("Capacity set to {saved}."));
                    }
                    CapacityUpdate::Rejected(message) => gloo::dialogs::alert(&message),
                }
            }
            Ok((status, text)) => {
                diag::warn("capacity", format!("{action} answered {status}"));
                // error bodies may still carry a message worth showing
                match interpret_capacity_response(&text, capacity) {
                    CapacityUpdate::Rejected(message) => gloo::dialogs::alert(&message),
                    CapacityUpdate::Applied(_) => gloo::dialogs::alert(CAPACITY_UPDATE_FAILED),
                }
            }
            Err(err) => {
                diag::warn("capacity", err);
                gloo::dialogs::alert(CAPACITY_UPDATE_FAILED);
            }
        }
    });
}

pub(crate) fn install() {
    for form in dom::query_all("form[data-capacity-form]") {
        let target = form.clone();
        EventListener::new_with_options(
            &form,
            "submit",
            EventListenerOptions::enable_prevent_default(),
            move |event: &Event| {
                event.prevent_default();
                submit(target.clone());
            },
        )
        .forget();
        if let Some(input) = capacity_input(&form) {
            let target = form.clone();
            EventListener::new(&input, "input", move |_| form_validation::clear_errors(&target))
                .forget();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn fixture() -> Element {
        let row = dom::create("div").expect("row");
        row.set_attribute("data-capacity-row", "").expect("attr");
        row.set_inner_html(
            r#"<span data-capacity-value>4</span>
               <form data-capacity-form data-reserved="3" action="/admin/block/9/capacity">
                 <input name="capacity" value="2">
               </form>"#,
        );
        dom::body().expect("body").append_child(&row).expect("append");
        row
    }

    #[wasm_bindgen_test]
    fn below_reserved_is_rejected_before_posting() {
        let row = fixture();
        let form = dom::query_in(&row, "form").expect("form");
        assert_eq!(reserved(&form), 3);
        submit(form.clone());
        let errors = dom::query_in(&form, ".form-errors").expect("errors");
        assert!(dom::text(&errors).contains("3 spots already reserved"));
        let input = capacity_input(&form).expect("input");
        assert!(!input.has_attribute("disabled"));
        row.remove();
    }

    #[wasm_bindgen_test]
    fn applied_capacity_updates_input_and_display() {
        let row = fixture();
        let form = dom::query_in(&row, "form").expect("form");
        apply(&form, Capacity::Unlimited);
        let display = dom::query_in(&row, "[data-capacity-value]").expect("display");
        assert_eq!(dom::text(&display), "Unlimited");
        let input = capacity_input(&form).expect("input");
        assert_eq!(dom::field_value(&input).as_deref(), Some(""));
        row.remove();
    }
}
