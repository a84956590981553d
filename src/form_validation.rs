use gloo::events::{EventListener, EventListenerOptions};
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, HtmlInputElement};

use eventdesk_core::validation::validate_form;
use eventdesk_core::{FieldIssue, FieldKind, FormField};

use crate::diag;
use crate::dom;

const ERROR_LIST_CLASS: &str = "form-errors";
const FIELD_SELECTOR: &str = "input[name], select[name], textarea[name]";

fn field_kind(field: &Element) -> FieldKind {
    if dom::has_data(field, "validate-capacity") {
        let reserved = dom::data(field, "validate-capacity")
            .or_else(|| dom::data(field, "reserved"))
            .and_then(|raw| raw.parse::<u32>().ok())
            .unwrap_or(0);
        return FieldKind::Capacity { reserved };
    }
    if dom::has_data(field, "participant-name") {
        return FieldKind::ParticipantName;
    }
    if dom::has_data(field, "datetime-local") {
        return FieldKind::DateTime;
    }
    match field
        .dyn_ref::<HtmlInputElement>()
        .map(HtmlInputElement::type_)
        .as_deref()
    {
        Some("email") => FieldKind::Email,
        Some("tel") => FieldKind::Phone,
        Some("datetime-local") => FieldKind::DateTime,
        _ => FieldKind::Text,
    }
}

fn field_label(form: &Element, field: &Element, name: &str) -> String {
    if let Some(label) = dom::attr(field, "aria-label") {
        return label;
    }
    if !field.id().is_empty() {
        let selector = format!("label[for=\"{}\"]", field.id());
        if let Some(label) = dom::query_in(form, &selector) {
            let text = dom::text(&label);
            if !text.is_empty() {
                return text.trim_end_matches(['*', ':']).trim().to_string();
            }
        }
    }
    dom::attr(field, "placeholder").unwrap_or_else(|| name.to_string())
}

/// Visible, enabled controls of a form as rule inputs. Hidden inputs are
/// skipped: the visible twin is the one the user can fix.
pub(crate) fn read_fields(form: &Element) -> Vec<FormField> {
    let mut fields = Vec::new();
    for field in dom::query_all_in(form, FIELD_SELECTOR) {
        if field.has_attribute("disabled") {
            continue;
        }
        if let Some(input) = field.dyn_ref::<HtmlInputElement>() {
            if matches!(
                input.type_().as_str(),
                "hidden" | "submit" | "button" | "checkbox" | "radio" | "file"
            ) {
                continue;
            }
        }
        let Some(name) = dom::attr(&field, "name") else {
            continue;
        };
        fields.push(FormField {
            label: field_label(form, &field, &name),
            value: dom::field_value(&field).unwrap_or_default(),
            required: field.has_attribute("required"),
            kind: field_kind(&field),
            before: dom::data(&field, "validate-before"),
            name,
        });
    }
    fields
}

fn error_list(form: &Element) -> Option<Element> {
    if let Some(existing) = dom::query_in(form, &format!(".{ERROR_LIST_CLASS}")) {
        return Some(existing);
    }
    let list = dom::create("ul")?;
    list.set_class_name(ERROR_LIST_CLASS);
    let _ = list.set_attribute("role", "alert");
    let _ = form.insert_before(&list, form.first_child().as_ref());
    Some(list)
}

fn field_named(form: &Element, name: &str) -> Option<Element> {
    dom::query_in(form, &format!("[name=\"{name}\"], [data-field=\"{name}\"]"))
}

pub(crate) fn clear_errors(form: &Element) {
    if let Some(list) = dom::query_in(form, &format!(".{ERROR_LIST_CLASS}")) {
        list.set_inner_html("");
        dom::set_hidden(&list, true);
    }
    for field in dom::query_all_in(form, "[aria-invalid=\"true\"]") {
        let _ = field.remove_attribute("aria-invalid");
    }
}

/// Lists the issues at the top of the form, marks the fields invalid and
/// focuses the first one.
pub(crate) fn render_errors(form: &Element, issues: &[FieldIssue]) {
    clear_errors(form);
    if issues.is_empty() {
        return;
    }
    let Some(list) = error_list(form) else {
        return;
    };
    for issue in issues {
        if let Some(item) = dom::create("li") {
            dom::set_text(&item, &issue.message);
            let _ = item.set_attribute("data-field", &issue.field);
            let _ = list.append_child(&item);
        }
    }
    dom::set_hidden(&list, false);
    let mut first_invalid = None;
    for issue in issues {
        if let Some(field) = field_named(form, &issue.field) {
            let _ = field.set_attribute("aria-invalid", "true");
            first_invalid.get_or_insert(field);
        }
    }
    match first_invalid {
        Some(field) => dom::focus(&field),
        None => dom::focus(&list),
    }
    diag::debug("validate", format!("{} issue(s)", issues.len()));
}

pub(crate) fn validate(form: &Element) -> Vec<FieldIssue> {
    validate_form(&read_fields(form))
}

pub(crate) fn install() {
    for form in dom::query_all("form[data-validate]") {
        let target = form.clone();
        EventListener::new_with_options(
            &form,
            "submit",
            EventListenerOptions::enable_prevent_default(),
            move |event: &Event| {
                let issues = validate(&target);
                if issues.is_empty() {
                    clear_errors(&target);
                    return;
                }
                event.prevent_default();
                render_errors(&target, &issues);
            },
        )
        .forget();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn fixture(html: &str) -> Element {
        let form = dom::create("form").expect("form");
        form.set_inner_html(html);
        dom::body().expect("body").append_child(&form).expect("append");
        form
    }

    #[wasm_bindgen_test]
    fn reads_kinds_labels_and_skips_hidden() {
        let form = fixture(
            r#"<label for="email-t">Email *</label>
               <input id="email-t" type="email" name="email" required value="a@b.co">
               <input type="hidden" name="start_time" value="2025-06-01 09:00">
               <input name="capacity" data-validate-capacity="3" value="2">"#,
        );
        let fields = read_fields(&form);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].label, "Email");
        assert_eq!(fields[0].kind, FieldKind::Email);
        assert!(fields[0].required);
        assert_eq!(fields[1].kind, FieldKind::Capacity { reserved: 3 });
        form.remove();
    }

    #[wasm_bindgen_test]
    fn errors_render_and_clear() {
        let form = fixture(
            r#"<input name="start" data-datetime-local data-validate-before="end" value="2025-06-01T10:00">
               <input name="end" data-datetime-local value="2025-06-01T09:00">"#,
        );
        let issues = validate(&form);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "end");
        render_errors(&form, &issues);
        let list = dom::query_in(&form, ".form-errors").expect("list");
        assert!(dom::text(&list).contains("End time must be after the start time."));
        let end = field_named(&form, "end").expect("end");
        assert_eq!(end.get_attribute("aria-invalid").as_deref(), Some("true"));

        clear_errors(&form);
        assert!(dom::query_in(&form, "[aria-invalid]").is_none());
        assert!(dom::is_hidden(&list));
        form.remove();
    }
}
