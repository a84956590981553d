use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, Event, HtmlElement, HtmlInputElement, HtmlSelectElement,
    HtmlTextAreaElement, NodeList,
};

pub(crate) fn document() -> Option<Document> {
    web_sys::window()?.document()
}

pub(crate) fn body() -> Option<HtmlElement> {
    document()?.body()
}

pub(crate) fn by_id(id: &str) -> Option<Element> {
    let id = id.trim().trim_start_matches('#');
    if id.is_empty() {
        return None;
    }
    document()?.get_element_by_id(id)
}

pub(crate) fn query(selector: &str) -> Option<Element> {
    document()?.query_selector(selector).ok()?
}

pub(crate) fn query_all(selector: &str) -> Vec<Element> {
    document()
        .and_then(|document| document.query_selector_all(selector).ok())
        .map(|list| elements(&list))
        .unwrap_or_default()
}

pub(crate) fn query_in(root: &Element, selector: &str) -> Option<Element> {
    root.query_selector(selector).ok()?
}

pub(crate) fn query_all_in(root: &Element, selector: &str) -> Vec<Element> {
    root.query_selector_all(selector)
        .map(|list| elements(&list))
        .unwrap_or_default()
}

pub(crate) fn elements(list: &NodeList) -> Vec<Element> {
    (0..list.length())
        .filter_map(|idx| list.item(idx))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

pub(crate) fn closest(element: &Element, selector: &str) -> Option<Element> {
    element.closest(selector).ok()?
}

pub(crate) fn target_element(event: &Event) -> Option<Element> {
    event.target()?.dyn_into::<Element>().ok()
}

/// Attribute value, trimmed; blank counts as missing.
pub(crate) fn attr(element: &Element, name: &str) -> Option<String> {
    let value = element.get_attribute(name)?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn data(element: &Element, name: &str) -> Option<String> {
    attr(element, &format!("data-{name}"))
}

pub(crate) fn has_data(element: &Element, name: &str) -> bool {
    element.has_attribute(&format!("data-{name}"))
}

pub(crate) fn text(element: &Element) -> String {
    element
        .text_content()
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

pub(crate) fn set_text(element: &Element, text: &str) {
    element.set_text_content(Some(text));
}

pub(crate) fn set_hidden(element: &Element, hidden: bool) {
    if let Some(html) = element.dyn_ref::<HtmlElement>() {
        html.set_hidden(hidden);
    } else if hidden {
        let _ = element.set_attribute("hidden", "");
    } else {
        let _ = element.remove_attribute("hidden");
    }
}

pub(crate) fn is_hidden(element: &Element) -> bool {
    element.has_attribute("hidden")
}

pub(crate) fn set_class(element: &Element, class: &str, on: bool) {
    let _ = element.class_list().toggle_with_force(class, on);
}

pub(crate) fn set_bool_attr(element: &Element, name: &str, on: bool) {
    let _ = element.set_attribute(name, if on { "true" } else { "false" });
}

pub(crate) fn focus(element: &Element) {
    if let Some(html) = element.dyn_ref::<HtmlElement>() {
        let _ = html.focus();
    }
}

/// Current value of an input, select or textarea.
pub(crate) fn field_value(element: &Element) -> Option<String> {
    if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        return Some(input.value());
    }
    if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
        return Some(select.value());
    }
    element
        .dyn_ref::<HtmlTextAreaElement>()
        .map(HtmlTextAreaElement::value)
}

pub(crate) fn set_field_value(element: &Element, value: &str) {
    if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        input.set_value(value);
    } else if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
        select.set_value(value);
    } else if let Some(area) = element.dyn_ref::<HtmlTextAreaElement>() {
        area.set_value(value);
    }
}

pub(crate) fn set_disabled(element: &Element, disabled: bool) {
    if disabled {
        let _ = element.set_attribute("disabled", "");
    } else {
        let _ = element.remove_attribute("disabled");
    }
}

pub(crate) fn create(tag: &str) -> Option<Element> {
    document()?.create_element(tag).ok()
}
