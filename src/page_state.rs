use gloo::events::EventListener;
use js_sys::Reflect;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, Event, HtmlElement, HtmlFormElement, ScrollBehavior, ScrollToOptions};

use crate::app_runtime;
use crate::dom;
use crate::web_store;

fn supports_smooth_scroll() -> bool {
    let Some(root) = dom::document().and_then(|document| document.document_element()) else {
        return false;
    };
    let Ok(root) = root.dyn_into::<HtmlElement>() else {
        return false;
    };
    Reflect::has(&root.style(), &JsValue::from_str("scrollBehavior")).unwrap_or(false)
}

/// Scrolls the element into view, smoothly where the browser can.
pub(crate) fn scroll_to(element: &Element) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let offset = window.scroll_y().unwrap_or(0.0);
    let top = (element.get_bounding_client_rect().top() + offset - 16.0).max(0.0);
    if supports_smooth_scroll() {
        let options = ScrollToOptions::new();
        options.set_top(top);
        options.set_behavior(ScrollBehavior::Smooth);
        window.scroll_to_with_scroll_to_options(&options);
    } else {
        window.scroll_to_with_x_and_y(0.0, top);
    }
}

fn remember_scroll(path: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let x = window.scroll_x().unwrap_or(0.0);
    let y = window.scroll_y().unwrap_or(0.0);
    web_store::report(
        "scroll",
        web_store::session_store().set_scroll_position(path, x, y),
    );
}

fn restore_scroll(path: &str) {
    let Some((x, y)) = web_store::session_store().take_scroll_position(path) else {
        return;
    };
    if let Some(window) = web_sys::window() {
        window.scroll_to_with_x_and_y(x, y);
    }
}

/// POST forms reload the page they came from; keep the reader's place.
pub(crate) fn install() {
    let path = app_runtime::page_config().path;
    restore_scroll(&path);
    let Some(document) = dom::document() else {
        return;
    };
    EventListener::new(&document, "submit", move |event: &Event| {
        if event.default_prevented() {
            return;
        }
        let Some(form) = event
            .target()
            .and_then(|target| target.dyn_into::<HtmlFormElement>().ok())
        else {
            return;
        };
        if form.method().eq_ignore_ascii_case("post") || dom::has_data(&form, "preserve-scroll") {
            remember_scroll(&path);
        }
    })
    .forget();
}
