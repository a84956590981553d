use gloo::events::EventListener;
use js_sys::{Function, Promise, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{Element, HtmlTextAreaElement};

use crate::diag;
use crate::dom;
use crate::toast;

const COPIED: &str = "Copied to clipboard.";
const COPY_FAILED: &str = "Could not copy. Select the text and copy it manually.";

fn copy_source(button: &Element) -> Option<String> {
    if let Some(text) = dom::data(button, "copy-text") {
        return Some(text);
    }
    let target = dom::by_id(&dom::data(button, "copy-target")?)?;
    dom::field_value(&target).or_else(|| Some(dom::text(&target)))
}

/// `navigator.clipboard.writeText`, when the browser exposes it.
fn clipboard_write(text: &str) -> Option<Promise> {
    let navigator = web_sys::window()?.navigator();
    let clipboard = Reflect::get(&navigator, &JsValue::from_str("clipboard")).ok()?;
    if clipboard.is_undefined() || clipboard.is_null() {
        return None;
    }
    let write = Reflect::get(&clipboard, &JsValue::from_str("writeText"))
        .ok()?
        .dyn_into::<Function>()
        .ok()?;
    write
        .call1(&clipboard, &JsValue::from_str(text))
        .ok()?
        .dyn_into::<Promise>()
        .ok()
}

/// Off-screen textarea plus `execCommand("copy")` for older browsers and
/// insecure origins.
fn copy_with_selection(text: &str) -> bool {
    let Some(document) = dom::document() else {
        return false;
    };
    let Some(body) = document.body() else {
        return false;
    };
    let Some(area) = dom::create("textarea").and_then(|el| el.dyn_into::<HtmlTextAreaElement>().ok())
    else {
        return false;
    };
    area.set_value(text);
    let _ = area.set_attribute("readonly", "");
    let _ = area.set_attribute("style", "position:fixed;top:-1000px;opacity:0");
    if body.append_child(&area).is_err() {
        return false;
    }
    area.select();
    let copied = document
        .dyn_ref::<web_sys::HtmlDocument>()
        .map(|html| html.exec_command("copy").unwrap_or(false))
        .unwrap_or(false);
    area.remove();
    copied
}

pub(crate) fn copy(text: String) {
    let Some(promise) = clipboard_write(&text) else {
        report(copy_with_selection(&text));
        return;
    };
    spawn_local(async move {
        match JsFuture::from(promise).await {
            Ok(_) => report(true),
            Err(err) => {
                diag::debug("clipboard", diag::js_err(err));
                report(copy_with_selection(&text));
            }
        }
    });
}

fn report(copied: bool) {
    if copied {
        toast::success(COPIED);
    } else {
        toast::error(COPY_FAILED);
    }
}

pub(crate) fn install() {
    for button in dom::query_all("[data-copy-text], [data-copy-target]") {
        let source = button.clone();
        EventListener::new(&button, "click", move |_| {
            if let Some(text) = copy_source(&source) {
                copy(text);
            }
        })
        .forget();
    }
}
