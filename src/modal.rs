use std::cell::{Cell, RefCell};

use gloo::events::{EventListener, EventListenerOptions};
use gloo::timers::callback::Timeout;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, KeyboardEvent, Node};

use crate::diag;
use crate::dom;
use crate::web_store;

const MODAL_SELECTOR: &str = "[data-modal], .modal";
const CONTENT_SELECTOR: &str = "[data-modal-content], .modal-content";
const TITLE_SELECTOR: &str = "[data-modal-title], h1, h2, h3";
const FOCUSABLE_SELECTOR: &str = "a[href], area[href], button:not([disabled]), \
    input:not([disabled]):not([type=\"hidden\"]), select:not([disabled]), \
    textarea:not([disabled]), [tabindex]:not([tabindex=\"-1\"])";

struct OpenModal {
    modal: Element,
    opener: Option<Element>,
    placeholder: Option<Node>,
    scroll: (f64, f64),
    _focus_trap: EventListener,
}

thread_local! {
    static OPEN_MODALS: RefCell<Vec<OpenModal>> = RefCell::new(Vec::new());
    static NEXT_TITLE_ID: Cell<u32> = Cell::new(0);
}

pub(crate) fn is_open(modal: &Element) -> bool {
    OPEN_MODALS.with(|open| open.borrow().iter().any(|record| &record.modal == modal))
}

pub(crate) fn open_count() -> usize {
    OPEN_MODALS.with(|open| open.borrow().len())
}

pub(crate) fn open_by_id(id: &str, opener: Option<Element>) -> bool {
    let Some(modal) = dom::by_id(id) else {
        diag::warn("modal", format!("no modal #{id}"));
        return false;
    };
    open(&modal, opener);
    true
}

pub(crate) fn open(modal: &Element, opener: Option<Element>) {
    if is_open(modal) {
        return;
    }
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(body) = dom::body() else {
        return;
    };
    let scroll = (
        window.scroll_x().unwrap_or(0.0),
        window.scroll_y().unwrap_or(0.0),
    );

    // Lift the modal to <body> so no ancestor's overflow or transform clips it.
    let mut placeholder = None;
    if let Some(parent) = modal.parent_node() {
        let body_node: &Node = body.as_ref();
        if &parent != body_node {
            if let Some(document) = dom::document() {
                let marker: Node = document.create_comment("modal-placeholder").into();
                if parent.insert_before(&marker, Some(modal.as_ref())).is_ok() {
                    let _ = body.append_child(modal);
                    placeholder = Some(marker);
                }
            }
        }
    }

    let _ = modal.set_attribute("role", "dialog");
    let _ = modal.set_attribute("aria-modal", "true");
    let _ = modal.remove_attribute("aria-hidden");
    ensure_labelled(modal);
    dom::set_hidden(modal, false);
    dom::set_class(modal, "is-open", true);
    dom::set_class(&body, "modal-open", true);

    let focus_trap = install_focus_trap(modal);
    OPEN_MODALS.with(|open| {
        open.borrow_mut().push(OpenModal {
            modal: modal.clone(),
            opener,
            placeholder,
            scroll,
            _focus_trap: focus_trap,
        });
    });

    // wait a tick so the modal is rendered before focusing into it
    let target = modal.clone();
    Timeout::new(0, move || {
        if let Some(first) = focusable(&target).into_iter().next() {
            dom::focus(&first);
        } else {
            let _ = target.set_attribute("tabindex", "-1");
            dom::focus(&target);
        }
    })
    .forget();
    diag::debug("modal", format!("open #{}", modal.id()));
}

pub(crate) fn close(modal: &Element) {
    let record = OPEN_MODALS.with(|open| {
        let mut open = open.borrow_mut();
        let position = open.iter().position(|record| &record.modal == modal)?;
        Some(open.remove(position))
    });
    let Some(record) = record else {
        return;
    };
    let OpenModal {
        modal,
        opener,
        placeholder,
        scroll,
        ..
    } = record;

    let _ = modal.set_attribute("aria-hidden", "true");
    let _ = modal.remove_attribute("aria-modal");
    dom::set_class(&modal, "is-open", false);
    dom::set_hidden(&modal, true);
    if let Some(marker) = placeholder {
        if let Some(parent) = marker.parent_node() {
            let _ = parent.replace_child(&modal, &marker);
        }
    }
    if open_count() == 0 {
        if let Some(body) = dom::body() {
            dom::set_class(&body, "modal-open", false);
        }
    }
    if let Some(opener) = opener {
        dom::focus(&opener);
    }
    restore_scroll(scroll);
    diag::debug("modal", format!("close #{}", modal.id()));
}

/// Closes every open modal, newest first.
pub(crate) fn close_all() {
    loop {
        let top = OPEN_MODALS.with(|open| open.borrow().last().map(|record| record.modal.clone()));
        let Some(modal) = top else {
            break;
        };
        close(&modal);
    }
}

fn restore_scroll((x, y): (f64, f64)) {
    let Some(window) = web_sys::window() else {
        return;
    };
    // focusing the opener can scroll; put the page back on the next frame
    let callback = Closure::once_into_js(move || {
        if let Some(window) = web_sys::window() {
            window.scroll_to_with_x_and_y(x, y);
        }
    });
    if window
        .request_animation_frame(callback.unchecked_ref())
        .is_err()
    {
        window.scroll_to_with_x_and_y(x, y);
    }
}

fn ensure_labelled(modal: &Element) {
    if modal.has_attribute("aria-labelledby") || modal.has_attribute("aria-label") {
        return;
    }
    let Some(title) = dom::query_in(modal, TITLE_SELECTOR) else {
        return;
    };
    if title.id().is_empty() {
        let next = NEXT_TITLE_ID.with(|counter| {
            let value = counter.get() + 1;
            counter.set(value);
            value
        });
        title.set_id(&format!("modal-title-{next}"));
    }
    let _ = modal.set_attribute("aria-labelledby", &title.id());
}

fn focusable(modal: &Element) -> Vec<Element> {
    dom::query_all_in(modal, FOCUSABLE_SELECTOR)
        .into_iter()
        .filter(|element| !dom::is_hidden(element))
        .collect()
}

fn install_focus_trap(modal: &Element) -> EventListener {
    let target = modal.clone();
    EventListener::new_with_options(
        modal,
        "keydown",
        EventListenerOptions::enable_prevent_default(),
        move |event: &Event| {
            let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                return;
            };
            if event.key() != "Tab" {
                return;
            }
            let items = focusable(&target);
            let (Some(first), Some(last)) = (items.first(), items.last()) else {
                event.prevent_default();
                return;
            };
            let active = dom::document().and_then(|document| document.active_element());
            let inside = active
                .as_ref()
                .map(|element| target.contains(Some(element.as_ref())))
                .unwrap_or(false);
            if !inside {
                event.prevent_default();
                dom::focus(first);
            } else if event.shift_key() && active.as_ref() == Some(first) {
                event.prevent_default();
                dom::focus(last);
            } else if !event.shift_key() && active.as_ref() == Some(last) {
                event.prevent_default();
                dom::focus(first);
            }
        },
    )
}

fn handle_outside_press(event: &Event) {
    if open_count() == 0 {
        return;
    }
    let Some(target) = dom::target_element(event) else {
        return;
    };
    if dom::closest(&target, "[data-modal-open]").is_some() {
        return;
    }
    let top = OPEN_MODALS.with(|open| open.borrow().last().map(|record| record.modal.clone()));
    let Some(modal) = top else {
        return;
    };
    let content = dom::query_in(&modal, CONTENT_SELECTOR);
    let inside = match content {
        Some(content) => content.contains(Some(target.as_ref())),
        None => modal.contains(Some(target.as_ref())) && target != modal,
    };
    if !inside {
        close_all();
    }
}

fn handle_escape(event: &Event) {
    let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
        return;
    };
    if event.key() == "Escape" && open_count() > 0 {
        close_all();
    }
}

fn handle_click(event: &Event) {
    let Some(target) = dom::target_element(event) else {
        return;
    };
    if let Some(trigger) = dom::closest(&target, "[data-modal-open]") {
        let Some(id) = dom::data(&trigger, "modal-open") else {
            return;
        };
        event.prevent_default();
        open_by_id(&id, Some(trigger));
        return;
    }
    if let Some(closer) = dom::closest(&target, "[data-modal-close]") {
        event.prevent_default();
        match dom::closest(&closer, MODAL_SELECTOR) {
            Some(modal) => close(&modal),
            None => close_all(),
        }
    }
}

/// Forms marked `data-modal-reopen` bring their modal back after the server
/// re-renders the page, e.g. to show validation errors in place.
fn handle_submit(event: &Event) {
    let Some(form) = dom::target_element(event) else {
        return;
    };
    if !dom::has_data(&form, "modal-reopen") {
        return;
    }
    let Some(modal) = dom::closest(&form, MODAL_SELECTOR) else {
        return;
    };
    if modal.id().is_empty() {
        return;
    }
    web_store::report(
        "modal",
        web_store::session_store().set_pending_modal(&modal.id()),
    );
}

pub(crate) fn install() {
    let Some(document) = dom::document() else {
        return;
    };
    for modal in dom::query_all(MODAL_SELECTOR) {
        if !is_open(&modal) {
            let _ = modal.set_attribute("aria-hidden", "true");
        }
    }
    EventListener::new_with_options(
        &document,
        "click",
        EventListenerOptions::enable_prevent_default(),
        handle_click,
    )
    .forget();
    EventListener::new(&document, "mousedown", handle_outside_press).forget();
    EventListener::new(&document, "click", handle_outside_press).forget();
    EventListener::new(&document, "keydown", handle_escape).forget();
    EventListener::new(&document, "submit", handle_submit).forget();

    if let Some(pending) = web_store::session_store().take_pending_modal() {
        open_by_id(&pending, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn fixture() -> (Element, Element, Element) {
        let body = dom::body().expect("body");
        let section = dom::create("section").expect("section");
        section.set_inner_html(
            r#"<button type="button" data-modal-open="edit-station-t">Edit</button>
               <div id="edit-station-t" data-modal hidden>
                 <div class="modal-content">
                   <h2>Edit station</h2>
                   <input name="name" value="Kitchen">
                   <button type="button" data-modal-close>Cancel</button>
                 </div>
               </div>"#,
        );
        body.append_child(&section).expect("append");
        let trigger = dom::query_in(&section, "[data-modal-open]").expect("trigger");
        let modal = dom::by_id("edit-station-t").expect("modal");
        (section, trigger, modal)
    }

    #[wasm_bindgen_test]
    fn open_lifts_modal_and_close_puts_it_back() {
        let (section, trigger, modal) = fixture();
        open(&modal, Some(trigger));
        assert!(is_open(&modal));
        assert_eq!(modal.get_attribute("aria-modal").as_deref(), Some("true"));
        assert_eq!(modal.get_attribute("role").as_deref(), Some("dialog"));
        let title_id = modal.get_attribute("aria-labelledby").expect("labelled");
        assert!(dom::by_id(&title_id).is_some());
        let parent = modal.parent_element().expect("parent");
        assert_eq!(parent.tag_name(), "BODY");

        close(&modal);
        assert!(!is_open(&modal));
        assert_eq!(modal.get_attribute("aria-hidden").as_deref(), Some("true"));
        assert!(dom::is_hidden(&modal));
        assert_eq!(modal.parent_element().as_ref(), Some(&section));
        section.remove();
    }

    fn key(target: &Element, key: &str, shift: bool) {
        let init = web_sys::KeyboardEventInit::new();
        init.set_key(key);
        init.set_shift_key(shift);
        init.set_bubbles(true);
        init.set_cancelable(true);
        let event = KeyboardEvent::new_with_keyboard_event_init_dict("keydown", &init).expect("event");
        target.dispatch_event(&event).expect("dispatch");
    }

    fn press(target: &Element, kind: &str) {
        let init = web_sys::MouseEventInit::new();
        init.set_bubbles(true);
        let event = web_sys::MouseEvent::new_with_mouse_event_init_dict(kind, &init).expect("event");
        target.dispatch_event(&event).expect("dispatch");
    }

    fn active() -> Option<Element> {
        dom::document().and_then(|document| document.active_element())
    }

    #[wasm_bindgen_test]
    fn tab_wraps_inside_the_open_modal() {
        let (section, trigger, modal) = fixture();
        open(&modal, Some(trigger));
        let input = dom::query_in(&modal, "input").expect("input");
        let cancel = dom::query_in(&modal, "[data-modal-close]").expect("cancel");

        dom::focus(&cancel);
        key(&cancel, "Tab", false);
        assert_eq!(active().as_ref(), Some(&input));

        key(&input, "Tab", true);
        assert_eq!(active().as_ref(), Some(&cancel));

        close(&modal);
        section.remove();
    }

    #[wasm_bindgen_test]
    fn escape_closes_every_open_modal() {
        let (section, trigger, modal) = fixture();
        let second = dom::create("div").expect("second");
        second.set_attribute("data-modal", "").expect("attr");
        second.set_inner_html(r#"<div class="modal-content"><button>Ok</button></div>"#);
        section.append_child(&second).expect("append");
        let document = dom::document().expect("document");
        let _escape = EventListener::new(&document, "keydown", handle_escape);

        open(&modal, Some(trigger));
        open(&second, None);
        assert_eq!(open_count(), 2);
        let ok = dom::query_in(&second, "button").expect("ok");
        key(&ok, "Escape", false);
        assert_eq!(open_count(), 0);
        assert!(!is_open(&modal));
        assert!(!is_open(&second));
        section.remove();
    }

    #[wasm_bindgen_test]
    fn press_outside_content_closes_but_inside_does_not() {
        let (section, trigger, modal) = fixture();
        let document = dom::document().expect("document");
        let _mousedown = EventListener::new(&document, "mousedown", handle_outside_press);
        let _click = EventListener::new(&document, "click", handle_outside_press);

        open(&modal, Some(trigger.clone()));
        let input = dom::query_in(&modal, "input").expect("input");
        press(&input, "mousedown");
        assert!(is_open(&modal));

        press(&modal, "mousedown");
        assert!(!is_open(&modal));

        open(&modal, Some(trigger));
        let outside = dom::body().expect("body");
        press(&outside, "click");
        assert!(!is_open(&modal));
        section.remove();
    }

    #[wasm_bindgen_test]
    fn focusable_skips_disabled_controls() {
        let (section, _, modal) = fixture();
        let input = dom::query_in(&modal, "input").expect("input");
        input.set_attribute("disabled", "").expect("disable");
        let items = focusable(&modal);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].tag_name(), "BUTTON");
        section.remove();
    }
}
