use std::cell::RefCell;
use std::rc::Rc;

use gloo::events::{EventListener, EventListenerOptions};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{DragEvent, Element, Event, HtmlElement, Node};

use eventdesk_core::datetime::parse_flexible;
use eventdesk_core::reorder::{move_item, placement_for, reorder_body, sort_by_time};
use eventdesk_core::{DropPlacement, ReorderKind, TimedItem};

use crate::diag;
use crate::dom;
use crate::net;

const ITEM_SELECTOR: &str = "[data-reorder-id]";
const DRAGGING_CLASS: &str = "dragging";

struct ReorderList {
    list: Element,
    kind: ReorderKind,
    url: String,
    dragging: RefCell<Option<Element>>,
    order_at_start: RefCell<Vec<String>>,
}

impl ReorderList {
    fn from_element(list: Element) -> Option<Self> {
        let kind = dom::data(&list, "reorder-kind").and_then(|raw| ReorderKind::parse(&raw))?;
        let url = dom::data(&list, "reorder-url")
            .or_else(|| dom::data(&list, "reorder-parent").map(|parent| kind.endpoint(&parent)))?;
        Some(Self {
            list,
            kind,
            url,
            dragging: RefCell::new(None),
            order_at_start: RefCell::new(Vec::new()),
        })
    }

    /// Items that belong to this list, not to a nested one.
    fn items(&self) -> Vec<Element> {
        dom::query_all_in(&self.list, ITEM_SELECTOR)
            .into_iter()
            .filter(|item| dom::closest(item, "[data-reorder-list]").as_ref() == Some(&self.list))
            .collect()
    }

    fn order(&self) -> Vec<String> {
        self.items()
            .iter()
            .filter_map(|item| dom::data(item, "reorder-id"))
            .collect()
    }

    fn item_for(&self, target: &Element) -> Option<Element> {
        let item = dom::closest(target, ITEM_SELECTOR)?;
        let owner = dom::closest(&item, "[data-reorder-list]")?;
        (owner == self.list).then_some(item)
    }

    fn drag_start(&self, event: &DragEvent) {
        let Some(target) = dom::target_element(event) else {
            return;
        };
        let Some(item) = self.item_for(&target) else {
            return;
        };
        if let Some(transfer) = event.data_transfer() {
            transfer.set_effect_allowed("move");
            let id = dom::data(&item, "reorder-id").unwrap_or_default();
            let _ = transfer.set_data("text/plain", &id);
        }
        dom::set_class(&item, DRAGGING_CLASS, true);
        *self.order_at_start.borrow_mut() = self.order();
        *self.dragging.borrow_mut() = Some(item);
    }

    fn drag_over(&self, event: &DragEvent) {
        let Some(dragged) = self.dragging.borrow().clone() else {
            return;
        };
        event.prevent_default();
        let Some(target) = dom::target_element(event) else {
            return;
        };
        let Some(hovered) = self.item_for(&target) else {
            return;
        };
        if hovered == dragged {
            return;
        }
        let Some(parent) = hovered.parent_node() else {
            return;
        };
        let rect = hovered.get_bounding_client_rect();
        let placement = placement_for(f64::from(event.client_y()), rect.top(), rect.height());
        let (Some(dragged_id), Some(hovered_id)) =
            (dom::data(&dragged, "reorder-id"), dom::data(&hovered, "reorder-id"))
        else {
            return;
        };
        // dragover fires continuously; only touch the DOM when the order moves
        let mut order = self.order();
        if !move_item(&mut order, &dragged_id, &hovered_id, placement) {
            return;
        }
        let hovered_node: &Node = hovered.as_ref();
        let _ = match placement {
            DropPlacement::Before => parent.insert_before(&dragged, Some(hovered_node)),
            DropPlacement::After => {
                let next = hovered.next_sibling();
                parent.insert_before(&dragged, next.as_ref())
            }
        };
    }

    fn drag_end(&self) {
        let Some(item) = self.dragging.borrow_mut().take() else {
            return;
        };
        dom::set_class(&item, DRAGGING_CLASS, false);
        let before = std::mem::take(&mut *self.order_at_start.borrow_mut());
        let after = self.order();
        if before == after {
            return;
        }
        self.persist(after);
    }

    fn persist(&self, ids: Vec<String>) {
        let body = reorder_body(self.kind, &ids);
        let url = self.url.clone();
        diag::debug("reorder", format!("{url} <- {body}"));
        spawn_local(async move {
            if let Err(err) = net::post_json(&url, &body).await {
                diag::warn("reorder", format!("save failed: {err}"));
            }
        });
    }

    /// Re-appends items in start-time order and saves the result.
    fn sort_by_start(&self) {
        let items = self.items();
        let timed: Vec<TimedItem> = items
            .iter()
            .filter_map(|item| {
                Some(TimedItem {
                    id: dom::data(item, "reorder-id")?,
                    start: dom::data(item, "start").and_then(|raw| parse_flexible(&raw)),
                    name: dom::data(item, "sort-name").unwrap_or_else(|| dom::text(item)),
                })
            })
            .collect();
        let sorted = sort_by_time(&timed);
        if sorted == self.order() {
            return;
        }
        for id in &sorted {
            if let Some(item) = items
                .iter()
                .find(|item| dom::data(item, "reorder-id").as_deref() == Some(id.as_str()))
            {
                if let Some(parent) = item.parent_node() {
                    let _ = parent.append_child(item);
                }
            }
        }
        self.persist(sorted);
    }
}

fn attach(list: Rc<ReorderList>) {
    for item in list.items() {
        if let Some(item) = item.dyn_ref::<HtmlElement>() {
            item.set_draggable(true);
        }
    }
    let target = list.list.clone();
    let handle = list.clone();
    EventListener::new(&target, "dragstart", move |event: &Event| {
        if let Some(event) = event.dyn_ref::<DragEvent>() {
            handle.drag_start(event);
        }
    })
    .forget();
    let handle = list.clone();
    EventListener::new_with_options(
        &target,
        "dragover",
        EventListenerOptions::enable_prevent_default(),
        move |event: &Event| {
            if let Some(event) = event.dyn_ref::<DragEvent>() {
                handle.drag_over(event);
            }
        },
    )
    .forget();
    let handle = list.clone();
    EventListener::new_with_options(
        &target,
        "drop",
        EventListenerOptions::enable_prevent_default(),
        move |event: &Event| {
            if handle.dragging.borrow().is_some() {
                event.prevent_default();
            }
        },
    )
    .forget();
    let handle = list;
    EventListener::new(&target, "dragend", move |_| handle.drag_end()).forget();
}

pub(crate) fn install() {
    let mut lists: Vec<Rc<ReorderList>> = Vec::new();
    for element in dom::query_all("[data-reorder-list]") {
        let Some(list) = ReorderList::from_element(element.clone()) else {
            diag::warn("reorder", format!("list #{} lacks kind or url", element.id()));
            continue;
        };
        let list = Rc::new(list);
        attach(list.clone());
        lists.push(list);
    }
    for button in dom::query_all("[data-sort-by-time]") {
        let Some(list_id) = dom::data(&button, "sort-by-time") else {
            continue;
        };
        let Some(list) = lists.iter().find(|list| list.list.id() == list_id).cloned() else {
            diag::warn("reorder", format!("no reorder list #{list_id}"));
            continue;
        };
        EventListener::new(&button, "click", move |_| list.sort_by_start()).forget();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn fixture() -> Element {
        let list = dom::create("ul").expect("ul");
        list.set_id("blocks-t");
        list.set_attribute("data-reorder-list", "").expect("attr");
        list.set_attribute("data-reorder-kind", "blocks").expect("attr");
        list.set_attribute("data-reorder-parent", "5").expect("attr");
        list.set_inner_html(
            r#"<li data-reorder-id="11" data-start="2025-06-01 12:00">Noon</li>
               <li data-reorder-id="12">Unscheduled</li>
               <li data-reorder-id="13" data-start="2025-06-01 08:00">Early</li>"#,
        );
        dom::body().expect("body").append_child(&list).expect("append");
        list
    }

    #[wasm_bindgen_test]
    fn list_reads_kind_parent_and_order() {
        let element = fixture();
        let list = ReorderList::from_element(element.clone()).expect("list");
        assert_eq!(list.kind, ReorderKind::Blocks);
        assert_eq!(list.url, "/admin/station/5/blocks/reorder");
        assert_eq!(list.order(), vec!["11", "12", "13"]);
        element.remove();
    }

    #[wasm_bindgen_test]
    fn sort_by_start_moves_undated_items_last() {
        let element = fixture();
        let list = ReorderList::from_element(element.clone()).expect("list");
        list.sort_by_start();
        assert_eq!(list.order(), vec!["13", "11", "12"]);
        element.remove();
    }

    #[wasm_bindgen_test]
    fn dragging_above_an_item_moves_before_it() {
        let element = fixture();
        let list = Rc::new(ReorderList::from_element(element.clone()).expect("list"));
        let items = list.items();
        *list.dragging.borrow_mut() = Some(items[2].clone());
        let handle = list.clone();
        let _over = EventListener::new_with_options(
            &element,
            "dragover",
            EventListenerOptions::enable_prevent_default(),
            move |event: &Event| {
                if let Some(event) = event.dyn_ref::<DragEvent>() {
                    handle.drag_over(event);
                }
            },
        );
        let init = web_sys::DragEventInit::new();
        init.set_bubbles(true);
        init.set_cancelable(true);
        init.set_client_y(-1000);
        let event = DragEvent::new_with_event_init_dict("dragover", &init).expect("event");
        items[0].dispatch_event(&event).expect("dispatch");
        assert_eq!(list.order(), vec!["13", "11", "12"]);
        element.remove();
    }
}
