use yew::prelude::*;

use eventdesk_core::datetime::format_time_range;
use eventdesk_core::{Assignment, ParticipantKey, SlotKind};

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ReviewEntry {
    pub(crate) block_id: String,
    pub(crate) key: ParticipantKey,
    pub(crate) participant: String,
    pub(crate) title: String,
    pub(crate) when: String,
    pub(crate) dish: Option<String>,
}

impl ReviewEntry {
    pub(crate) fn from_assignment(assignment: &Assignment) -> Self {
        let title = match (&assignment.kind, &assignment.item_title) {
            (SlotKind::Potluck, Some(item)) => format!("{} \u{2013} {item}", assignment.station_name),
            _ => assignment.station_name.clone(),
        };
        Self {
            block_id: assignment.block_id.clone(),
            key: assignment.participant_key.clone(),
            participant: assignment.participant_name.clone(),
            title,
            when: format_time_range(assignment.start.as_ref(), assignment.end.as_ref()),
            dish: assignment.dish_name.clone(),
        }
    }
}

#[derive(Properties, Clone, PartialEq)]
pub(crate) struct ReviewListProps {
    pub(crate) entries: Vec<ReviewEntry>,
    pub(crate) on_remove: Callback<(String, ParticipantKey)>,
    #[prop_or(AttrValue::from("Nothing selected yet."))]
    pub(crate) empty_label: AttrValue,
}

#[function_component(ReviewList)]
pub(crate) fn review_list(props: &ReviewListProps) -> Html {
    if props.entries.is_empty() {
        return html! {
            <p class="review-empty">{ props.empty_label.clone() }</p>
        };
    }
    html! {
        <ul class="review-list">
            { for props.entries.iter().map(|entry| {
                let on_remove = props.on_remove.clone();
                let target = (entry.block_id.clone(), entry.key.clone());
                let onclick = Callback::from(move |_: MouseEvent| on_remove.emit(target.clone()));
                let label = format!("Remove {} from {}", entry.participant, entry.title);
                html! {
                    <li class="review-item" key={format!("{}:{}", entry.block_id, entry.key)}>
                        <span class="review-participant">{ entry.participant.clone() }</span>
                        <span class="review-slot">{ entry.title.clone() }</span>
                        if !entry.when.is_empty() {
                            <span class="review-when">{ entry.when.clone() }</span>
                        }
                        if let Some(dish) = &entry.dish {
                            <span class="review-dish">{ dish.clone() }</span>
                        }
                        <button type="button" class="review-remove" aria-label={label} {onclick}>
                            { "Remove" }
                        </button>
                    </li>
                }
            }) }
        </ul>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gloo::timers::future::TimeoutFuture;
    use wasm_bindgen_test::*;

    use crate::dom;

    wasm_bindgen_test_configure!(run_in_browser);

    fn entry(block_id: &str, participant: &str) -> ReviewEntry {
        ReviewEntry {
            block_id: block_id.to_string(),
            key: ParticipantKey::Index(0),
            participant: participant.to_string(),
            title: "Kitchen".to_string(),
            when: "Sun Jun 1 9:00 AM\u{2013}10:00 AM".to_string(),
            dish: None,
        }
    }

    #[wasm_bindgen_test]
    async fn renders_entries_then_empty_label() {
        console_error_panic_hook::set_once();
        let mount = dom::create("div").expect("mount");
        dom::body().expect("body").append_child(&mount).expect("append");
        let props = ReviewListProps {
            entries: vec![entry("1", "Rosa"), entry("2", "Rosa")],
            on_remove: Callback::noop(),
            empty_label: AttrValue::from("Nothing selected yet."),
        };
        let mut handle = yew::Renderer::<ReviewList>::with_root_and_props(mount.clone(), props).render();
        TimeoutFuture::new(20).await;
        assert_eq!(dom::query_all_in(&mount, ".review-item").len(), 2);

        handle.update(ReviewListProps {
            entries: Vec::new(),
            on_remove: Callback::noop(),
            empty_label: AttrValue::from("Nothing selected yet."),
        });
        TimeoutFuture::new(20).await;
        assert_eq!(dom::text(&mount), "Nothing selected yet.");
        handle.destroy();
        mount.remove();
    }
}
