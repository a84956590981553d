use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use gloo::events::{EventListener, EventListenerOptions};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, Event, HtmlInputElement, HtmlOptionElement, HtmlSelectElement};
use yew::{AppHandle, Callback};

use eventdesk_core::payload::parse_seed_assignments;
use eventdesk_core::steps::DUPLICATE_CHECK_PATH;
use eventdesk_core::validation::{participant_field_name, validate_details};
use eventdesk_core::{
    picker_view, AssignmentBook, DuplicateCheckRequest, DuplicateCheckResponse, DuplicateOutcome,
    FieldIssue, Participant, ParticipantKey, PickerChoice, PickerMemory, PickerView,
    RegistrationMode, RegistrationPayload, Registrant, SignupStep, Slot, SlotAction,
    SlotAttributes, SlotStatus, StepGate, PAYLOAD_FIELD_NAME,
};

use crate::app_runtime;
use crate::diag;
use crate::dom;
use crate::form_validation;
use crate::net;
use crate::page_state;
use crate::review_list::{ReviewEntry, ReviewList, ReviewListProps};

const ROOT_SELECTOR: &str = "form[data-assignment-form]";
const SLOT_SELECTOR: &str = "[data-slot]";
const PARTICIPANT_ROW: &str = "[data-participant-row]";
const PARTICIPANT_INPUT: &str = "input[data-participant-name]";
const REGISTRANT_FIELDS: [&str; 4] = ["first_name", "last_name", "email", "phone"];
const CHOOSE_FIRST: &str = "Choose a participant first.";
const PLACEHOLDER_LABEL: &str = "Choose participant";
const DEFAULT_ASSIGN_LABEL: &str = "Sign up";

struct SlotDom {
    block_id: String,
    element: Element,
    picker: Option<HtmlSelectElement>,
    action: Option<Element>,
    dish: Option<HtmlInputElement>,
    note: Option<Element>,
    remaining: Option<Element>,
    assign_label: String,
}

impl SlotDom {
    fn read(element: Element) -> Option<(Self, Slot)> {
        let attr = |name: &str| dom::data(&element, name).unwrap_or_default();
        let attrs = SlotAttributes {
            block_id: attr("block-id"),
            station_name: attr("station-name"),
            start: attr("start"),
            end: attr("end"),
            capacity: attr("capacity"),
            reserved: attr("reserved"),
            item_title: attr("item-title"),
            kind: attr("slot-kind"),
            dish_required: attr("dish-required"),
        };
        let slot = Slot::from_attributes(&attrs)?;
        let action = dom::query_in(&element, "[data-slot-action]");
        let assign_label = action
            .as_ref()
            .map(dom::text)
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| DEFAULT_ASSIGN_LABEL.to_string());
        let slot_dom = Self {
            block_id: slot.block_id.clone(),
            picker: dom::query_in(&element, "select[data-slot-picker]")
                .and_then(|el| el.dyn_into::<HtmlSelectElement>().ok()),
            action,
            dish: dom::query_in(&element, "input[data-dish-name]")
                .and_then(|el| el.dyn_into::<HtmlInputElement>().ok()),
            note: dom::query_in(&element, "[data-slot-note]"),
            remaining: dom::query_in(&element, "[data-slot-remaining]"),
            assign_label,
            element,
        };
        Some((slot_dom, slot))
    }
}

struct AssignmentState {
    book: AssignmentBook,
    registrant: Registrant,
    choices: HashMap<String, PickerChoice>,
    memory: PickerMemory,
    notes: HashMap<String, String>,
    gate: StepGate,
    checking_duplicate: bool,
}

pub(crate) struct AssignmentController {
    root: Element,
    mode: RegistrationMode,
    slots: Vec<SlotDom>,
    payload: Option<HtmlInputElement>,
    review_mount: Option<Element>,
    review: RefCell<Option<AppHandle<ReviewList>>>,
    state: RefCell<AssignmentState>,
    this: Weak<AssignmentController>,
}

thread_local! {
    static CONTROLLER: RefCell<Option<Rc<AssignmentController>>> = RefCell::new(None);
}

fn participant_rows(root: &Element) -> Vec<Element> {
    dom::query_all_in(root, PARTICIPANT_ROW)
}

fn participant_input(row: &Element) -> Option<Element> {
    dom::query_in(row, PARTICIPANT_INPUT)
}

/// Saved participants carry their id; rows added on this page are keyed by
/// position.
fn read_participants(root: &Element) -> Vec<Participant> {
    participant_rows(root)
        .iter()
        .enumerate()
        .map(|(position, row)| {
            let key = dom::data(row, "participant-id")
                .map(ParticipantKey::Id)
                .unwrap_or(ParticipantKey::Index(position));
            let name = participant_input(row)
                .and_then(|input| dom::field_value(&input))
                .unwrap_or_default();
            Participant::new(key, name)
        })
        .collect()
}

/// Tags participant inputs with their validation field name.
fn label_participant_inputs(root: &Element) {
    for (position, row) in participant_rows(root).iter().enumerate() {
        if let Some(input) = participant_input(row) {
            let _ = input.set_attribute("data-field", &participant_field_name(position));
        }
    }
}

fn read_registrant(root: &Element) -> Registrant {
    let value = |name: &str| {
        dom::query_in(root, &format!("[name=\"{name}\"]"))
            .and_then(|field| dom::field_value(&field))
            .unwrap_or_default()
    };
    Registrant {
        first_name: value("first_name"),
        last_name: value("last_name"),
        email: value("email"),
        phone: value("phone"),
    }
}

fn fill_picker(select: &HtmlSelectElement, view: &PickerView) {
    select.set_inner_html("");
    let append = |label: &str, value: &str| {
        if let Ok(option) = HtmlOptionElement::new_with_text_and_value(label, value) {
            let _ = select.append_child(&option);
        }
    };
    if view.show_placeholder {
        append(PLACEHOLDER_LABEL, "");
    }
    for option in &view.options {
        let label = if option.assigned {
            format!("{} (signed up)", option.label)
        } else if option.conflicted {
            format!("{} (time conflict)", option.label)
        } else {
            option.label.clone()
        };
        append(&label, &option.key.to_string());
    }
    let selected = view
        .selected
        .as_ref()
        .map(ParticipantKey::to_string)
        .unwrap_or_default();
    select.set_value(&selected);
    select.set_disabled(view.locked);
}

fn status_name(status: SlotStatus) -> &'static str {
    match status {
        SlotStatus::Open => "open",
        SlotStatus::PartiallyAssigned => "partial",
        SlotStatus::Full => "full",
    }
}

fn remaining_text(remaining: Option<u32>) -> String {
    match remaining {
        None => "Unlimited spots".to_string(),
        Some(0) => "Full".to_string(),
        Some(1) => "1 spot left".to_string(),
        Some(n) => format!("{n} spots left"),
    }
}

/// Shifts a position key after the participant at `removed_at` left.
fn shift_key(key: &ParticipantKey, removed_at: usize) -> ParticipantKey {
    match key {
        ParticipantKey::Index(index) if *index > removed_at => ParticipantKey::Index(index - 1),
        other => other.clone(),
    }
}

impl AssignmentController {
    fn build(root: Element, mode: RegistrationMode) -> Rc<Self> {
        let mut slots = Vec::new();
        let mut slot_models = Vec::new();
        for element in dom::query_all_in(&root, SLOT_SELECTOR) {
            match SlotDom::read(element) {
                Some((slot_dom, slot)) => {
                    slots.push(slot_dom);
                    slot_models.push(slot);
                }
                None => diag::warn("assign", "slot without data-block-id skipped"),
            }
        }
        label_participant_inputs(&root);
        let mut book = AssignmentBook::new(mode, slot_models, read_participants(&root));
        if let Some(script) = dom::by_id("initial-assignments") {
            match parse_seed_assignments(&script.text_content().unwrap_or_default()) {
                Ok(seeds) => book.seed(seeds.iter().filter_map(|seed| {
                    Some((
                        seed.block_id.as_str(),
                        seed.participant_key()?,
                        seed.dish_name.as_deref(),
                    ))
                })),
                Err(err) => diag::warn("assign", format!("initial assignments unreadable: {err}")),
            }
        }
        let gate = match mode {
            RegistrationMode::Manage => StepGate::open(),
            RegistrationMode::Signup => StepGate::new(),
        };
        let payload = dom::query_in(&root, &format!("input[name=\"{PAYLOAD_FIELD_NAME}\"]"))
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok());
        let review_mount = dom::query_in(&root, "[data-review-list]");
        let registrant = read_registrant(&root);
        Rc::new_cyclic(|this| Self {
            root,
            mode,
            slots,
            payload,
            review_mount,
            review: RefCell::new(None),
            state: RefCell::new(AssignmentState {
                book,
                registrant,
                choices: HashMap::new(),
                memory: PickerMemory::default(),
                notes: HashMap::new(),
                gate,
                checking_duplicate: false,
            }),
            this: this.clone(),
        })
    }

    fn slot_dom(&self, block_id: &str) -> Option<&SlotDom> {
        self.slots.iter().find(|slot| slot.block_id == block_id)
    }

    fn slot_for(&self, target: &Element) -> Option<&SlotDom> {
        let element = dom::closest(target, SLOT_SELECTOR)?;
        self.slots.iter().find(|slot| slot.element == element)
    }

    fn pick(&self, block_id: &str, raw: &str) {
        {
            let mut state = self.state.borrow_mut();
            let choice = match ParticipantKey::parse(raw) {
                Ok(key) => {
                    state.memory.remember(key.clone());
                    PickerChoice::Chosen(key)
                }
                Err(_) => PickerChoice::Placeholder,
            };
            state.choices.insert(block_id.to_string(), choice);
            state.notes.remove(block_id);
        }
        self.render();
    }

    /// The slot button: adds the picked participant, or removes them when
    /// already signed up there.
    fn act(&self, block_id: &str) {
        let dish = self
            .slot_dom(block_id)
            .and_then(|slot| slot.dish.as_ref())
            .map(HtmlInputElement::value);
        {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            let choice = state.choices.get(block_id).cloned().unwrap_or_default();
            let Some(view) = picker_view(&state.book, block_id, &choice, &state.memory) else {
                return;
            };
            match (view.action, view.selected) {
                (_, None) => {
                    state.notes.insert(block_id.to_string(), CHOOSE_FIRST.to_string());
                }
                (SlotAction::Remove, Some(key)) => {
                    state.book.remove(block_id, &key);
                    state.notes.remove(block_id);
                    if state.book.participants().len() > 1 {
                        state.choices.insert(block_id.to_string(), PickerChoice::Placeholder);
                    }
                }
                (_, Some(key)) => match state.book.add(block_id, &key, dish.as_deref()) {
                    Ok(assignment) => {
                        diag::debug("assign", format!("added {}", assignment.slot_id));
                        state.notes.remove(block_id);
                    }
                    Err(err) => {
                        state.notes.insert(block_id.to_string(), err.to_string());
                    }
                },
            }
        }
        self.render();
    }

    /// Dish edits after signing up update the saved entry in place.
    fn edit_dish(&self, block_id: &str, dish: &str) {
        {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            let choice = state.choices.get(block_id).cloned().unwrap_or_default();
            let Some(key) = picker_view(&state.book, block_id, &choice, &state.memory)
                .and_then(|view| view.selected)
                .filter(|key| state.book.is_assigned(block_id, key))
            else {
                return;
            };
            state.book.set_dish_name(block_id, &key, dish);
        }
        self.render();
    }

    fn remove_from_review(&self, block_id: &str, key: &ParticipantKey) {
        {
            let mut state = self.state.borrow_mut();
            if state.book.remove(block_id, key).is_none() {
                return;
            }
            if state.book.participants().len() > 1 {
                state.choices.insert(block_id.to_string(), PickerChoice::Placeholder);
            }
        }
        self.render();
    }

    fn details_changed(&self) {
        let mut state = self.state.borrow_mut();
        state.registrant = read_registrant(&self.root);
        if self.mode == RegistrationMode::Signup && state.gate.invalidate() {
            diag::debug("assign", "details edited; later steps hidden");
        }
    }

    fn rename(&self, input: &Element) {
        let Some(row) = dom::closest(input, PARTICIPANT_ROW) else {
            return;
        };
        let rows = participant_rows(&self.root);
        let Some(position) = rows.iter().position(|candidate| candidate == &row) else {
            return;
        };
        let name = dom::field_value(input).unwrap_or_default();
        {
            let mut state = self.state.borrow_mut();
            let key = state
                .book
                .participants()
                .get(position)
                .map(|participant| participant.key.clone());
            if let Some(key) = key {
                state.book.rename_participant(&key, &name);
            }
        }
        self.details_changed();
        self.render();
    }

    fn add_participant_row(&self) {
        let rows = participant_rows(&self.root);
        let Some(template) = rows.last() else {
            return;
        };
        let Ok(clone) = template.clone_node_with_deep(true) else {
            return;
        };
        let Ok(row) = clone.dyn_into::<Element>() else {
            return;
        };
        let _ = row.remove_attribute("data-participant-id");
        for field in dom::query_all_in(&row, "input") {
            dom::set_field_value(&field, "");
            let _ = field.remove_attribute("aria-invalid");
        }
        let Some(parent) = template.parent_node() else {
            return;
        };
        let _ = parent.insert_before(&row, template.next_sibling().as_ref());
        label_participant_inputs(&self.root);
        self.state.borrow_mut().book.add_participant("");
        self.details_changed();
        self.render();
        if let Some(input) = participant_input(&row) {
            dom::focus(&input);
        }
    }

    fn remove_participant_row(&self, row: &Element) {
        let rows = participant_rows(&self.root);
        if rows.len() <= 1 {
            return;
        }
        let Some(position) = rows.iter().position(|candidate| candidate == row) else {
            return;
        };
        {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            let Some(key) = state
                .book
                .participants()
                .get(position)
                .map(|participant| participant.key.clone())
            else {
                return;
            };
            state.book.remove_participant(&key);
            state.memory.forget(&key);
            if let Some(last) = state.memory.last().cloned() {
                state.memory.remember(shift_key(&last, position));
            }
            for choice in state.choices.values_mut() {
                if let PickerChoice::Chosen(chosen) = choice {
                    *choice = if *chosen == key {
                        PickerChoice::Placeholder
                    } else {
                        PickerChoice::Chosen(shift_key(chosen, position))
                    };
                }
            }
        }
        row.remove();
        label_participant_inputs(&self.root);
        self.details_changed();
        self.render();
    }

    fn step_sections(&self) -> Vec<(SignupStep, Element)> {
        dom::query_all_in(&self.root, "[data-step]")
            .into_iter()
            .filter_map(|section| {
                let step = SignupStep::parse(&dom::data(&section, "step")?)?;
                Some((step, section))
            })
            .collect()
    }

    fn details_scope(&self) -> Element {
        self.step_sections()
            .into_iter()
            .find(|(step, _)| *step == SignupStep::Details)
            .map(|(_, section)| section)
            .unwrap_or_else(|| self.root.clone())
    }

    /// "Continue" on step 1: validate locally, then ask the server whether
    /// this email already registered.
    fn continue_from_details(&self) {
        let (registrant, issues) = {
            let mut state = self.state.borrow_mut();
            if state.checking_duplicate {
                return;
            }
            state.registrant = read_registrant(&self.root);
            let issues = validate_details(&state.registrant, state.book.participants());
            (state.registrant.clone(), issues)
        };
        let scope = self.details_scope();
        if !issues.is_empty() {
            form_validation::render_errors(&scope, &issues);
            return;
        }
        form_validation::clear_errors(&scope);
        let config = app_runtime::page_config();
        let Some(event_id) = config.event_id.filter(|_| self.mode == RegistrationMode::Signup) else {
            self.finish_details(DuplicateOutcome::Clear);
            return;
        };
        self.state.borrow_mut().checking_duplicate = true;
        let request = DuplicateCheckRequest {
            event_id,
            email: registrant.email.trim().to_string(),
            csrf: config.csrf_token,
        };
        let this = self.this.clone();
        spawn_local(async move {
            let result = match net::post_json(DUPLICATE_CHECK_PATH, &request).await {
                Ok(response) => response
                    .json::<DuplicateCheckResponse>()
                    .await
                    .map_err(|err| err.to_string()),
                Err(err) => Err(err),
            };
            if let Err(err) = &result {
                diag::debug("assign", format!("duplicate check skipped: {err}"));
            }
            if let Some(controller) = this.upgrade() {
                controller.state.borrow_mut().checking_duplicate = false;
                controller.finish_details(DuplicateOutcome::from_result(result));
            }
        });
    }

    fn finish_details(&self, outcome: DuplicateOutcome) {
        let scope = self.details_scope();
        if let Some(message) = outcome.message() {
            form_validation::render_errors(&scope, &[FieldIssue::new("email", message)]);
            if let DuplicateOutcome::Existing {
                manage_url: Some(url),
            } = &outcome
            {
                if let Some(list) = dom::query_in(&scope, ".form-errors") {
                    if let Some(link) = dom::create("a") {
                        let _ = link.set_attribute("href", url);
                        dom::set_text(&link, "Manage your existing registration");
                        if let Some(item) = dom::create("li") {
                            let _ = item.append_child(&link);
                            let _ = list.append_child(&item);
                        }
                    }
                }
            }
            return;
        }
        self.state.borrow_mut().gate.complete();
        self.render();
        let next = self
            .step_sections()
            .into_iter()
            .find(|(step, _)| *step == SignupStep::Assign);
        if let Some((_, section)) = next {
            page_state::scroll_to(&section);
        }
    }

    /// Last check before the form posts: details, step gate and the whole
    /// assignment book.
    fn submit_issues(&self) -> Vec<FieldIssue> {
        let mut state = self.state.borrow_mut();
        state.registrant = read_registrant(&self.root);
        let mut issues = Vec::new();
        if self.mode == RegistrationMode::Signup {
            issues.extend(validate_details(&state.registrant, state.book.participants()));
            if issues.is_empty() && !state.gate.is_complete() {
                issues.push(FieldIssue::new(
                    "step",
                    "Press Continue to confirm your details first.",
                ));
            }
        }
        issues.extend(
            state
                .book
                .validate()
                .into_iter()
                .map(|err| FieldIssue::new("assignments", err.to_string())),
        );
        issues
    }

    fn submit(&self, event: &Event) {
        let issues = self.submit_issues();
        if issues.is_empty() {
            form_validation::clear_errors(&self.root);
            self.render();
            return;
        }
        event.prevent_default();
        form_validation::render_errors(&self.root, &issues);
    }

    fn render_slot(&self, slot: &SlotDom, state: &AssignmentState) {
        let choice = state.choices.get(&slot.block_id).cloned().unwrap_or_default();
        let Some(view) = picker_view(&state.book, &slot.block_id, &choice, &state.memory) else {
            return;
        };
        if let Some(picker) = &slot.picker {
            fill_picker(picker, &view);
        }
        if let Some(action) = &slot.action {
            dom::set_text(action, &view.action.label(&slot.assign_label));
            dom::set_disabled(action, !view.enabled);
        }
        let _ = slot.element.set_attribute("data-slot-status", status_name(view.status));
        dom::set_class(&slot.element, "is-full", view.status == SlotStatus::Full);
        if let Some(remaining) = &slot.remaining {
            dom::set_text(remaining, &remaining_text(view.remaining));
        }
        if let Some(note) = &slot.note {
            let message = state.notes.get(&slot.block_id).map(String::as_str).unwrap_or("");
            dom::set_text(note, message);
            dom::set_hidden(note, message.is_empty());
        }
    }

    fn render_steps(&self, gate: &StepGate) {
        if self.mode == RegistrationMode::Manage {
            return;
        }
        for (step, section) in self.step_sections() {
            dom::set_hidden(&section, !gate.is_visible(step));
        }
    }

    fn review_props(&self, entries: Vec<ReviewEntry>) -> ReviewListProps {
        let this = self.this.clone();
        ReviewListProps {
            entries,
            on_remove: Callback::from(move |(block_id, key): (String, ParticipantKey)| {
                if let Some(controller) = this.upgrade() {
                    controller.remove_from_review(&block_id, &key);
                }
            }),
            empty_label: "Nothing selected yet.".into(),
        }
    }

    fn render_review(&self, entries: Vec<ReviewEntry>) {
        let Some(mount) = &self.review_mount else {
            return;
        };
        let props = self.review_props(entries);
        let mut review = self.review.borrow_mut();
        match review.as_mut() {
            Some(handle) => handle.update(props),
            None => {
                *review = Some(
                    yew::Renderer::<ReviewList>::with_root_and_props(mount.clone(), props).render(),
                );
            }
        }
    }

    fn write_payload(&self, payload: &RegistrationPayload) {
        let Some(input) = &self.payload else {
            return;
        };
        match payload.to_json() {
            Ok(json) => input.set_value(&json),
            Err(err) => diag::error("assign", format!("payload not serialisable: {err}")),
        }
    }

    pub(crate) fn render(&self) {
        let (entries, payload, gate) = {
            let state = self.state.borrow();
            for slot in &self.slots {
                self.render_slot(slot, &state);
            }
            let entries: Vec<ReviewEntry> = state
                .book
                .assignments()
                .iter()
                .map(ReviewEntry::from_assignment)
                .collect();
            let payload = RegistrationPayload::build(&state.registrant, &state.book);
            (entries, payload, state.gate.clone())
        };
        self.render_steps(&gate);
        self.write_payload(&payload);
        self.render_review(entries);
    }

    fn handle_click(&self, event: &Event) {
        let Some(target) = dom::target_element(event) else {
            return;
        };
        if dom::closest(&target, "[data-slot-action]").is_some() {
            event.prevent_default();
            if let Some(block_id) = self.slot_for(&target).map(|slot| slot.block_id.clone()) {
                self.act(&block_id);
            }
        } else if dom::closest(&target, "[data-add-participant]").is_some() {
            event.prevent_default();
            self.add_participant_row();
        } else if dom::closest(&target, "[data-remove-participant]").is_some() {
            event.prevent_default();
            if let Some(row) = dom::closest(&target, PARTICIPANT_ROW) {
                self.remove_participant_row(&row);
            }
        } else if dom::closest(&target, "[data-step-continue]").is_some() {
            event.prevent_default();
            self.continue_from_details();
        }
    }

    fn handle_change(&self, event: &Event) {
        let Some(target) = dom::target_element(event) else {
            return;
        };
        if target.matches("select[data-slot-picker]").unwrap_or(false) {
            let value = dom::field_value(&target).unwrap_or_default();
            if let Some(block_id) = self.slot_for(&target).map(|slot| slot.block_id.clone()) {
                self.pick(&block_id, &value);
            }
        }
    }

    fn handle_input(&self, event: &Event) {
        let Some(target) = dom::target_element(event) else {
            return;
        };
        if target.matches(PARTICIPANT_INPUT).unwrap_or(false) {
            self.rename(&target);
            return;
        }
        if target.matches("input[data-dish-name]").unwrap_or(false) {
            if let Some(block_id) = self.slot_for(&target).map(|slot| slot.block_id.clone()) {
                self.edit_dish(&block_id, &dom::field_value(&target).unwrap_or_default());
            }
            return;
        }
        let is_registrant_field = dom::attr(&target, "name")
            .map(|name| REGISTRANT_FIELDS.contains(&name.as_str()))
            .unwrap_or(false);
        if is_registrant_field {
            self.details_changed();
            self.render();
        }
    }
}

fn listen(controller: &Rc<AssignmentController>) {
    let root = controller.root.clone();
    let handle = controller.clone();
    EventListener::new_with_options(
        &root,
        "click",
        EventListenerOptions::enable_prevent_default(),
        move |event: &Event| handle.handle_click(event),
    )
    .forget();
    let handle = controller.clone();
    EventListener::new(&root, "change", move |event: &Event| handle.handle_change(event)).forget();
    let handle = controller.clone();
    EventListener::new(&root, "input", move |event: &Event| handle.handle_input(event)).forget();
    let handle = controller.clone();
    EventListener::new_with_options(
        &root,
        "submit",
        EventListenerOptions::enable_prevent_default(),
        move |event: &Event| handle.submit(event),
    )
    .forget();
}

pub(crate) fn install() {
    let Some(root) = dom::query(ROOT_SELECTOR) else {
        return;
    };
    let mode = dom::data(&root, "mode")
        .map(|raw| RegistrationMode::parse(&raw))
        .unwrap_or_else(|| app_runtime::page_config().mode);
    let controller = AssignmentController::build(root, mode);
    listen(&controller);
    controller.render();
    diag::debug(
        "assign",
        format!(
            "{} slot(s), {} participant(s)",
            controller.slots.len(),
            controller.state.borrow().book.participants().len()
        ),
    );
    CONTROLLER.with(|slot| *slot.borrow_mut() = Some(controller));
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    const FORM: &str = r#"
        <section data-step="1">
          <input name="first_name" value="Rosa">
          <input name="last_name" value="Diaz">
          <input name="email" value="rosa@example.org">
          <input name="phone" value="">
          <div data-participant-row><input data-participant-name value="Rosa"></div>
          <div data-participant-row><input data-participant-name value="Sam"></div>
          <button type="button" data-step-continue>Continue</button>
        </section>
        <section data-step="2">
          <div data-slot data-block-id="1" data-station-name="Kitchen"
               data-start="2025-06-01 09:00" data-end="2025-06-01 10:00" data-capacity="2" data-reserved="1">
            <select data-slot-picker></select>
            <button type="button" data-slot-action>Sign up</button>
            <p data-slot-note hidden></p>
            <span data-slot-remaining></span>
          </div>
          <div data-slot data-block-id="2" data-station-name="Gate"
               data-start="2025-06-01 09:30" data-end="2025-06-01 10:30">
            <select data-slot-picker></select>
            <button type="button" data-slot-action>Sign up</button>
            <p data-slot-note hidden></p>
          </div>
        </section>
        <section data-step="3"></section>
        <input type="hidden" name="registration-payload">
    "#;

    fn fixture() -> (Element, Rc<AssignmentController>) {
        let form = dom::create("form").expect("form");
        form.set_attribute("data-assignment-form", "").expect("attr");
        form.set_inner_html(FORM);
        dom::body().expect("body").append_child(&form).expect("append");
        let controller = AssignmentController::build(form.clone(), RegistrationMode::Signup);
        controller.render();
        (form, controller)
    }

    fn slot_text(form: &Element, block_id: &str, selector: &str) -> String {
        let slot = dom::query_in(form, &format!("[data-block-id=\"{block_id}\"]")).expect("slot");
        dom::text(&dom::query_in(&slot, selector).expect("part"))
    }

    #[wasm_bindgen_test]
    fn later_steps_stay_hidden_until_details_pass() {
        let (form, controller) = fixture();
        let step_two = dom::query_in(&form, "[data-step=\"2\"]").expect("step 2");
        assert!(dom::is_hidden(&step_two));
        controller.finish_details(DuplicateOutcome::Clear);
        assert!(!dom::is_hidden(&step_two));

        let email = dom::query_in(&form, "[name=\"email\"]").expect("email");
        dom::set_field_value(&email, "rosa@example.net");
        controller.details_changed();
        controller.render();
        assert!(dom::is_hidden(&step_two));
        form.remove();
    }

    #[wasm_bindgen_test]
    fn assigning_fills_the_slot_and_payload() {
        let (form, controller) = fixture();
        controller.act("1");
        assert_eq!(slot_text(&form, "1", "[data-slot-note]"), CHOOSE_FIRST);

        controller.pick("1", "idx:0");
        controller.act("1");
        assert_eq!(slot_text(&form, "1", "[data-slot-action]"), "Remove");
        assert_eq!(slot_text(&form, "1", "[data-slot-remaining]"), "Full");

        let payload = dom::query_in(&form, "[name=\"registration-payload\"]").expect("payload");
        let json: serde_json::Value =
            serde_json::from_str(&dom::field_value(&payload).expect("value")).expect("json");
        assert_eq!(json["partySize"], 2);
        assert_eq!(json["scheduleAssignments"][0]["blockId"], "1");
        assert_eq!(json["scheduleAssignments"][0]["participantIndex"], 0);
        form.remove();
    }

    #[wasm_bindgen_test]
    fn overlapping_pick_is_refused_with_a_note() {
        let (form, controller) = fixture();
        controller.pick("1", "idx:0");
        controller.act("1");
        controller.pick("2", "idx:0");
        assert_eq!(slot_text(&form, "2", "[data-slot-action]"), "Time conflict");
        controller.act("2");
        assert!(slot_text(&form, "2", "[data-slot-note]").contains("Rosa"));
        assert_eq!(controller.state.borrow().book.assignments().len(), 1);
        form.remove();
    }

    #[wasm_bindgen_test]
    fn removing_a_row_drops_its_assignments() {
        let (form, controller) = fixture();
        controller.pick("2", "idx:1");
        controller.act("2");
        let rows = participant_rows(&form);
        controller.remove_participant_row(&rows[1]);
        let state = controller.state.borrow();
        assert_eq!(state.book.participants().len(), 1);
        assert!(state.book.assignments().is_empty());
        drop(state);
        form.remove();
    }

    fn picker_value(form: &Element, block_id: &str) -> String {
        let slot = dom::query_in(form, &format!("[data-block-id=\"{block_id}\"]")).expect("slot");
        let picker = dom::query_in(&slot, "select[data-slot-picker]").expect("picker");
        dom::field_value(&picker).unwrap_or_default()
    }

    #[wasm_bindgen_test]
    fn removing_from_the_slot_resets_the_picker() {
        let (form, controller) = fixture();
        controller.pick("2", "idx:1");
        controller.act("2");
        assert_eq!(picker_value(&form, "2"), "idx:1");
        assert_eq!(slot_text(&form, "2", "[data-slot-action]"), "Remove");

        controller.act("2");
        assert!(controller.state.borrow().book.assignments().is_empty());
        assert_eq!(picker_value(&form, "2"), "");
        assert_eq!(slot_text(&form, "2", "[data-slot-action]"), "Sign up");
        form.remove();
    }

    #[wasm_bindgen_test]
    fn removing_from_the_review_resets_the_picker() {
        let (form, controller) = fixture();
        controller.pick("1", "idx:0");
        controller.act("1");
        controller.remove_from_review("1", &ParticipantKey::Index(0));
        assert!(controller.state.borrow().book.assignments().is_empty());
        assert_eq!(picker_value(&form, "1"), "");
        form.remove();
    }

    #[wasm_bindgen_test]
    fn existing_registration_keeps_later_steps_hidden() {
        let (form, controller) = fixture();
        controller.finish_details(DuplicateOutcome::Existing {
            manage_url: Some("/manage/abc".into()),
        });
        assert!(!controller.state.borrow().gate.is_complete());
        let step_two = dom::query_in(&form, "[data-step=\"2\"]").expect("step 2");
        assert!(dom::is_hidden(&step_two));
        let errors = dom::query_in(&form, ".form-errors").expect("errors");
        assert!(dom::text(&errors).contains("already registered"));
        let link = dom::query_in(&errors, "a").expect("manage link");
        assert_eq!(link.get_attribute("href").as_deref(), Some("/manage/abc"));
        form.remove();
    }
}
