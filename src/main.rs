mod app_runtime;
mod assignment_ui;
mod capacity_edit;
mod clipboard;
mod datetime_bridge;
mod diag;
mod dom;
mod drag_reorder;
mod form_validation;
mod modal;
mod net;
mod page_config;
mod page_state;
mod panels;
mod review_list;
mod search_ui;
mod toast;
mod web_store;

use gloo::events::EventListener;

fn install_all() {
    toast::promote_flashes();
    modal::install();
    datetime_bridge::install();
    drag_reorder::install();
    capacity_edit::install();
    panels::install();
    search_ui::install();
    assignment_ui::install();
    form_validation::install();
    page_state::install();
    clipboard::install();
    diag::debug("boot", "page behaviours installed");
}

fn main() {
    console_error_panic_hook::set_once();
    let config = page_config::load_page_config();
    diag::set_debug(config.debug);
    app_runtime::set_page_config(config);

    let Some(document) = dom::document() else {
        return;
    };
    if document.ready_state() == "loading" {
        EventListener::once(&document, "DOMContentLoaded", |_| install_all()).forget();
    } else {
        install_all();
    }
}
