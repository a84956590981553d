use eventdesk_core::RegistrationMode;

use crate::dom;
use crate::web_store;

/// Values the server renders into the page shell.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct PageConfig {
    pub(crate) csrf_token: String,
    pub(crate) event_id: Option<String>,
    pub(crate) mode: RegistrationMode,
    pub(crate) path: String,
    pub(crate) debug: bool,
}

pub(crate) fn load_page_config() -> PageConfig {
    let csrf_token = dom::query("meta[name=\"csrf-token\"]")
        .and_then(|meta| dom::attr(&meta, "content"))
        .unwrap_or_default();
    let body = dom::document().and_then(|document| document.body());
    let event_id = body
        .as_ref()
        .and_then(|body| dom::data(body, "event-id"));
    let mode = body
        .as_ref()
        .and_then(|body| dom::data(body, "registration-mode"))
        .map(|raw| RegistrationMode::parse(&raw))
        .unwrap_or_default();
    let path = web_sys::window()
        .and_then(|window| window.location().pathname().ok())
        .unwrap_or_else(|| "/".to_string());
    PageConfig {
        csrf_token,
        event_id,
        mode,
        path,
        debug: web_store::preference_store().debug_enabled(),
    }
}
