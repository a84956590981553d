use std::cell::RefCell;

use crate::page_config::{self, PageConfig};

thread_local! {
    static PAGE_CONFIG: RefCell<Option<PageConfig>> = RefCell::new(None);
}

pub(crate) fn set_page_config(config: PageConfig) {
    PAGE_CONFIG.with(|slot| {
        *slot.borrow_mut() = Some(config);
    });
}

pub(crate) fn page_config() -> PageConfig {
    PAGE_CONFIG.with(|slot| slot.borrow().clone())
        .unwrap_or_else(page_config::load_page_config)
}

pub(crate) fn csrf_token() -> String {
    page_config().csrf_token
}
