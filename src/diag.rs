use std::cell::Cell;

use wasm_bindgen::{JsCast, JsValue};

thread_local! {
    static DEBUG_ENABLED: Cell<bool> = Cell::new(false);
}

pub(crate) fn set_debug(enabled: bool) {
    DEBUG_ENABLED.with(|flag| flag.set(enabled));
}

pub(crate) fn debug_enabled() -> bool {
    DEBUG_ENABLED.with(Cell::get)
}

/// Verbose trace, only printed when `eventdesk.debug` is set in localStorage.
pub(crate) fn debug(scope: &str, detail: impl AsRef<str>) {
    if debug_enabled() {
        gloo::console::log!(format!("[{scope}]"), detail.as_ref());
    }
}

pub(crate) fn warn(scope: &str, detail: impl AsRef<str>) {
    gloo::console::warn!(format!("[{scope}]"), detail.as_ref());
}

pub(crate) fn error(scope: &str, detail: impl AsRef<str>) {
    gloo::console::error!(format!("[{scope}]"), detail.as_ref());
}

pub(crate) fn js_err(error: JsValue) -> String {
    if let Some(value) = error.as_string() {
        return value;
    }
    if let Some(error) = error.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    if let Ok(json) = js_sys::JSON::stringify(&error) {
        if let Some(value) = json.as_string() {
            return value;
        }
    }
    "js error".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn js_err_reads_error_messages() {
        let error = js_sys::Error::new("quota exceeded");
        assert_eq!(js_err(error.into()), "quota exceeded");
        assert_eq!(js_err(JsValue::from_str("plain")), "plain");
    }
}
