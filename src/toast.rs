use gloo::events::EventListener;
use gloo::timers::callback::Timeout;
use web_sys::Element;

use crate::diag;
use crate::dom;

const REGION_ID: &str = "toast-region";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ToastKind {
    Success,
    Info,
    Error,
}

impl ToastKind {
    pub(crate) fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "success" | "ok" | "notice" => Self::Success,
            "error" | "danger" | "alert" | "warning" => Self::Error,
            _ => Self::Info,
        }
    }

    fn class_name(self) -> &'static str {
        match self {
            Self::Success => "toast-success",
            Self::Info => "toast-info",
            Self::Error => "toast-error",
        }
    }

    fn role(self) -> &'static str {
        match self {
            Self::Error => "alert",
            _ => "status",
        }
    }

    // errors stay up until dismissed
    fn dismiss_after_ms(self) -> Option<u32> {
        match self {
            Self::Success => Some(4_000),
            Self::Info => Some(6_000),
            Self::Error => None,
        }
    }
}

fn region() -> Option<Element> {
    if let Some(region) = dom::by_id(REGION_ID) {
        return Some(region);
    }
    let region = dom::create("div")?;
    region.set_id(REGION_ID);
    region.set_class_name("toast-region");
    let _ = region.set_attribute("aria-live", "polite");
    dom::body()?.append_child(&region).ok()?;
    Some(region)
}

pub(crate) fn show(kind: ToastKind, message: &str) {
    let message = message.trim();
    if message.is_empty() {
        return;
    }
    let Some(region) = region() else {
        diag::warn("toast", message);
        return;
    };
    let Some(toast) = dom::create("div") else {
        return;
    };
    toast.set_class_name(&format!("toast {}", kind.class_name()));
    let _ = toast.set_attribute("role", kind.role());
    if let Some(text) = dom::create("span") {
        text.set_class_name("toast-message");
        dom::set_text(&text, message);
        let _ = toast.append_child(&text);
    }
    if let Some(button) = dom::create("button") {
        button.set_class_name("toast-dismiss");
        let _ = button.set_attribute("type", "button");
        let _ = button.set_attribute("aria-label", "Dismiss");
        dom::set_text(&button, "\u{00d7}");
        let _ = toast.append_child(&button);
        let target = toast.clone();
        EventListener::once(&button, "click", move |_| target.remove()).forget();
    }
    let _ = region.append_child(&toast);
    diag::debug("toast", message);
    if let Some(delay) = kind.dismiss_after_ms() {
        Timeout::new(delay, move || toast.remove()).forget();
    }
}

pub(crate) fn success(message: &str) {
    show(ToastKind::Success, message);
}

pub(crate) fn error(message: &str) {
    show(ToastKind::Error, message);
}

/// Turns server-rendered `[data-flash]` messages into toasts.
pub(crate) fn promote_flashes() {
    for flash in dom::query_all("[data-flash]") {
        let kind = ToastKind::parse(&dom::data(&flash, "flash").unwrap_or_default());
        let message = dom::text(&flash);
        flash.remove();
        show(kind, &message);
    }
}
