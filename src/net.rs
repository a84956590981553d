use gloo::net::http::{Request, Response};
use serde::Serialize;
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlInputElement, UrlSearchParams};

use crate::app_runtime;
use crate::diag;
use crate::dom;

const CSRF_HEADER: &str = "CSRF-Token";

/// JSON POST with the page's CSRF token. Non-2xx statuses are errors.
pub(crate) async fn post_json<T: Serialize + ?Sized>(url: &str, body: &T) -> Result<Response, String> {
    let token = app_runtime::csrf_token();
    let request = Request::post(url)
        .header(CSRF_HEADER, &token)
        .header("Accept", "application/json")
        .json(body)
        .map_err(|err| err.to_string())?;
    let response = request.send().await.map_err(|err| err.to_string())?;
    if !response.ok() {
        return Err(format!("{url} answered {}", response.status()));
    }
    Ok(response)
}

/// Form POST marked as XHR so the server answers with JSON instead of a
/// redirect. Returns the body text even for error statuses; callers decide.
pub(crate) async fn post_form(url: &str, body: String) -> Result<(u16, String), String> {
    let token = app_runtime::csrf_token();
    let request = Request::post(url)
        .header(CSRF_HEADER, &token)
        .header("X-Requested-With", "XMLHttpRequest")
        .header("Accept", "application/json")
        .header(
            "Content-Type",
            "application/x-www-form-urlencoded;charset=UTF-8",
        )
        .body(body)
        .map_err(|err| err.to_string())?;
    let response = request.send().await.map_err(|err| err.to_string())?;
    let status = response.status();
    let text = response.text().await.map_err(|err| err.to_string())?;
    Ok((status, text))
}

/// Url-encodes the successful controls of a form.
pub(crate) fn encode_form(form: &Element) -> Result<String, String> {
    let params = UrlSearchParams::new().map_err(diag::js_err)?;
    for field in dom::query_all_in(form, "input[name], select[name], textarea[name]") {
        if field.has_attribute("disabled") {
            continue;
        }
        let Some(name) = dom::attr(&field, "name") else {
            continue;
        };
        if let Some(input) = field.dyn_ref::<HtmlInputElement>() {
            match input.type_().as_str() {
                "submit" | "button" | "reset" | "file" | "image" => continue,
                "checkbox" | "radio" if !input.checked() => continue,
                _ => {}
            }
        }
        if let Some(value) = dom::field_value(&field) {
            params.append(&name, &value);
        }
    }
    Ok(String::from(params.to_string()))
}
