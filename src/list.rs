use fixture_runtime::{set_no_cache_and_cors_headers, CorsConfig, Request, ResponseControl};
use serde_json::{Map, Value};

/// Answers with the request's cookies as a JSON object of name to raw value,
/// in the order the `Cookie` header listed them.
pub fn list_cookies(req: &Request, cors: &CorsConfig) -> ResponseControl {
    let mut res = ResponseControl::new();
    set_no_cache_and_cors_headers(req, &mut res, cors);

    let cookies: Map<String, Value> = req
        .cookie
        .iter()
        .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
        .collect();
    res.set_body(Value::Object(cookies).to_string());
    res
}
