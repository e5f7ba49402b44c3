//! Sets or drops cookies named in the query string.
//!
//! `?set=` and `?drop=` each carry a percent-encoded JSON string or array of
//! strings, every string being a complete `Set-Cookie` value such as
//! `"name=value; Path=/"`. Dropping appends `; max-age=0` to the value as
//! given, so attribute combinations like a bare `Path` survive untouched.
//! `?location=` turns the answer into a 302.

use axum::http::HeaderValue;
use fixture_runtime::{set_no_cache_and_cors_headers, CorsConfig, Request, ResponseControl};
use percent_encoding::percent_decode_str;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub const SUCCESS_BODY: &[u8] = br#"{"success": true}"#;
pub const REDIRECT_BODY: &[u8] = br#"{"redirect": true}"#;

const DROP_SUFFIX: &[u8] = b"; max-age=0";

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("invalid JSON in `{param}`: {source}")]
    Json {
        param: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("`{param}` must be a string or an array of strings, found {found}")]
    Shape {
        param: &'static str,
        found: &'static str,
    },
    #[error("{0:?} is not a valid header value")]
    HeaderValue(String),
}

/// A decoded `set` or `drop` parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum CookieSpec {
    Single(String),
    Multiple(Vec<String>),
}

impl CookieSpec {
    /// Percent-decodes `raw` once more and parses it as JSON.
    pub fn decode(param: &'static str, raw: &str) -> Result<Self, ProcessingError> {
        let text = unquote(raw);
        let value: Value =
            serde_json::from_str(&text).map_err(|source| ProcessingError::Json { param, source })?;
        Self::from_value(param, value)
    }

    fn from_value(param: &'static str, value: Value) -> Result<Self, ProcessingError> {
        match value {
            Value::String(s) => Ok(CookieSpec::Single(s)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(ProcessingError::Shape {
                        param,
                        found: json_kind(&other),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(CookieSpec::Multiple),
            other => Err(ProcessingError::Shape {
                param,
                found: json_kind(&other),
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            CookieSpec::Single(s) => std::slice::from_ref(s),
            CookieSpec::Multiple(v) => v,
        };
        values.iter().map(String::as_str)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Percent-decoding without form rules: `+` stays a plus.
fn unquote(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

fn checked(bytes: Vec<u8>) -> Result<Vec<u8>, ProcessingError> {
    match HeaderValue::from_bytes(&bytes) {
        Ok(_) => Ok(bytes),
        Err(_) => Err(ProcessingError::HeaderValue(
            String::from_utf8_lossy(&bytes).into_owned(),
        )),
    }
}

fn set_cookie(res: &mut ResponseControl, cookie: &str, drop: bool) -> Result<(), ProcessingError> {
    let mut value = cookie.as_bytes().to_vec();
    if drop {
        value.extend_from_slice(DROP_SUFFIX);
    }
    res.add_header("Set-Cookie", checked(value)?);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Redirect,
}

/// Applies `drop`, then `set`, then `location` to `res`. Headers appended
/// before an error stay on the response.
pub fn process(req: &Request, res: &mut ResponseControl) -> Result<Outcome, ProcessingError> {
    if let Some(raw) = req.get.get("drop") {
        for cookie in CookieSpec::decode("drop", raw)?.iter() {
            set_cookie(res, cookie, true)?;
        }
    }

    if let Some(raw) = req.get.get("set") {
        for cookie in CookieSpec::decode("set", raw)?.iter() {
            set_cookie(res, cookie, false)?;
        }
    }

    if let Some(raw) = req.get.get("location") {
        let location = checked(unquote(raw).into_bytes())?;
        res.add_header("Location", location);
        return Ok(Outcome::Redirect);
    }

    Ok(Outcome::Success)
}

pub struct CookieResponder {
    cors: CorsConfig,
}

impl CookieResponder {
    pub fn new(cors: CorsConfig) -> Self {
        CookieResponder { cors }
    }

    pub fn respond(&self, req: &Request) -> ResponseControl {
        let mut res = ResponseControl::new();
        set_no_cache_and_cors_headers(req, &mut res, &self.cors);

        match process(req, &mut res) {
            Ok(Outcome::Success) => res.set_body(SUCCESS_BODY),
            Ok(Outcome::Redirect) => {
                res.status_code = 302;
                res.set_body(REDIRECT_BODY);
            }
            Err(e) => {
                warn!(error = %e, path = req.path(), "cookie request failed");
                res.status_code = 500;
                res.set_body(error_body(&e));
            }
        }

        debug!(
            method = req.method(),
            status = res.status_code,
            set_cookies = res.header_values("Set-Cookie").count(),
            "handled cookie request"
        );
        res
    }
}

impl Default for CookieResponder {
    fn default() -> Self {
        Self::new(CorsConfig::default())
    }
}

fn error_body(e: &ProcessingError) -> Vec<u8> {
    serde_json::json!({ "error": e.to_string() })
        .to_string()
        .into_bytes()
}
