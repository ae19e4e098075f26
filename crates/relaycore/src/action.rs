//! Typed parameters for each executable node kind.
//!
//! Nodes carry their parameters as a label-keyed field list. Executors turn
//! that list into one of these structs once, at dispatch, and work on the
//! typed value from then on.

use crate::fields::{resolve_owned, Field};
use crate::ActionError;
use serde_json::{Map, Value};

pub const API_ACTION: &str = "api";
pub const EMAIL_ACTION: &str = "email";

pub const FIELD_ENDPOINT: &str = "Endpoint";
pub const FIELD_METHOD: &str = "Method";
pub const FIELD_HEADERS: &str = "Headers";
pub const FIELD_BODY: &str = "Body";
pub const FIELD_TO: &str = "To";
pub const FIELD_SUBJECT: &str = "Subject";

/// Parameters of an `api` node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiAction {
    pub endpoint: Option<String>,
    pub method: Option<String>,
    pub headers: Option<String>,
    pub body: Option<String>,
}

impl ApiAction {
    pub fn from_fields(fields: &[Field]) -> Self {
        Self {
            endpoint: resolve_owned(fields, FIELD_ENDPOINT),
            method: resolve_owned(fields, FIELD_METHOD),
            headers: resolve_owned(fields, FIELD_HEADERS),
            body: resolve_owned(fields, FIELD_BODY),
        }
    }

    /// Upper-cased method name, `GET` when absent or empty.
    pub fn method(&self) -> String {
        match self.method.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => m.to_uppercase(),
            _ => "GET".to_string(),
        }
    }

    /// Headers object, `{}` when absent or empty.
    pub fn headers(&self) -> Result<Map<String, Value>, ActionError> {
        match parse_json_field(FIELD_HEADERS, self.headers.as_deref())? {
            Value::Object(map) => Ok(map),
            other => Err(ActionError::Parse(format!(
                "{} must be a JSON object, got {}",
                FIELD_HEADERS, other
            ))),
        }
    }

    /// Request body, `{}` when absent or empty.
    pub fn body(&self) -> Result<Value, ActionError> {
        parse_json_field(FIELD_BODY, self.body.as_deref())
    }
}

/// Parameters of an `email` node. Absent values stay absent; the mail
/// transport decides what it accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailAction {
    pub to: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

impl EmailAction {
    pub fn from_fields(fields: &[Field]) -> Self {
        Self {
            to: resolve_owned(fields, FIELD_TO),
            subject: resolve_owned(fields, FIELD_SUBJECT),
            body: resolve_owned(fields, FIELD_BODY),
        }
    }
}

fn parse_json_field(label: &str, raw: Option<&str>) -> Result<Value, ActionError> {
    match raw {
        None | Some("") => Ok(Value::Object(Map::new())),
        Some(text) => serde_json::from_str(text)
            .map_err(|e| ActionError::Parse(format!("invalid JSON in {}: {}", label, e))),
    }
}
