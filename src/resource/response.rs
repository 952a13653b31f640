//! resource::response
//!
//! Response envelope parsing and result shapes.
//!
//! Every response body is an envelope:
//!
//! ```json
//! { "code": 0, "response": <payload>, "cursor": { "next": "...", "hasNext": true } }
//! ```
//!
//! A sequence payload becomes a [`ResultPage`] carrying the cursor; anything
//! else is returned as-is.

use std::ops::Index;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ClientError;

/// Raw status and body from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body text
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    response: Value,
    #[serde(default)]
    cursor: Option<Value>,
}

/// An ordered sequence of items with an opaque pagination cursor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPage {
    /// Items in upstream order
    pub items: Vec<Value>,
    /// Pagination cursor; an empty object when upstream sent none
    pub cursor: Value,
}

impl ResultPage {
    pub fn new(items: Vec<Value>, cursor: Option<Value>) -> Self {
        let cursor = match cursor {
            None | Some(Value::Null) => Value::Object(Default::default()),
            Some(c) => c,
        };
        Self { items, cursor }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn contains(&self, item: &Value) -> bool {
        self.items.contains(item)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// The `next` token from the cursor, when upstream reports more pages.
    pub fn next_cursor(&self) -> Option<&str> {
        let has_next = self
            .cursor
            .get("hasNext")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !has_next {
            return None;
        }
        self.cursor.get("next").and_then(Value::as_str)
    }
}

impl Index<usize> for ResultPage {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.items[index]
    }
}

impl IntoIterator for ResultPage {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultPage {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiResponse {
    /// Sequence payload with its cursor
    Page(ResultPage),
    /// Any other payload
    Scalar(Value),
}

impl ApiResponse {
    pub fn as_page(&self) -> Option<&ResultPage> {
        match self {
            ApiResponse::Page(page) => Some(page),
            ApiResponse::Scalar(_) => None,
        }
    }

    pub fn into_page(self) -> Option<ResultPage> {
        match self {
            ApiResponse::Page(page) => Some(page),
            ApiResponse::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            ApiResponse::Scalar(value) => Some(value),
            ApiResponse::Page(_) => None,
        }
    }

    pub fn into_scalar(self) -> Option<Value> {
        match self {
            ApiResponse::Scalar(value) => Some(value),
            ApiResponse::Page(_) => None,
        }
    }

    /// The payload as plain JSON (a page becomes its item array).
    pub fn to_value(&self) -> Value {
        match self {
            ApiResponse::Page(page) => Value::Array(page.items.clone()),
            ApiResponse::Scalar(value) => value.clone(),
        }
    }
}

/// Turn a transport response into a result or an upstream error.
pub fn parse_response(raw: RawResponse) -> Result<ApiResponse, ClientError> {
    if !raw.is_success() {
        return Err(api_error(&raw));
    }

    let envelope: Envelope =
        serde_json::from_str(&raw.body).map_err(|e| ClientError::Decode(e.to_string()))?;

    Ok(match envelope.response {
        Value::Array(items) => ApiResponse::Page(ResultPage::new(items, envelope.cursor)),
        other => ApiResponse::Scalar(other),
    })
}

fn api_error(raw: &RawResponse) -> ClientError {
    match serde_json::from_str::<Envelope>(&raw.body) {
        Ok(envelope) => ClientError::Api {
            code: envelope.code.unwrap_or(i64::from(raw.status)),
            message: match envelope.response {
                Value::String(s) => s,
                Value::Null => format!("HTTP {}", raw.status),
                other => other.to_string(),
            },
        },
        Err(_) => ClientError::Api {
            code: i64::from(raw.status),
            message: raw.body.clone(),
        },
    }
}
