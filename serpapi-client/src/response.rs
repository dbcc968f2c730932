//! Status/body interpretation and typed decoding.
//!
//! A call asks for one of three body shapes, picked by the type it decodes
//! into: [`Response`] (JSON object), `Vec<Value>` (JSON list) or `String`
//! (raw HTML). See [`interpret`].

use std::ops::Deref;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SerpError;
use crate::pagination;
use crate::request::Params;

const ERROR_KEY: &str = "error";

/// Expected shape of a successful body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    JsonObject,
    JsonList,
    Text,
}

/// A decoded JSON-object response. Key order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Response(Map<String, Value>);

impl Response {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Parameters for the next page, or `None` when there is none.
    pub fn next_page_params(&self) -> Option<Params> {
        pagination::next_page_params(&self.0)
    }

    pub fn search_metadata(&self) -> Option<&Map<String, Value>> {
        self.0.get("search_metadata")?.as_object()
    }

    pub fn search_id(&self) -> Option<&str> {
        self.search_metadata()?.get("id")?.as_str()
    }

    pub fn organic_results(&self) -> Option<&[Value]> {
        self.0
            .get("organic_results")?
            .as_array()
            .map(Vec::as_slice)
    }
}

impl Deref for Response {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Map<String, Value>> for Response {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Decoding of a 200 body into one of the supported shapes.
pub trait FromBody: Sized {
    const KIND: ResponseKind;

    fn from_body(body: &[u8]) -> Result<Self, SerpError>;
}

impl FromBody for String {
    const KIND: ResponseKind = ResponseKind::Text;

    fn from_body(body: &[u8]) -> Result<Self, SerpError> {
        Ok(String::from_utf8_lossy(body).into_owned())
    }
}

// List payloads are never checked for an in-band `error` key.
impl FromBody for Vec<Value> {
    const KIND: ResponseKind = ResponseKind::JsonList;

    fn from_body(body: &[u8]) -> Result<Self, SerpError> {
        serde_json::from_slice(body).map_err(|e| SerpError::Decode(e.to_string()))
    }
}

impl FromBody for Response {
    const KIND: ResponseKind = ResponseKind::JsonObject;

    fn from_body(body: &[u8]) -> Result<Self, SerpError> {
        let map: Map<String, Value> =
            serde_json::from_slice(body).map_err(|e| SerpError::Decode(e.to_string()))?;
        if let Some(err) = map.get(ERROR_KEY) {
            return Err(SerpError::Api {
                status: None,
                message: value_message(err),
            });
        }
        Ok(Self(map))
    }
}

/// Turn a raw exchange into a decoded body or a classified error.
///
/// ```
/// use reqwest::StatusCode;
/// use serpapi_client::{interpret, Response, SerpError};
///
/// let err = interpret::<Response>(StatusCode::BAD_REQUEST, br#"{"error":"Missing query"}"#)
///     .unwrap_err();
/// assert_eq!(err.to_string(), "serpapi error (400): Missing query");
///
/// let html = interpret::<String>(StatusCode::OK, b"<html></html>").unwrap();
/// assert_eq!(html, "<html></html>");
/// ```
pub fn interpret<T: FromBody>(status: StatusCode, body: &[u8]) -> Result<T, SerpError> {
    if status != StatusCode::OK {
        return Err(classify_failure(status, body));
    }
    T::from_body(body)
}

fn classify_failure(status: StatusCode, body: &[u8]) -> SerpError {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        error: String,
    }

    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) if !parsed.error.is_empty() => SerpError::Api {
            status: Some(status.as_u16()),
            message: parsed.error,
        },
        _ => SerpError::Http {
            status: status.as_u16(),
            body: String::from_utf8_lossy(body).into_owned(),
        },
    }
}

fn value_message(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
