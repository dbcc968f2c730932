//! Next-page extraction from `serpapi_pagination.next`.

use serde_json::{Map, Value};
use url::Url;

use crate::request::{API_KEY_PARAM, OUTPUT_PARAM, Params};

const PAGINATION_KEY: &str = "serpapi_pagination";
const NEXT_KEY: &str = "next";

// Relative links are resolved against a throwaway origin; only the query matters.
const RELATIVE_ORIGIN: &str = "https://serpapi.invalid/";

/// Request params for the page after `response`.
///
/// Returns `None` when the response carries no usable next link; that is the
/// normal end of a result set, not an error. `api_key` and `output` are
/// dropped so the caller's client settings apply, and only the first value of
/// a repeated key is kept.
///
/// ```
/// use serde_json::json;
/// use serpapi_client::next_page_params;
///
/// let resp = json!({
///     "serpapi_pagination": {
///         "next": "https://serpapi.com/search.json?engine=google&q=coffee&start=10"
///     }
/// });
/// let next = next_page_params(resp.as_object().unwrap()).unwrap();
/// assert_eq!(next["start"], "10");
/// assert_eq!(next["engine"], "google");
/// ```
pub fn next_page_params(response: &Map<String, Value>) -> Option<Params> {
    let next = response
        .get(PAGINATION_KEY)?
        .as_object()?
        .get(NEXT_KEY)?
        .as_str()?;

    let url = parse_link(next)?;
    let mut params = Params::new();
    for (k, v) in url.query_pairs() {
        if k == API_KEY_PARAM || k == OUTPUT_PARAM {
            continue;
        }
        params.entry(k.into_owned()).or_insert_with(|| v.into_owned());
    }
    Some(params)
}

fn parse_link(link: &str) -> Option<Url> {
    match Url::parse(link) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(RELATIVE_ORIGIN).ok()?.join(link).ok()
        }
        Err(err) => {
            tracing::debug!(link, error=%err, "serpapi.pagination.unparsable_link");
            None
        }
    }
}
