//! Request URL construction.
//!
//! Caller parameters are merged with the fixed `api_key` / `output` keys,
//! which win over same-named caller entries. An empty configured key is not
//! a fixed key, so a caller-supplied `api_key` then goes out unchanged.

use std::collections::BTreeMap;

use url::Url;

use crate::error::SerpError;

/// Flat string-to-string request parameters. Ordered so URLs are canonical.
pub type Params = BTreeMap<String, String>;

pub const API_KEY_PARAM: &str = "api_key";
pub const OUTPUT_PARAM: &str = "output";

/// Value of the `output` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Html,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Html => "html",
        }
    }
}

/// Build the absolute request URL for `path` under `base`.
///
/// A non-empty `api_key` replaces any caller `api_key`; an empty one leaves
/// the caller's value (or its absence) alone. `output` is always replaced.
///
/// ```
/// use serpapi_client::{build_url, OutputFormat, Params};
///
/// let params = Params::from([("q".to_string(), "coffee shops".to_string())]);
/// let url = build_url("https://serpapi.com", "/search", &params, "K", Some(OutputFormat::Json))
///     .unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://serpapi.com/search?api_key=K&output=json&q=coffee+shops"
/// );
/// ```
pub fn build_url(
    base: &str,
    path: &str,
    params: &Params,
    api_key: &str,
    output: Option<OutputFormat>,
) -> Result<Url, SerpError> {
    let joined = join_path(base, path);
    let mut url =
        Url::parse(&joined).map_err(|e| SerpError::InvalidUrl(format!("{joined}: {e}")))?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(SerpError::InvalidUrl(format!("{joined}: not a network URL")));
    }

    // Anything already on base/path participates like a caller param.
    let mut query: Params = url.query_pairs().into_owned().collect();
    query.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));

    query.remove(OUTPUT_PARAM);
    if !api_key.is_empty() {
        query.insert(API_KEY_PARAM.to_string(), api_key.to_string());
    }
    if let Some(format) = output {
        query.insert(OUTPUT_PARAM.to_string(), format.as_str().to_string());
    }

    if query.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&query);
    }
    Ok(url)
}

fn join_path(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
