//! Async client for the SerpApi search results API.
//!
//! - [`Client`]: façade exposing `search`, `location`, `account`, `get_json`,
//!   `get_html` and a [`Client::paginate`] stream
//! - [`request`]: builds the authenticated request URL
//! - [`response`]: status/body interpretation and typed decoding
//! - [`pagination`]: turns `serpapi_pagination.next` into request params
//!
//! Each call performs exactly one HTTP exchange through a pluggable
//! [`serpapi_http::Transport`]; there are no retries and no caching.
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), serpapi_client::SerpError> {
//! use serpapi_client::{Client, Params};
//! use tokio_util::sync::CancellationToken;
//!
//! let client = Client::new("my-api-key")?;
//! let params = Params::from([
//!     ("engine".to_string(), "google".to_string()),
//!     ("q".to_string(), "coffee".to_string()),
//! ]);
//! let page = client.search(&params, &CancellationToken::new()).await?;
//! if let Some(next) = page.next_page_params() {
//!     let _page2 = client.search(&next, &CancellationToken::new()).await?;
//! }
//! # Ok(()) }
//! ```

pub mod client;
pub mod error;
pub mod pagination;
pub mod request;
pub mod response;

pub use client::{Client, ClientBuilder, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, USER_AGENT};
pub use error::SerpError;
pub use pagination::next_page_params;
pub use request::{OutputFormat, Params, build_url};
pub use response::{FromBody, Response, ResponseKind, interpret};
pub use serpapi_http::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
pub use tokio_util::sync::CancellationToken;
