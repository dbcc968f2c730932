//! The client façade: configuration plus one method per endpoint.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_stream::try_stream;
use futures::Stream;
use reqwest::header::{self, HeaderValue};
use serde_json::Value;
use serpapi_http::{HttpRequest, ReqwestTransport, Transport};
use tokio_util::sync::CancellationToken;

use crate::error::SerpError;
use crate::request::{API_KEY_PARAM, OutputFormat, Params, build_url};
use crate::response::{FromBody, Response, interpret};

pub const DEFAULT_BASE_URL: &str = "https://serpapi.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const USER_AGENT: &str = concat!("serpapi-rust/", env!("CARGO_PKG_VERSION"));

const SEARCH_PATH: &str = "/search";
const LOCATIONS_PATH: &str = "/locations.json";
const ACCOUNT_PATH: &str = "/account";

/// SerpApi client. Cheap to clone; clones share configuration and transport.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    api_key: String,
    base_url: String,
    timeout: Option<Duration>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_key", &if self.inner.api_key.is_empty() { "" } else { "<redacted>" })
            .field("base_url", &self.inner.base_url)
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

/// Named, independently defaulted client settings.
///
/// ```no_run
/// use serpapi_client::Client;
/// use std::time::Duration;
///
/// let client = Client::builder("my-api-key")
///     .with_base_url("https://serpapi.com")
///     .with_timeout(Duration::from_secs(10))
///     .build()?;
/// assert_eq!(client.timeout(), Some(Duration::from_secs(10)));
/// # Ok::<(), serpapi_client::SerpError>(())
/// ```
pub struct ClientBuilder {
    api_key: String,
    base_url: String,
    timeout: Option<Duration>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Per-request deadline, applied by the transport.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Let requests run until the transport or the caller gives up.
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    pub fn with_transport<T: Transport + 'static>(self, transport: T) -> Self {
        self.with_shared_transport(Arc::new(transport))
    }

    pub fn with_shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validates the base address and builds the default transport if none was set.
    pub fn build(self) -> Result<Client, SerpError> {
        build_url(&self.base_url, SEARCH_PATH, &Params::new(), "", None)?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new()?),
        };

        Ok(Client {
            inner: Arc::new(Inner {
                api_key: self.api_key,
                base_url: self.base_url,
                timeout: self.timeout,
                transport,
            }),
        })
    }
}

impl Client {
    /// Client with the default base address, timeout and `reqwest` transport.
    pub fn new(api_key: impl Into<String>) -> Result<Self, SerpError> {
        Self::builder(api_key).build()
    }

    pub fn builder(api_key: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
            transport: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    /// Run a search (`/search`). The result may link to a next page.
    pub async fn search(
        &self,
        params: &Params,
        cancel: &CancellationToken,
    ) -> Result<Response, SerpError> {
        self.get_json(SEARCH_PATH, params, cancel).await
    }

    /// Look up supported locations (`/locations.json`).
    pub async fn location(
        &self,
        params: &Params,
        cancel: &CancellationToken,
    ) -> Result<Vec<Value>, SerpError> {
        self.fetch(LOCATIONS_PATH, params, OutputFormat::Json, cancel)
            .await
    }

    /// Account information for the configured key (`/account`).
    pub async fn account(&self, cancel: &CancellationToken) -> Result<Response, SerpError> {
        self.get_json(ACCOUNT_PATH, &Params::new(), cancel).await
    }

    /// GET any endpoint and decode a JSON object.
    pub async fn get_json(
        &self,
        path: &str,
        params: &Params,
        cancel: &CancellationToken,
    ) -> Result<Response, SerpError> {
        self.fetch(path, params, OutputFormat::Json, cancel).await
    }

    /// GET any endpoint and return the raw HTML.
    pub async fn get_html(
        &self,
        path: &str,
        params: &Params,
        cancel: &CancellationToken,
    ) -> Result<String, SerpError> {
        self.fetch(path, params, OutputFormat::Html, cancel).await
    }

    /// Follow a paginated search, one request per page.
    ///
    /// Yields the first page for `params`, then keeps following
    /// `serpapi_pagination.next` until there is none. The stream ends after
    /// the first error. Bound it with `StreamExt::take` for a page cap.
    /// An `api_key` in `params` is carried over to every following page.
    ///
    /// ```no_run
    /// # async fn demo(client: serpapi_client::Client, params: serpapi_client::Params) {
    /// use futures::StreamExt;
    /// use tokio_util::sync::CancellationToken;
    ///
    /// let cancel = CancellationToken::new();
    /// let pages = client.paginate(params, &cancel).take(3);
    /// futures::pin_mut!(pages);
    /// while let Some(page) = pages.next().await {
    ///     let page = page.expect("page");
    ///     println!("{:?}", page.search_id());
    /// }
    /// # }
    /// ```
    pub fn paginate<'a>(
        &'a self,
        params: Params,
        cancel: &'a CancellationToken,
    ) -> impl Stream<Item = Result<Response, SerpError>> + 'a {
        try_stream! {
            let caller_key = params.get(API_KEY_PARAM).cloned();
            let mut current = params;
            let mut page_no = 1usize;
            loop {
                let page = self.search(&current, cancel).await?;
                let next = page.next_page_params().filter(|n| !n.is_empty()).map(|mut next| {
                    if let Some(key) = &caller_key {
                        next.insert(API_KEY_PARAM.to_string(), key.clone());
                    }
                    next
                });
                yield page;
                match next {
                    Some(next) if next != current => {
                        page_no += 1;
                        tracing::debug!(page_no, "serpapi.pagination.next");
                        current = next;
                    }
                    _ => {
                        tracing::debug!(pages = page_no, "serpapi.pagination.done");
                        break;
                    }
                }
            }
        }
    }

    async fn fetch<T: FromBody>(
        &self,
        path: &str,
        params: &Params,
        output: OutputFormat,
        cancel: &CancellationToken,
    ) -> Result<T, SerpError> {
        let url = build_url(
            &self.inner.base_url,
            path,
            params,
            &self.inner.api_key,
            Some(output),
        )?;

        let mut request = HttpRequest::get(url)
            .with_header(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        if let Some(timeout) = self.inner.timeout {
            request = request.with_timeout(timeout);
        }

        tracing::debug!(
            path,
            kind = ?T::KIND,
            output = output.as_str(),
            param_count = params.len(),
            "serpapi.request"
        );

        let response = self
            .inner
            .transport
            .execute(request, cancel)
            .await
            .map_err(|e| {
                let err = SerpError::from(e);
                tracing::warn!(path, error = %err, "serpapi.error");
                err
            })?;

        tracing::debug!(
            path,
            status = %response.status,
            body_len = response.body.len(),
            "serpapi.response"
        );

        interpret::<T>(response.status, &response.body).inspect_err(|err| {
            tracing::warn!(path, status = ?err.status(), error = %err, "serpapi.error");
        })
    }
}
