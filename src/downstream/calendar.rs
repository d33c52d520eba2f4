//! Requests against the calendar API.

use url::Url;

use crate::message::QueuedRequest;

use super::{BuildError, HttpClient, HttpError, HttpRequest, HttpResponse};

/// The downstream calendar API, reached through an [`HttpClient`].
///
/// Every queued message is replayed under a single root URL: the message
/// path is appended to the root, its params replace the query string and
/// its body is sent verbatim.
#[derive(Debug, Clone)]
pub struct CalendarApi<H> {
    client: H,
    root_url: Url,
}

impl<H> CalendarApi<H> {
    /// Creates a calendar API rooted at `root_url`.
    #[must_use]
    pub const fn new(client: H, root_url: Url) -> Self {
        Self { client, root_url }
    }

    /// Returns the configured root URL.
    #[must_use]
    pub const fn root_url(&self) -> &Url {
        &self.root_url
    }

    /// Builds the HTTP request that replays `message`.
    ///
    /// An empty method replays as `GET`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the method is not a valid HTTP token or the
    /// resulting URL does not parse.
    pub fn build_request(&self, message: &QueuedRequest) -> Result<HttpRequest, BuildError> {
        let method = if message.method.is_empty() {
            http::Method::GET
        } else {
            http::Method::from_bytes(message.method.as_bytes())
                .map_err(|_| BuildError::InvalidMethod(message.method.clone()))?
        };

        let mut url = self.join(&message.path)?;
        url.set_query(None);
        if !message.params.is_empty() {
            url.query_pairs_mut().extend_pairs(&message.params);
        }

        Ok(HttpRequest::new(method, url).with_body(message.body.clone().into_bytes()))
    }

    fn join(&self, path: &str) -> Result<Url, BuildError> {
        let root = self.root_url.as_str().trim_end_matches('/');
        let joined = if path.is_empty() || path.starts_with('/') {
            format!("{root}{path}")
        } else {
            format!("{root}/{path}")
        };

        Url::parse(&joined).map_err(|e| BuildError::InvalidUrl {
            url: joined,
            reason: e.to_string(),
        })
    }
}

impl<H: HttpClient> CalendarApi<H> {
    /// Sends a previously built request.
    ///
    /// # Errors
    ///
    /// Propagates the client's [`HttpError`].
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            "Performing calendar request"
        );
        self.client.request(request).await
    }
}
