//! Insights API client
//!
//! Minimal HTTP client for the package insights service.

use crate::Result;
use crate::models::{Insight, PackageId};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use reqwest::header::HeaderMap;
use url::Url;

const LOG_TARGET: &str = "insights";

/// The outcome of a single insights API call, classified for the enricher.
#[derive(Debug)]
pub enum ApiOutcome {
    /// The service returned an insight document.
    Success(Insight),

    /// The service has no data for this package (404). Cached as empty.
    NoInsight,

    /// Rate limited (429); carries the `Retry-After` delay when present.
    RateLimited(Option<u64>),

    /// A transient failure (transport error or 5xx) worth retrying.
    Retryable(ohno::AppError),

    /// A permanent failure (other 4xx, malformed payload). Not retried.
    Failed(ohno::AppError),
}

/// Client for the versioned insights HTTPS service.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
}

impl Client {
    /// Create a client with an optional API credential.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the underlying HTTP
    /// client cannot be constructed.
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        use reqwest::header::{AUTHORIZATION, HeaderValue};

        let base_url = Url::parse(base_url).into_app_err_with(|| format!("invalid insights API URL '{base_url}'"))?;

        let mut builder = reqwest::Client::builder().user_agent("pkgvet").timeout(timeout);

        if let Some(key) = api_key {
            let mut auth_val = HeaderValue::from_str(key)?;
            auth_val.set_sensitive(true);

            let mut headers = HeaderMap::new();
            let _ = headers.insert(AUTHORIZATION, auth_val);

            builder = builder.default_headers(headers);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the insight document for one package and classify the result.
    pub async fn fetch_insight(&self, id: &PackageId) -> ApiOutcome {
        let url = match self.insight_url(id) {
            Ok(url) => url,
            Err(e) => return ApiOutcome::Failed(e),
        };

        // Transport-level failures (connect, timeout, mid-body) are always transient.
        let resp = match self.http.get(url.clone()).send().await {
            Ok(resp) => resp,
            Err(e) => return ApiOutcome::Retryable(app_err!("insights request for {id} failed: {e}")),
        };

        let status = resp.status();
        log::debug!(target: LOG_TARGET, "HTTP {status} for {url}");

        if status.is_success() {
            return match resp.json::<Insight>().await {
                Ok(insight) => ApiOutcome::Success(insight),
                Err(e) => ApiOutcome::Failed(app_err!("malformed insight payload for {id}: {e}")),
            };
        }

        match status.as_u16() {
            404 => ApiOutcome::NoInsight,
            429 => ApiOutcome::RateLimited(parse_retry_after(resp.headers())),
            code if status.is_server_error() => ApiOutcome::Retryable(app_err!("insights service returned HTTP {code} for {id}")),
            code => ApiOutcome::Failed(app_err!("insights service rejected the request for {id} with HTTP {code}")),
        }
    }

    /// Build `{base}/insights/v1/{ecosystem}/{name}/{version}`.
    ///
    /// Path segments are percent-encoded, so scoped npm names stay a single
    /// segment.
    fn insight_url(&self, id: &PackageId) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| app_err!("insights API URL '{}' cannot carry a path", self.base_url))?
            .extend(["insights", "v1", &id.ecosystem().to_string(), id.name(), id.version()]);
        Ok(url)
    }
}

/// Parse the `Retry-After` header value as seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    let s = headers.get(reqwest::header::RETRY_AFTER).and_then(|h| h.to_str().ok())?;
    s.parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ecosystem;

    fn client() -> Client {
        Client::new("https://api.example.com", None, Duration::from_secs(30)).unwrap()
    }

    #[test]
    fn test_insight_url_layout() {
        let id = PackageId::new(Ecosystem::Pypi, "django", "2.0.0");
        let url = client().insight_url(&id).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/insights/v1/pypi/django/2.0.0");
    }

    #[test]
    fn test_insight_url_encodes_scoped_names() {
        let id = PackageId::new(Ecosystem::Npm, "@babel/core", "7.23.0");
        let url = client().insight_url(&id).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/insights/v1/npm/@babel%2Fcore/7.23.0");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = Client::new("not a url", None, Duration::from_secs(30)).unwrap_err();
        assert!(err.to_string().contains("invalid insights API URL"));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(reqwest::header::RETRY_AFTER, "17".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(17));

        let _ = headers.insert(reqwest::header::RETRY_AFTER, "soon".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), None);

        assert_eq!(parse_retry_after(&HeaderMap::new()), None);
    }
}
