//! The HTTP client shared by the push pipelines and the query API.
//!
//! A [`Client`] is cheap to clone; clones share reqwest's connection pool.

use std::time::Duration;

use metrics::counter;
use reqwest::{RequestBuilder, Response, StatusCode};
use time::UtcOffset;
use tracing::{debug, warn};
use url::Url;

use mtsm_payload::{BulkMetric, LabelSet, TimeSeries};

use crate::{Error, config::Config};

const USER_AGENT: &str = concat!("mtsm/", env!("CARGO_PKG_VERSION"));

/// Client for a Prometheus compatible backend.
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) http: reqwest::Client,
    pub(crate) write_url: Url,
    pub(crate) import_url: Url,
    pub(crate) api_url: Url,
    credentials: Option<(String, String)>,
    offset: UtcOffset,
    pub(crate) retry_count: u32,
    pub(crate) retry_wait: Duration,
    pub(crate) retry_max_wait: Duration,
    metric_labels: Vec<(String, String)>,
}

impl Client {
    /// Create a new [`Client`] instance
    ///
    /// # Errors
    ///
    /// Function will error if `config` does not validate or the underlying
    /// HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, Error> {
        config.validate()?;
        let base = config.base_url()?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .default_headers(config.header_map()?)
            .build()?;

        debug!("mtsm client created for {base}");

        Ok(Self {
            http,
            write_url: join(&base, &config.write_path),
            import_url: join(&base, &config.import_path),
            api_url: join(&base, &config.api_prefix),
            credentials: config.credentials()?,
            offset: config.utc_offset()?,
            retry_count: config.retry_count,
            retry_wait: config.retry_wait(),
            retry_max_wait: config.retry_max_wait(),
            metric_labels: vec![("component".to_string(), "mtsm".to_string())],
        })
    }

    /// A [`TimeSeries`] reading "now" in this client's zone.
    #[must_use]
    pub fn time_series(&self, labels: LabelSet) -> TimeSeries {
        TimeSeries::with_offset(labels, self.offset)
    }

    /// An empty [`BulkMetric`].
    #[must_use]
    pub fn bulk_metric(&self, labels: LabelSet) -> BulkMetric {
        BulkMetric::new(labels)
    }

    /// The zone "now" is read in.
    #[must_use]
    pub fn offset(&self) -> UtcOffset {
        self.offset
    }

    /// The remote-write endpoint.
    #[must_use]
    pub fn write_url(&self) -> &Url {
        &self.write_url
    }

    /// The bulk import endpoint.
    #[must_use]
    pub fn import_url(&self) -> &Url {
        &self.import_url
    }

    /// Send `request` once. A response whose status satisfies `accept` is
    /// handed back, anything else becomes [`Error::Status`].
    pub(crate) async fn execute(
        &self,
        request: RequestBuilder,
        url: &Url,
        accept: fn(StatusCode) -> bool,
    ) -> Result<Response, Error> {
        let request = match &self.credentials {
            Some((username, password)) => request.basic_auth(username, Some(password)),
            None => request,
        };

        counter!("requests_sent", &self.metric_labels).increment(1);
        debug!("sending request to {url}");
        match request.send().await {
            Ok(response) => {
                let status = response.status();
                let mut status_labels = self.metric_labels.clone();
                status_labels.push(("status_code".to_string(), status.as_u16().to_string()));
                if accept(status) {
                    counter!("request_ok", &status_labels).increment(1);
                    Ok(response)
                } else {
                    counter!("request_failure", &status_labels).increment(1);
                    let body = match response.text().await {
                        Ok(body) => body,
                        Err(err) => {
                            warn!("failed to read {status} response body from {url}: {err}");
                            format!("<unreadable body: {err}>")
                        }
                    };
                    Err(Error::Status {
                        status: status.as_u16(),
                        body,
                    })
                }
            }
            Err(source) => {
                let mut error_labels = self.metric_labels.clone();
                error_labels.push(("error".to_string(), source.to_string()));
                counter!("request_failure", &error_labels).increment(1);
                Err(Error::Request {
                    url: url.to_string(),
                    source,
                })
            }
        }
    }

    pub(crate) fn record_bytes_written(&self, bytes: usize) {
        counter!("bytes_written", &self.metric_labels).increment(bytes as u64);
    }
}

/// Append the `/` separated segments of `path` to `base`.
pub(crate) fn join(base: &Url, path: &str) -> Url {
    join_segments(base, path.split('/'))
}

/// Append `segments` to `base`, percent-encoding each. Empty segments are
/// skipped.
pub(crate) fn join_segments<'a, I>(base: &Url, segments: I) -> Url
where
    I: IntoIterator<Item = &'a str>,
{
    let mut url = base.clone();
    // http(s) URLs can always be a base.
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty()
            .extend(segments.into_iter().filter(|s| !s.is_empty()));
    }
    url
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };
    use url::Url;

    use super::{Client, join, join_segments};
    use crate::{Error, config::Config};

    #[test]
    fn endpoints_follow_the_base_path() {
        let client = Client::new(&Config::new("http://127.0.0.1:8428")).expect("valid config");
        assert_eq!(client.write_url().as_str(), "http://127.0.0.1:8428/api/v1/write");
        assert_eq!(
            client.import_url().as_str(),
            "http://127.0.0.1:8428/api/v1/import"
        );
        assert_eq!(client.api_url.as_str(), "http://127.0.0.1:8428/prometheus");

        let client = Client::new(&Config::new("https://user:pw@example.com/vm/"))
            .expect("valid config");
        assert_eq!(client.write_url().as_str(), "https://example.com/vm/api/v1/write");
    }

    #[test]
    fn join_encodes_segments() {
        let base = Url::parse("http://example.com/prometheus").expect("valid url");
        assert_eq!(
            join_segments(&base, ["api", "v1", "label", "a b", "values"]).as_str(),
            "http://example.com/prometheus/api/v1/label/a%20b/values"
        );
        assert_eq!(
            join(&base, "//api//v1/").as_str(),
            "http://example.com/prometheus/api/v1"
        );
    }

    #[test]
    fn invalid_config_is_refused() {
        assert!(matches!(
            Client::new(&Config::new("")),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn models_use_the_client_zone() {
        let config = Config {
            utc_offset_seconds: -5 * 3600,
            ..Config::new("http://example.com")
        };
        let client = Client::new(&config).expect("valid config");
        let series = client.time_series(mtsm_payload::LabelSet::new());
        assert_eq!(series.offset().whole_hours(), -5);
        assert!(client.bulk_metric(mtsm_payload::LabelSet::new()).is_empty());
    }

    #[tokio::test]
    async fn truncated_error_body_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind");
        let addr = listener.local_addr().expect("no local addr");
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("failed to accept");
            let mut buf = [0_u8; 4096];
            let _ = stream.read(&mut buf).await;
            // Promise more body than is sent, then hang up.
            let _ = stream
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\nshort")
                .await;
            let _ = stream.shutdown().await;
        });

        let client = Client::new(&Config::new(format!("http://{addr}"))).expect("valid config");
        let err = client
            .execute(
                client.http.get(client.import_url.clone()),
                client.import_url(),
                |status| status.is_success(),
            )
            .await
            .expect_err("500 accepted");
        match err {
            Error::Status { status, body } => {
                assert_eq!(status, 500);
                assert!(body.starts_with("<unreadable body:"), "body: {body}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
