//! The two push pipelines: remote-write and bulk import.
//!
//! A remote-write push sends the whole series, snappy compressed protobuf, and
//! retries transport failures, 429 and 5xx with [`Backoff`]. There is no
//! idempotency key so a retry after a lost response may duplicate samples. A
//! bulk import is a single attempt that only 204 satisfies.

use bytes::Bytes;
use reqwest::{
    StatusCode,
    header::{CONTENT_ENCODING, CONTENT_TYPE},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use mtsm_payload::{BulkMetric, TimeSeries, remote_write};

use crate::{Client, Error, retry::Backoff};

const RETRY_ATTEMPT_HEADER: &str = "Retry-Attempt";

impl Client {
    /// Push `series` to the remote-write endpoint, retrying up to
    /// `retry_attempts` more times. Returns the compressed body that was
    /// accepted.
    ///
    /// # Errors
    ///
    /// Function will error if the series cannot be encoded, the backend
    /// rejects it with a non-retryable status, retries run out or `cancel`
    /// fires. Cancellation aborts the in-flight attempt.
    pub async fn push(
        &self,
        series: &TimeSeries,
        cancel: &CancellationToken,
        retry_attempts: u32,
    ) -> Result<Bytes, Error> {
        let body = Bytes::from(remote_write::WriteRequest::from_series(series).to_body()?);
        debug!(
            "pushing {samples} samples, {bytes} bytes compressed",
            samples = series.len(),
            bytes = body.len()
        );

        let mut backoff = Backoff::new(self.retry_wait, self.retry_max_wait, retry_attempts);
        loop {
            let attempt = backoff.attempts();
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                result = self.send_write(body.clone(), attempt) => result,
            };
            match result {
                Ok(()) => {
                    self.record_bytes_written(body.len());
                    return Ok(body);
                }
                Err(err) if err.is_retryable() => {
                    if backoff.wait(cancel).await.is_none() {
                        if cancel.is_cancelled() {
                            return Err(Error::Cancelled);
                        }
                        warn!("giving up on remote write after {attempt} retries: {err}");
                        return Err(err);
                    }
                    info!(
                        "retrying remote write, attempt {next}: {err}",
                        next = backoff.attempts()
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// [`Client::push`] with the configured `retry_count`.
    ///
    /// # Errors
    ///
    /// See [`Client::push`].
    pub async fn push_with_default_retries(
        &self,
        series: &TimeSeries,
        cancel: &CancellationToken,
    ) -> Result<Bytes, Error> {
        self.push(series, cancel, self.retry_count).await
    }

    /// Send `metric` to the import endpoint as one JSON line.
    ///
    /// # Errors
    ///
    /// Function will error if the metric cannot be serialized, the request
    /// fails, the backend answers with anything but 204 or `cancel` fires.
    pub async fn import(&self, metric: &BulkMetric, cancel: &CancellationToken) -> Result<(), Error> {
        let body = metric.to_json()?;
        let bytes = body.len();
        let request = self
            .http
            .post(self.import_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            result = self.execute(request, &self.import_url, |status| status == StatusCode::NO_CONTENT) => {
                result?;
                self.record_bytes_written(bytes);
                Ok(())
            }
        }
    }

    async fn send_write(&self, body: Bytes, attempt: u32) -> Result<(), Error> {
        let mut request = self
            .http
            .post(self.write_url.clone())
            .header(CONTENT_ENCODING, remote_write::CONTENT_ENCODING)
            .header(CONTENT_TYPE, remote_write::CONTENT_TYPE)
            .header(remote_write::VERSION_HEADER, remote_write::VERSION)
            .body(body);
        if attempt > 0 {
            request = request.header(RETRY_ATTEMPT_HEADER, attempt.to_string());
        }
        self.execute(request, &self.write_url, |status| status.is_success())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        convert::Infallible,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use bytes::Bytes;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;
    use warp::{Filter, http::StatusCode};

    use mtsm_payload::{LabelSet, remote_write::WriteRequest};

    use crate::{BulkMetric, Client, Config, Error};

    fn client_for(addr: std::net::SocketAddr) -> Client {
        let config = Config {
            retry_wait_milliseconds: 1,
            retry_max_wait_milliseconds: 2,
            ..Config::new(format!("http://{addr}"))
        };
        Client::new(&config).expect("valid config")
    }

    #[derive(Debug)]
    struct Received {
        encoding: Option<String>,
        content_type: Option<String>,
        version: Option<String>,
        retry_attempt: Option<String>,
        body: Bytes,
    }

    /// Remote-write server answering with `statuses` in turn, the last one
    /// repeated.
    fn write_server(
        statuses: Vec<u16>,
    ) -> (
        std::net::SocketAddr,
        mpsc::UnboundedReceiver<Received>,
        Arc<AtomicUsize>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let statuses = Arc::new(statuses);
        let route = warp::post()
            .and(warp::path!("api" / "v1" / "write"))
            .and(warp::header::optional::<String>("content-encoding"))
            .and(warp::header::optional::<String>("content-type"))
            .and(warp::header::optional::<String>(
                "x-prometheus-remote-write-version",
            ))
            .and(warp::header::optional::<String>("retry-attempt"))
            .and(warp::body::bytes())
            .map(
                move |encoding, content_type, version, retry_attempt, body: Bytes| {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    let status = statuses
                        .get(n)
                        .or_else(|| statuses.last())
                        .copied()
                        .unwrap_or(204);
                    let _ = tx.send(Received {
                        encoding,
                        content_type,
                        version,
                        retry_attempt,
                        body,
                    });
                    warp::reply::with_status(
                        "nope".to_string(),
                        StatusCode::from_u16(status).expect("valid status"),
                    )
                },
            );
        let (addr, serve_fut) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(serve_fut);
        (addr, rx, hits)
    }

    fn cpu_series(client: &Client) -> mtsm_payload::TimeSeries {
        let mut series = client.time_series(LabelSet::from([("__name__", "cpu")]));
        series.add_value(42.0, Some(1_700_000_000));
        series
    }

    #[tokio::test]
    async fn push_delivers_a_decodable_body() {
        let (addr, mut rx, _) = write_server(vec![204]);
        let client = client_for(addr);
        let series = cpu_series(&client);

        let sent = client
            .push(&series, &CancellationToken::new(), 0)
            .await
            .expect("push failed");
        let got = rx.recv().await.expect("server saw nothing");

        assert_eq!(got.encoding.as_deref(), Some("snappy"));
        assert_eq!(got.content_type.as_deref(), Some("application/x-protobuf"));
        assert_eq!(got.version.as_deref(), Some("0.1.0"));
        assert_eq!(got.retry_attempt, None);
        assert_eq!(got.body, sent);

        let decoded = WriteRequest::from_body(&got.body).expect("failed to decode");
        assert_eq!(decoded.timeseries.len(), 1);
        let ts = &decoded.timeseries[0];
        assert_eq!(ts.labels[0].name, "__name__");
        assert_eq!(ts.labels[0].value, "cpu");
        assert_eq!(ts.samples.len(), 1);
        assert_eq!(ts.samples[0].value, 42.0);
        assert_eq!(ts.samples[0].timestamp, 1_700_000_000_000);
    }

    #[tokio::test]
    async fn push_retries_server_errors() {
        let (addr, mut rx, hits) = write_server(vec![500, 503, 200]);
        let client = client_for(addr);
        let series = cpu_series(&client);

        client
            .push(&series, &CancellationToken::new(), 3)
            .await
            .expect("push failed");
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        let attempts: Vec<Option<String>> = [
            rx.recv().await.expect("first"),
            rx.recv().await.expect("second"),
            rx.recv().await.expect("third"),
        ]
        .into_iter()
        .map(|r| r.retry_attempt)
        .collect();
        assert_eq!(
            attempts,
            vec![None, Some("1".to_string()), Some("2".to_string())]
        );
    }

    #[tokio::test]
    async fn push_gives_up_after_retries() {
        let (addr, _rx, hits) = write_server(vec![429]);
        let client = client_for(addr);
        let series = cpu_series(&client);

        let err = client
            .push(&series, &CancellationToken::new(), 2)
            .await
            .expect_err("push succeeded");
        assert!(matches!(err, Error::Status { status: 429, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn push_does_not_retry_client_errors() {
        let (addr, _rx, hits) = write_server(vec![400]);
        let client = client_for(addr);
        let series = cpu_series(&client);

        let err = client
            .push_with_default_retries(&series, &CancellationToken::new())
            .await
            .expect_err("push succeeded");
        match err {
            Error::Status { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "nope");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_push_sends_nothing() {
        let (addr, _rx, hits) = write_server(vec![204]);
        let client = client_for(addr);
        let series = cpu_series(&client);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client
            .push(&series, &cancel, 3)
            .await
            .expect_err("push succeeded");
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancel_aborts_in_flight_push() {
        let route = warp::path!("api" / "v1" / "write").and_then(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, Infallible>(warp::reply())
        });
        let (addr, serve_fut) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(serve_fut);
        let client = client_for(addr);
        let series = cpu_series(&client);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = client
            .push(&series, &cancel, 3)
            .await
            .expect_err("push succeeded");
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn transport_errors_carry_the_url() {
        // Bind then drop to find a port nothing listens on.
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|l| l.local_addr())
            .expect("failed to bind");
        let client = client_for(addr);
        let series = cpu_series(&client);

        let err = client
            .push(&series, &CancellationToken::new(), 1)
            .await
            .expect_err("push succeeded");
        match err {
            Error::Request { url, .. } => assert!(url.ends_with("/api/v1/write")),
            other => panic!("unexpected error: {other}"),
        }
    }

    fn import_server(status: u16) -> (std::net::SocketAddr, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let route = warp::post()
            .and(warp::path!("api" / "v1" / "import"))
            .and(warp::body::bytes())
            .map(move |body: Bytes| {
                let _ = tx.send(body);
                warp::reply::with_status(
                    String::new(),
                    StatusCode::from_u16(status).expect("valid status"),
                )
            });
        let (addr, serve_fut) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(serve_fut);
        (addr, rx)
    }

    #[tokio::test]
    async fn import_sends_one_json_line() {
        let (addr, mut rx) = import_server(204);
        let client = client_for(addr);
        let mut metric = BulkMetric::new(LabelSet::from([("__name__", "cpu")]));
        metric.add_value(1.0, 1_700_000_000_000);

        client
            .import(&metric, &CancellationToken::new())
            .await
            .expect("import failed");
        let body = rx.recv().await.expect("server saw nothing");
        assert_eq!(
            &body[..],
            br#"{"metric":{"__name__":"cpu"},"values":[1.0],"timestamps":[1700000000000]}"#
        );
    }

    #[tokio::test]
    async fn import_requires_no_content() {
        let (addr, _rx) = import_server(200);
        let client = client_for(addr);
        let metric = BulkMetric::new(LabelSet::from([("__name__", "cpu")]));

        let err = client
            .import(&metric, &CancellationToken::new())
            .await
            .expect_err("import succeeded");
        assert!(matches!(err, Error::Status { status: 200, .. }));
    }

    #[tokio::test]
    async fn basic_auth_from_url() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let route = warp::path!("api" / "v1" / "import")
            .and(warp::header::optional::<String>("authorization"))
            .map(move |auth: Option<String>| {
                let _ = tx.send(auth);
                warp::reply::with_status(String::new(), StatusCode::NO_CONTENT)
            });
        let (addr, serve_fut) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(serve_fut);

        let client =
            Client::new(&Config::new(format!("http://user:pass@{addr}"))).expect("valid config");
        client
            .import(&BulkMetric::default(), &CancellationToken::new())
            .await
            .expect("import failed");
        assert_eq!(
            rx.recv().await.expect("server saw nothing").as_deref(),
            Some("Basic dXNlcjpwYXNz")
        );
    }
}
