//! HTTP execution engine with built-in retry for service calls.

use std::io::Write;
use std::time::Duration;

use log::{debug, warn};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use super::retry::{AttemptOutcome, Disposition, RetryCause, classify_status};
use crate::environment::Environment;
use crate::error::{Error, Operation, Result};
use crate::response::ResponseStatus;

/// A completed round trip: final status plus the raw body.
pub(crate) struct Reply {
    status: StatusCode,
    body: Vec<u8>,
}

impl Reply {
    /// Classify this reply into the terminal response status.
    pub(crate) fn response_status(&self) -> ResponseStatus {
        ResponseStatus::from_body(self.status, &self.body)
    }

    /// Deserialize the body as JSON, if it parses.
    pub(crate) fn json<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_slice(&self.body).ok()
    }

    pub(crate) fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Result of a streamed document fetch.
pub(crate) enum Download {
    /// A 2xx response whose body was streamed into the destination.
    Document {
        status: ResponseStatus,
        headers: HeaderMap,
        bytes_written: u64,
    },
    /// The service reported a failure; nothing was written.
    Failed(Reply),
}

/// Executes serialized requests against the service, applying the
/// environment's timeouts, proxy and retry policy.
///
/// Transport failures and 5xx statuses are retried up to `max_tries` with a
/// fixed delay between attempts. A 4xx status is terminal and comes back as
/// a failed reply value; only a transport failure that survives every
/// attempt is raised as an error.
pub(crate) struct HttpEngine {
    client: Client,
    max_tries: u32,
    retry_delay: Duration,
}

impl HttpEngine {
    /// Build an engine for the given environment.
    pub(crate) fn new(env: &Environment) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = env.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = env.read_timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(proxy) = &env.proxy {
            builder = builder.proxy(proxy.to_reqwest()?);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            // A zero try budget would mean never sending anything at all.
            max_tries: env.max_tries.max(1),
            retry_delay: env.retry_delay,
        })
    }

    /// POST url-encoded form fields and collect the reply.
    #[tracing::instrument(skip(self, fields))]
    pub(crate) async fn post_form(
        &self,
        operation: Operation,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<Reply> {
        debug!("POST {} ({} form fields)", url, fields.len());

        self.with_retry(operation, || async {
            let result = self.client.post(url).form(fields).send().await;
            collect_reply(result).await
        })
        .await
    }

    /// POST a multipart form and collect the reply.
    ///
    /// Multipart bodies are single-use, so the caller supplies a closure
    /// that rebuilds the form for each attempt.
    #[tracing::instrument(skip(self, make_form))]
    pub(crate) async fn post_multipart<F>(
        &self,
        operation: Operation,
        url: &str,
        make_form: F,
    ) -> Result<Reply>
    where
        F: Fn() -> reqwest::multipart::Form,
    {
        debug!("POST {} (multipart)", url);

        self.with_retry(operation, || async {
            let result = self.client.post(url).multipart(make_form()).send().await;
            collect_reply(result).await
        })
        .await
    }

    /// POST form fields and stream a binary response body into a writer.
    ///
    /// The body is copied chunk by chunk, never buffered whole. The writer
    /// is created only once a 2xx status has been seen, and recreated on a
    /// retried attempt so a partial copy is overwritten.
    #[tracing::instrument(skip(self, fields, create_writer))]
    pub(crate) async fn post_form_download<W, F>(
        &self,
        operation: Operation,
        url: &str,
        fields: &[(String, String)],
        create_writer: F,
    ) -> Result<Download>
    where
        W: Write,
        F: Fn() -> std::io::Result<W>,
    {
        debug!("POST {} (document download)", url);

        self.with_retry(operation, || async {
            let result = self.client.post(url).form(fields).send().await;
            stream_download(result, &create_writer).await
        })
        .await
    }

    /// POST a multipart form and stream a binary response body into a
    /// writer. Used by conversions, which upload a document and receive one.
    #[tracing::instrument(skip(self, make_form, create_writer))]
    pub(crate) async fn post_multipart_download<W, M, F>(
        &self,
        operation: Operation,
        url: &str,
        make_form: M,
        create_writer: F,
    ) -> Result<Download>
    where
        W: Write,
        M: Fn() -> reqwest::multipart::Form,
        F: Fn() -> std::io::Result<W>,
    {
        debug!("POST {} (multipart, document download)", url);

        self.with_retry(operation, || async {
            let result = self.client.post(url).multipart(make_form()).send().await;
            stream_download(result, &create_writer).await
        })
        .await
    }

    /// Runs an attempt closure under the retry policy.
    ///
    /// Terminal outcomes return immediately. After the try budget is spent,
    /// a retryable server failure is returned as the last failed value and
    /// a transport failure is raised.
    pub(crate) async fn with_retry<T, F, Fut>(&self, operation: Operation, attempt_fn: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = AttemptOutcome<T>>,
    {
        let mut attempt = 1;
        loop {
            match attempt_fn().await {
                AttemptOutcome::Terminal(value) => return Ok(value),
                AttemptOutcome::Fatal(err) => return Err(err),
                AttemptOutcome::Retry(cause) => {
                    if attempt >= self.max_tries {
                        return match cause {
                            RetryCause::Failed(value) => Ok(value),
                            RetryCause::Transport(source) => {
                                Err(Error::Transport { operation, source })
                            }
                        };
                    }
                    warn!(
                        "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                        operation,
                        attempt,
                        self.max_tries,
                        cause.describe(),
                        self.retry_delay.as_millis()
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// One download attempt: classify the status, then stream a successful body
/// into a freshly created writer.
async fn stream_download<W, F>(
    result: reqwest::Result<reqwest::Response>,
    create_writer: &F,
) -> AttemptOutcome<Download>
where
    W: Write,
    F: Fn() -> std::io::Result<W>,
{
    let response = match result {
        Ok(response) => response,
        Err(e) => return AttemptOutcome::Retry(RetryCause::Transport(e)),
    };

    let status = response.status();
    if !status.is_success() {
        return match collect_reply(Ok(response)).await {
            AttemptOutcome::Terminal(reply) => AttemptOutcome::Terminal(Download::Failed(reply)),
            AttemptOutcome::Retry(RetryCause::Failed(reply)) => {
                AttemptOutcome::Retry(RetryCause::Failed(Download::Failed(reply)))
            }
            AttemptOutcome::Retry(RetryCause::Transport(e)) => {
                AttemptOutcome::Retry(RetryCause::Transport(e))
            }
            AttemptOutcome::Fatal(e) => AttemptOutcome::Fatal(e),
        };
    }

    let headers = response.headers().clone();
    let mut writer = match create_writer() {
        Ok(writer) => writer,
        Err(e) => return AttemptOutcome::Fatal(Error::Io(e)),
    };

    let mut response = response;
    let mut bytes_written: u64 = 0;
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                if let Err(e) = writer.write_all(&chunk) {
                    return AttemptOutcome::Fatal(Error::Io(e));
                }
                bytes_written += chunk.len() as u64;
            }
            Ok(None) => break,
            // The stream broke mid-copy; the whole attempt repeats.
            Err(e) => return AttemptOutcome::Retry(RetryCause::Transport(e)),
        }
    }
    if let Err(e) = writer.flush() {
        return AttemptOutcome::Fatal(Error::Io(e));
    }

    debug!("downloaded {} bytes", bytes_written);
    AttemptOutcome::Terminal(Download::Document {
        status: ResponseStatus::success(status),
        headers,
        bytes_written,
    })
}

/// Reads the body of a completed exchange and classifies the round trip.
async fn collect_reply(result: reqwest::Result<reqwest::Response>) -> AttemptOutcome<Reply> {
    let response = match result {
        Ok(response) => response,
        Err(e) => return AttemptOutcome::Retry(RetryCause::Transport(e)),
    };

    let status = response.status();
    let body = match response.bytes().await {
        Ok(body) => body.to_vec(),
        Err(e) => return AttemptOutcome::Retry(RetryCause::Transport(e)),
    };

    let reply = Reply { status, body };
    match classify_status(status) {
        Disposition::Terminal => AttemptOutcome::Terminal(reply),
        Disposition::Retryable => AttemptOutcome::Retry(RetryCause::Failed(reply)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn test_engine(max_tries: u32) -> HttpEngine {
        let env = Environment {
            max_tries,
            retry_delay: Duration::from_millis(5),
            ..Environment::default()
        };
        HttpEngine::new(&env).unwrap()
    }

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_with_retry_terminal_first_attempt() {
        let engine = test_engine(3);
        let result = engine
            .with_retry(Operation::Template, || async {
                AttemptOutcome::Terminal("done")
            })
            .await;
        assert_eq!(result.unwrap(), "done");
    }

    #[test_log::test(tokio::test)]
    async fn test_with_retry_succeeds_on_last_attempt() {
        // max_tries - 1 retryable failures followed by a success: the
        // attempt count must equal max_tries.
        let engine = test_engine(3);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let result = engine
            .with_retry(Operation::Render, || {
                let calls = calls_clone.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        AttemptOutcome::Retry(RetryCause::Failed("failed"))
                    } else {
                        AttemptOutcome::Terminal("rendered")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "rendered");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test_log::test(tokio::test)]
    async fn test_with_retry_exhaustion_returns_last_failed_value() {
        let engine = test_engine(3);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let result = engine
            .with_retry(Operation::Render, || {
                let calls = calls_clone.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    AttemptOutcome::Retry(RetryCause::Failed(format!("failure {}", n)))
                }
            })
            .await;

        // Exhausted server failures come back as the last value, not an error.
        assert_eq!(result.unwrap(), "failure 2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_fatal_stops_immediately() {
        let engine = test_engine(3);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let result: Result<()> = engine
            .with_retry(Operation::File, || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    AttemptOutcome::Fatal(Error::Io(std::io::Error::other("disk full")))
                }
            })
            .await;

        assert!(matches!(result, Err(Error::Io(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_post_form_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/listTemplates")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"templateList":[]}"#)
            .create_async()
            .await;

        let engine = test_engine(3);
        let reply = engine
            .post_form(
                Operation::Template,
                &format!("{}/listTemplates", server.url()),
                &fields(&[("accessKey", "key")]),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(reply.response_status().succeeded());
    }

    #[tokio::test]
    async fn test_post_form_not_found_is_terminal() {
        let mut server = mockito::Server::new_async().await;
        // A 4xx must be answered exactly once: no retries.
        let mock = server
            .mock("POST", "/getTemplate")
            .with_status(404)
            .with_body(r#"{"shortMsg":"not found"}"#)
            .expect(1)
            .create_async()
            .await;

        let engine = test_engine(3);
        let reply = engine
            .post_form(
                Operation::Template,
                &format!("{}/getTemplate", server.url()),
                &fields(&[("accessKey", "key"), ("templateName", "missing.docx")]),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        let status = reply.response_status();
        assert!(!status.succeeded());
        assert_eq!(status.http_status(), 404);
        assert_eq!(status.short_msg(), Some("not found"));
    }

    #[tokio::test]
    async fn test_post_form_server_error_retries_until_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/render")
            .with_status(503)
            .with_body(r#"{"shortMsg":"busy"}"#)
            .expect(3)
            .create_async()
            .await;

        let engine = test_engine(3);
        let reply = engine
            .post_form(
                Operation::Render,
                &format!("{}/render", server.url()),
                &fields(&[("accessKey", "key")]),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        let status = reply.response_status();
        assert!(!status.succeeded());
        assert_eq!(status.http_status(), 503);
        assert_eq!(status.short_msg(), Some("busy"));
    }

    #[tokio::test]
    async fn test_post_form_transport_failure_raises_after_retries() {
        // Nothing is listening on this port.
        let env = Environment {
            base_url: "http://127.0.0.1:1".to_string(),
            max_tries: 2,
            retry_delay: Duration::from_millis(5),
            ..Environment::default()
        };
        let engine = HttpEngine::new(&env).unwrap();

        let result = engine
            .post_form(
                Operation::Template,
                "http://127.0.0.1:1/listTemplates",
                &fields(&[("accessKey", "key")]),
            )
            .await;

        assert!(matches!(
            result,
            Err(Error::Transport {
                operation: Operation::Template,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_post_multipart_rebuilds_form_per_attempt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/uploadTemplate")
            .with_status(500)
            .expect(2)
            .create_async()
            .await;

        let engine = test_engine(2);
        let builds = Arc::new(AtomicUsize::new(0));
        let builds_clone = builds.clone();

        let reply = engine
            .post_multipart(
                Operation::Template,
                &format!("{}/uploadTemplate", server.url()),
                move || {
                    builds_clone.fetch_add(1, Ordering::SeqCst);
                    reqwest::multipart::Form::new().text("accessKey", "key").part(
                        "templateFile",
                        reqwest::multipart::Part::bytes(b"body".to_vec())
                            .file_name("welcome.docx"),
                    )
                },
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(!reply.response_status().succeeded());
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_download_streams_body_to_writer() {
        let mut server = mockito::Server::new_async().await;
        let body = b"%PDF-1.4 fake document".to_vec();
        let mock = server
            .mock("POST", "/render")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(body.clone())
            .create_async()
            .await;

        let engine = test_engine(3);
        let download = engine
            .post_form_download(
                Operation::Render,
                &format!("{}/render", server.url()),
                &fields(&[("accessKey", "key")]),
                || Ok(Vec::new()),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        match download {
            Download::Document {
                status,
                bytes_written,
                ..
            } => {
                assert!(status.succeeded());
                assert_eq!(bytes_written, body.len() as u64);
            }
            Download::Failed(_) => panic!("expected a document"),
        }
    }

    #[tokio::test]
    async fn test_download_failure_writes_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/getFile")
            .with_status(404)
            .with_body(r#"{"shortMsg":"no such file"}"#)
            .expect(1)
            .create_async()
            .await;

        let engine = test_engine(3);
        let created = Arc::new(AtomicUsize::new(0));
        let created_clone = created.clone();

        let download = engine
            .post_form_download(
                Operation::File,
                &format!("{}/getFile", server.url()),
                &fields(&[("accessKey", "key"), ("fileName", "gone.pdf")]),
                move || {
                    created_clone.fetch_add(1, Ordering::SeqCst);
                    Ok(Vec::new())
                },
            )
            .await
            .unwrap();

        mock.assert_async().await;
        match download {
            Download::Failed(reply) => {
                let status = reply.response_status();
                assert_eq!(status.http_status(), 404);
                assert_eq!(status.short_msg(), Some("no such file"));
            }
            Download::Document { .. } => panic!("expected a failure"),
        }
        // The writer must never be created for a failed fetch.
        assert_eq!(created.load(Ordering::SeqCst), 0);
    }
}
