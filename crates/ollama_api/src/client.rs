use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::blob::blob_digest;
use crate::config::OllamaApiConfig;
use crate::error::{parse_error_message, OllamaApiError};
use crate::models::model_names;
use crate::ndjson::NdjsonLineDecoder;
use crate::payload::ChatRequest;
use crate::url::{blob_url, chat_url, normalize_base_url, tags_url};

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct OllamaApiClient {
    http: Client,
    config: OllamaApiConfig,
}

impl OllamaApiClient {
    pub fn new(config: OllamaApiConfig) -> Result<Self, OllamaApiError> {
        let mut builder = Client::builder()
            .connect_timeout(config.timeout)
            .read_timeout(config.timeout);
        if let Some(user_agent) = config.user_agent.as_deref() {
            builder = builder.user_agent(user_agent);
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    /// The normalized endpoint every request is sent to.
    pub fn base_url(&self) -> String {
        normalize_base_url(&self.config.base_url)
    }

    /// `GET /api/tags`, normalized to model identifiers.
    pub async fn list_models(&self) -> Result<Vec<String>, OllamaApiError> {
        let url = tags_url(&self.config.base_url);
        debug!(%url, "listing models");

        let response = ensure_success(self.http.get(&url).send().await?).await?;
        let body = response.text().await?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|error| OllamaApiError::MalformedBody(error.to_string()))?;

        model_names(&value)
    }

    /// Uploads `bytes` as a content-addressed blob and returns its digest.
    ///
    /// A `PUT` answered outside 200/201 is retried exactly once as `POST` to the
    /// same resource. Uploading content the server already holds is not an error.
    pub async fn upload_blob(&self, bytes: &[u8]) -> Result<String, OllamaApiError> {
        let digest = blob_digest(bytes);
        let url = blob_url(&self.config.base_url, &digest);
        debug!(%url, size = bytes.len(), "uploading blob");

        let put = self.blob_request(Method::PUT, &url, bytes).send().await?;
        if is_blob_accepted(put.status()) {
            return Ok(digest);
        }

        warn!(status = %put.status(), %digest, "blob PUT rejected, retrying as POST");
        let post = self.blob_request(Method::POST, &url, bytes).send().await?;
        let status = post.status();
        if status.is_success() {
            return Ok(digest);
        }

        let body = post.text().await.unwrap_or_default();
        Err(OllamaApiError::BlobRejected {
            digest,
            status,
            message: parse_error_message(status, &body),
        })
    }

    /// Opens `POST /api/chat` as a streamed response.
    ///
    /// A non-success status fails here, before any fragment is produced. The
    /// returned stream owns the connection; dropping it releases the connection.
    pub async fn chat_stream(&self, request: &ChatRequest) -> Result<FragmentStream, OllamaApiError> {
        let url = chat_url(&self.config.base_url);
        debug!(%url, model = %request.model, messages = request.messages.len(), "opening chat stream");

        let response = ensure_success(self.http.post(&url).json(request).send().await?).await?;
        Ok(FragmentStream::new(response))
    }

    /// Streams a chat request, handing each fragment to `on_fragment` in arrival order.
    pub async fn stream_with_handler<F>(
        &self,
        request: &ChatRequest,
        mut on_fragment: F,
    ) -> Result<(), OllamaApiError>
    where
        F: FnMut(String),
    {
        let mut fragments = self.chat_stream(request).await?;
        while let Some(fragment) = fragments.next().await {
            on_fragment(fragment?);
        }

        debug!(model = %request.model, "chat stream closed");
        Ok(())
    }

    /// Streams a chat request to completion and returns every fragment.
    pub async fn chat(&self, request: &ChatRequest) -> Result<Vec<String>, OllamaApiError> {
        let mut fragments = Vec::new();
        self.stream_with_handler(request, |fragment| fragments.push(fragment))
            .await?;
        Ok(fragments)
    }

    fn blob_request(&self, method: Method, url: &str, bytes: &[u8]) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(bytes.to_vec())
    }
}

/// Lazy sequence of text fragments decoded from a streamed chat response.
///
/// The connection is released as soon as the body ends or fails, and in any case
/// when the stream is dropped.
pub struct FragmentStream {
    body: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
    decoder: NdjsonLineDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

impl FragmentStream {
    fn new(response: Response) -> Self {
        Self::from_body(
            response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                .boxed(),
        )
    }

    fn from_body(body: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>) -> Self {
        Self {
            body,
            decoder: NdjsonLineDecoder::default(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    fn release(&mut self) {
        self.finished = true;
        self.body = stream::empty().boxed();
    }
}

impl std::fmt::Debug for FragmentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentStream")
            .field("pending", &self.pending.len())
            .field("finished", &self.finished)
            .finish()
    }
}

impl Stream for FragmentStream {
    type Item = Result<String, OllamaApiError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if let Some(fragment) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(fragment)));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match ready!(this.body.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => {
                    let fragments = this.decoder.feed(&chunk);
                    this.pending.extend(fragments);
                }
                Some(Err(error)) => {
                    this.release();
                    return Poll::Ready(Some(Err(OllamaApiError::from(error))));
                }
                None => {
                    let tail = this.decoder.finish();
                    this.pending.extend(tail);
                    this.release();
                }
            }
        }
    }
}

async fn ensure_success(response: Response) -> Result<Response, OllamaApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(OllamaApiError::Status {
        status,
        message: parse_error_message(status, &body),
    })
}

fn is_blob_accepted(status: StatusCode) -> bool {
    matches!(status, StatusCode::OK | StatusCode::CREATED)
}

#[cfg(test)]
mod tests {
    use futures_util::stream::{self, StreamExt};

    use super::FragmentStream;

    fn body(chunks: &[&str]) -> FragmentStream {
        let chunks: Vec<Result<Vec<u8>, reqwest::Error>> = chunks
            .iter()
            .map(|chunk| Ok(chunk.as_bytes().to_vec()))
            .collect();
        FragmentStream::from_body(stream::iter(chunks).boxed())
    }

    #[tokio::test]
    async fn fragments_follow_line_order_across_chunk_boundaries() {
        let fragments: Vec<String> = body(&[
            "{\"message\":{\"content\":\"Hel\"}}\n{\"mess",
            "age\":{\"content\":\"lo\"}}\n\n",
            "not json\n",
            "{\"done\":true}",
        ])
        .map(|fragment| fragment.expect("fragment"))
        .collect()
        .await;

        assert_eq!(
            fragments,
            vec![
                "Hel".to_string(),
                "lo".to_string(),
                "not json".to_string(),
                "{\"done\":true}".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn stream_stays_finished_after_body_ends() {
        let mut fragments = body(&["{\"response\":\"x\"}\n"]);

        assert_eq!(fragments.next().await.and_then(Result::ok), Some("x".to_string()));
        assert!(fragments.next().await.is_none());
        assert!(fragments.next().await.is_none());
    }
}
