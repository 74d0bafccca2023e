//! Forward one invocation to the agent backend and hand back its body as an
//! untouched chunk stream.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tracing::{debug, info, trace, warn};

use amber_core::{InvocationRequest, InvokeError};

use crate::backend::{BackendDescriptor, BackendMode};
use crate::envelope::RequestEnvelope;

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Sends invocations to one backend. Cheap to clone; holds no per-request state.
#[derive(Clone)]
pub struct Relay {
    client: reqwest::Client,
    backend: Arc<BackendDescriptor>,
}

impl Relay {
    pub fn new(backend: Arc<BackendDescriptor>) -> Self {
        Self::with_client(reqwest::Client::new(), backend)
    }

    pub fn with_client(client: reqwest::Client, backend: Arc<BackendDescriptor>) -> Self {
        Self { client, backend }
    }

    pub fn backend(&self) -> &BackendDescriptor {
        &self.backend
    }

    pub fn mode(&self) -> BackendMode {
        self.backend.mode()
    }

    /// Issue exactly one POST for `request`.
    ///
    /// The body is serialized once and the same buffer is signed and sent.
    /// A non-2xx answer is read to completion and returned as
    /// [`InvokeError::Backend`]; nothing is retried here.
    pub async fn relay(&self, request: &InvocationRequest) -> Result<RelayStream, InvokeError> {
        let body = Bytes::from(request.to_body()?);
        let session_id = uuid::Uuid::new_v4().to_string();

        let envelope =
            RequestEnvelope::build(&self.backend, body, &session_id, chrono::Utc::now())?;
        let headers = envelope.header_map()?;

        info!(
            mode = %self.backend.mode(),
            session_id = %session_id,
            url = %envelope.url(),
            "invoking agent backend"
        );

        let response = self
            .client
            .post(envelope.url())
            .headers(headers)
            .body(envelope.body().clone())
            .send()
            .await
            .map_err(|e| InvokeError::transport(format!("POST {}", envelope.url()), e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            warn!(
                session_id = %session_id,
                status = status.as_u16(),
                body = %body_text,
                "agent backend rejected invocation"
            );
            return Err(InvokeError::Backend {
                status: status.as_u16(),
                body: body_text,
            });
        }

        debug!(session_id = %session_id, status = status.as_u16(), "backend stream opened");
        Ok(RelayStream::new(Box::pin(response.bytes_stream()), session_id))
    }
}

/// The backend's response body, chunk for chunk.
///
/// Dropping the stream before the backend finished drops the underlying
/// response, which closes the backend connection instead of draining it.
pub struct RelayStream {
    inner: ByteStream,
    session_id: String,
    chunks: u64,
    bytes: u64,
    done: bool,
}

impl RelayStream {
    fn new(inner: ByteStream, session_id: String) -> Self {
        Self {
            inner,
            session_id,
            chunks: 0,
            bytes: 0,
            done: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Stream for RelayStream {
    type Item = Result<Bytes, InvokeError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                self.chunks += 1;
                self.bytes += chunk.len() as u64;
                trace!(session_id = %self.session_id, len = chunk.len(), "relaying chunk");
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                self.done = true;
                warn!(session_id = %self.session_id, error = %e, "backend stream interrupted");
                Poll::Ready(Some(Err(InvokeError::transport(
                    "backend stream interrupted",
                    e,
                ))))
            }
            Poll::Ready(None) => {
                self.done = true;
                info!(
                    session_id = %self.session_id,
                    chunks = self.chunks,
                    bytes = self.bytes,
                    "backend stream finished"
                );
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for RelayStream {
    fn drop(&mut self) {
        if !self.done {
            info!(
                session_id = %self.session_id,
                chunks = self.chunks,
                "consumer went away before backend finished; closing backend connection"
            );
        }
    }
}
