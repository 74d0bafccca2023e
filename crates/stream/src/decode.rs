//! Adapter turning a byte-chunk stream into decoded [`StreamEvent`]s.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};

use amber_core::StreamEvent;

use crate::frame::FrameDecoder;

/// Yields events as soon as their line is complete. Transport errors from
/// the inner stream are passed through and end the stream; malformed lines
/// are skipped and counted in [`dropped`](Self::dropped).
pub struct EventStream<S> {
    inner: S,
    decoder: FrameDecoder,
    ready: VecDeque<StreamEvent>,
    ended: bool,
}

impl<S> EventStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
            ready: VecDeque::new(),
            ended: false,
        }
    }

    pub fn dropped(&self) -> u64 {
        self.decoder.dropped()
    }
}

impl<S, E> Stream for EventStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<StreamEvent, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if let Some(event) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }
            if this.ended {
                return Poll::Ready(None);
            }

            match this.inner.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    this.ready.extend(this.decoder.push(&chunk));
                }
                Poll::Ready(Some(Err(e))) => {
                    this.ended = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    this.ended = true;
                    this.ready.extend(this.decoder.finish());
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientState;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Unpin {
        futures::stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn chunking_does_not_change_the_final_state() {
        let whole = EventStream::new(chunks(&[
            "{\"status\":\"starting\"}\n{\"status\":\"completed\",\"formatted_response\":\"ok\"}\n",
        ]));
        let split = EventStream::new(chunks(&[
            "{\"status\":\"sta",
            "rting\"}\n{\"status\":\"completed\",\"formatted_",
            "response\":\"ok\"}",
            "\n",
        ]));

        let a: Vec<_> = whole.map(|e| e.unwrap()).collect().await;
        let b: Vec<_> = split.map(|e| e.unwrap()).collect().await;
        assert_eq!(a, b);

        let state_a = a.iter().fold(ClientState::new(), ClientState::reduce);
        let state_b = b.iter().fold(ClientState::new(), ClientState::reduce);
        assert_eq!(state_a, state_b);
        assert_eq!(state_a.final_response.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn transport_error_ends_the_stream() {
        let inner = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"{\"status\":\"starting\"}\n")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(b"{\"status\":\"agent_created\"}\n")),
        ]);
        let mut events = EventStream::new(inner);
        assert!(events.next().await.unwrap().is_ok());
        assert!(events.next().await.unwrap().is_err());
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn counts_dropped_frames() {
        let mut events = EventStream::new(chunks(&[
            "oops\n{\"status\":\"agent_created\"}\n",
            "{\"status\":\"mystery\"}\n",
        ]));
        let mut seen = 0;
        while let Some(event) = events.next().await {
            event.unwrap();
            seen += 1;
        }
        assert_eq!(seen, 1);
        assert_eq!(events.dropped(), 2);
    }
}
