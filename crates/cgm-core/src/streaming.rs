//! Session updates as an async stream.
//!
//! [`DeviceSession::subscribe_updates`](crate::DeviceSession::subscribe_updates)
//! hands out an [`UpdateStream`]. The session pushes into it with a
//! non-blocking send, so a slow consumer never stalls the tick task: updates
//! are dropped once the buffer is full.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::Stream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use crate::events::SessionUpdate;

/// A stream of updates from a session.
///
/// The stream ends when the session is dropped. It stays open across
/// disconnect and reconnect, yielding updates from every later connection.
#[derive(Debug)]
pub struct UpdateStream {
    receiver: mpsc::Receiver<SessionUpdate>,
}

impl UpdateStream {
    pub(crate) fn channel(buffer: usize) -> (UpdateSink, Self) {
        let (sender, receiver) = mpsc::channel(buffer);
        (UpdateSink { sender }, Self { receiver })
    }

    /// Stop receiving updates. Buffered updates can still be drained.
    pub fn close(&mut self) {
        self.receiver.close();
    }

    /// Receive the next update.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        self.receiver.recv().await
    }

    /// Take a buffered update without waiting.
    pub fn try_next(&mut self) -> Option<SessionUpdate> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for UpdateStream {
    type Item = SessionUpdate;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}

/// Session-side half of an [`UpdateStream`].
#[derive(Debug)]
pub(crate) struct UpdateSink {
    sender: mpsc::Sender<SessionUpdate>,
}

impl UpdateSink {
    /// Offer an update. Returns `false` once the stream is gone.
    pub(crate) fn offer(&self, update: &SessionUpdate) -> bool {
        match self.sender.try_send(update.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Update stream buffer full, dropping update");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgm_types::{ForecastPoint, ForecastSet, Reading, Trend};
    use futures::StreamExt;
    use time::OffsetDateTime;

    fn update(value: u16) -> SessionUpdate {
        let point = |offset: u16| ForecastPoint {
            offset_minutes: offset,
            predicted_value: value,
            confidence_percent: 80,
            predicted_at: OffsetDateTime::UNIX_EPOCH,
        };
        SessionUpdate {
            reading: Reading::new(value, OffsetDateTime::UNIX_EPOCH, Trend::Stable, "Libre"),
            forecast: ForecastSet::new([point(15), point(30), point(45), point(60)]),
        }
    }

    #[tokio::test]
    async fn test_stream_yields_offered_updates() {
        let (sink, mut stream) = UpdateStream::channel(4);
        assert!(sink.offer(&update(100)));
        assert!(sink.offer(&update(110)));
        drop(sink);

        let values: Vec<u16> = (&mut stream).map(|u| u.reading.value).collect().await;
        assert_eq!(values, [100, 110]);
    }

    #[test]
    fn test_full_buffer_drops_without_closing() {
        let (sink, mut stream) = UpdateStream::channel(1);
        assert!(sink.offer(&update(100)));
        assert!(sink.offer(&update(110)));
        assert_eq!(stream.try_next().map(|u| u.reading.value), Some(100));
        assert!(stream.try_next().is_none());
    }

    #[tokio::test]
    async fn test_next_update_drains_then_ends() {
        let (sink, mut stream) = UpdateStream::channel(2);
        assert!(sink.offer(&update(95)));
        stream.close();

        assert_eq!(stream.next_update().await.map(|u| u.reading.value), Some(95));
        assert!(stream.next_update().await.is_none());
        assert!(!sink.offer(&update(96)));
    }

    #[test]
    fn test_closed_stream_reports_gone() {
        let (sink, mut stream) = UpdateStream::channel(1);
        stream.close();
        assert!(!sink.offer(&update(100)));
    }
}
